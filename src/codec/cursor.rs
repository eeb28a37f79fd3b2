//! Bounds-checked sequential reader and matching writer for NatNet payloads
//!
//! Every read checks the remaining length first and fails with
//! `TruncatedPayload` instead of reading past the end. Counts are validated
//! against the remaining bytes before the caller allocates for them.

use crate::{NatNetError, Result};

/// Longest NUL-terminated name accepted, terminator excluded.
pub const MAX_NAME_LENGTH: usize = 255;

/// Sequential little-endian reader over a payload.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(NatNetError::truncated_payload(
                context,
                self.offset,
                len,
                self.remaining(),
            ));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let bytes = self.take(N, context)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.array::<1>(context)?[0])
    }

    pub fn u16(&mut self, context: &'static str) -> Result<u16> {
        self.array(context).map(u16::from_le_bytes)
    }

    pub fn i32(&mut self, context: &'static str) -> Result<i32> {
        self.array(context).map(i32::from_le_bytes)
    }

    pub fn u32(&mut self, context: &'static str) -> Result<u32> {
        self.array(context).map(u32::from_le_bytes)
    }

    pub fn u64(&mut self, context: &'static str) -> Result<u64> {
        self.array(context).map(u64::from_le_bytes)
    }

    pub fn f32(&mut self, context: &'static str) -> Result<f32> {
        self.array(context).map(f32::from_le_bytes)
    }

    pub fn f64(&mut self, context: &'static str) -> Result<f64> {
        self.array(context).map(f64::from_le_bytes)
    }

    /// Read an `i32` element count and check that `count × min_element_size`
    /// bytes remain.
    pub fn count(&mut self, context: &'static str, min_element_size: usize) -> Result<usize> {
        let start = self.offset;
        let raw = self.i32(context)?;
        let count = usize::try_from(raw)
            .map_err(|_| NatNetError::InvalidCount { context, count: i64::from(raw) })?;

        let needed = count.checked_mul(min_element_size).ok_or(NatNetError::InvalidCount {
            context,
            count: i64::from(raw),
        })?;
        if needed > self.remaining() {
            return Err(NatNetError::truncated_payload(
                context,
                start + 4,
                needed,
                self.remaining(),
            ));
        }
        Ok(count)
    }

    /// Read a NUL-terminated string of at most [`MAX_NAME_LENGTH`] bytes.
    pub fn cstring(&mut self, context: &'static str) -> Result<String> {
        let rest = &self.data[self.offset..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(NatNetError::truncated_payload(
                context,
                self.offset,
                rest.len() + 1,
                rest.len(),
            ));
        };
        if len > MAX_NAME_LENGTH {
            return Err(NatNetError::InvalidText {
                context,
                details: format!("{len} bytes exceeds the {MAX_NAME_LENGTH} byte name limit"),
            });
        }
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.offset += len + 1;
        Ok(text)
    }

    /// Read a fixed-width, NUL-padded text field.
    pub fn fixed_string(&mut self, width: usize, context: &'static str) -> Result<String> {
        let bytes = self.take(width, context)?;
        Ok(text_until_nul(bytes))
    }

    pub fn vec3(&mut self, context: &'static str) -> Result<crate::Vec3> {
        Ok(crate::Vec3::new(self.f32(context)?, self.f32(context)?, self.f32(context)?))
    }
}

/// Decode bytes up to the first NUL (or the end) as lossy UTF-8.
pub fn text_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Little-endian payload builder mirroring [`PayloadReader`].
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes(&[value])
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Element counts are `i32` on the wire.
    pub fn count(&mut self, count: usize) -> &mut Self {
        self.i32(i32::try_from(count).unwrap_or(i32::MAX))
    }

    /// Write `text` followed by a NUL terminator.
    pub fn cstring(&mut self, text: &str) -> &mut Self {
        self.bytes(text.as_bytes()).u8(0)
    }

    /// Write `text` NUL-padded into a fixed-width field, truncating so that at
    /// least one NUL remains.
    pub fn fixed_string(&mut self, text: &str, width: usize) -> &mut Self {
        let len = text.len().min(width.saturating_sub(1));
        self.bytes(&text.as_bytes()[..len]);
        self.buf.resize(self.buf.len() + (width - len), 0);
        self
    }

    pub fn vec3(&mut self, v: crate::Vec3) -> &mut Self {
        self.f32(v.x).f32(v.y).f32(v.z)
    }
}
