//! Packet envelope: `u16 kind | u16 payload length | payload`, little-endian

use super::cursor::text_until_nul;
use crate::{CommandOutcome, MessageKind, NatNetError, Result};

/// Size of the kind and length header.
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Largest payload accepted or produced.
pub const MAX_PAYLOAD_SIZE: usize = 100_000;

/// Largest datagram a receive loop needs to hold.
pub const MAX_PACKET_SIZE: usize = ENVELOPE_HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Largest payload that fits both the wire length field and the limit.
///
/// The `u16` length field caps this at 65535, below [`MAX_PAYLOAD_SIZE`].
const ENCODABLE_PAYLOAD_SIZE: usize =
    if MAX_PAYLOAD_SIZE < u16::MAX as usize { MAX_PAYLOAD_SIZE } else { u16::MAX as usize };

/// A decoded envelope borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketEnvelope<'a> {
    pub kind: MessageKind,
    pub payload: &'a [u8],
}

/// Split a datagram into kind and payload.
///
/// Bytes past the declared payload length are ignored.
pub fn decode_envelope(packet: &[u8]) -> Result<PacketEnvelope<'_>> {
    if packet.len() < ENVELOPE_HEADER_SIZE {
        return Err(NatNetError::TruncatedEnvelope { available: packet.len() });
    }
    let kind = MessageKind::from_id(u16::from_le_bytes([packet[0], packet[1]]));
    let declared = usize::from(u16::from_le_bytes([packet[2], packet[3]]));
    let body = &packet[ENVELOPE_HEADER_SIZE..];
    if declared > body.len() {
        return Err(NatNetError::PayloadLengthMismatch { declared, available: body.len() });
    }
    Ok(PacketEnvelope { kind, payload: &body[..declared] })
}

/// Frame a payload with its envelope header.
pub fn encode_envelope(kind: MessageKind, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > ENCODABLE_PAYLOAD_SIZE {
        return Err(NatNetError::PayloadTooLarge {
            size: payload.len(),
            limit: ENCODABLE_PAYLOAD_SIZE,
        });
    }
    let mut packet = Vec::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    packet.extend_from_slice(&kind.id().to_le_bytes());
    packet.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    packet.extend_from_slice(payload);
    Ok(packet)
}

/// Build a `Request` packet carrying `command` as NUL-terminated text.
pub fn encode_request(command: &str) -> Result<Vec<u8>> {
    encode_text_message(MessageKind::Request, command)
}

/// Build a packet of `kind` whose payload is NUL-terminated text.
pub fn encode_text_message(kind: MessageKind, text: &str) -> Result<Vec<u8>> {
    if text.contains('\0') {
        return Err(NatNetError::InvalidCommand {
            reason: "text contains an interior NUL byte".to_string(),
        });
    }
    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text.as_bytes());
    payload.push(0);
    encode_envelope(kind, &payload)
}

/// Packet for a message kind that carries no payload.
pub fn encode_empty(kind: MessageKind) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ENVELOPE_HEADER_SIZE);
    packet.extend_from_slice(&kind.id().to_le_bytes());
    packet.extend_from_slice(&0u16.to_le_bytes());
    packet
}

/// Interpret a `Response` payload: exactly four bytes is a status code,
/// anything else is text.
pub fn decode_response(payload: &[u8]) -> CommandOutcome {
    match <[u8; 4]>::try_from(payload) {
        Ok(status) => CommandOutcome::from_status(i32::from_le_bytes(status)),
        Err(_) => CommandOutcome::Text(text_until_nul(payload)),
    }
}

/// Encode a status code response payload.
pub fn encode_status_response(code: i32) -> Result<Vec<u8>> {
    encode_envelope(MessageKind::Response, &code.to_le_bytes())
}

/// Decode a `MessageString` payload.
pub fn decode_message_string(payload: &[u8]) -> String {
    text_until_nul(payload)
}
