//! Decoded frame-of-data types
//!
//! A [`FrameOfData`] is produced for every frame packet and handed to the
//! frame sink. Fields that only exist from a certain protocol version on are
//! `Option`s and are `None` when the negotiated version does not carry them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation quaternion in (x, y, z, w) wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Named marker set with its marker positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSetSample {
    pub name: String,
    pub markers: Vec<Vec3>,
}

/// Marker attached to a rigid body (protocol versions before 3.0 only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyMarker {
    pub position: Vec3,
    /// Marker id, sent from 2.0 on
    pub id: Option<i32>,
    /// Marker size, sent from 2.0 on
    pub size: Option<f32>,
}

/// Pose of a single rigid body in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidBodySample {
    pub id: i32,
    pub position: Vec3,
    pub orientation: Quaternion,
    /// Associated markers; empty from 3.0 on where they moved to labeled markers
    pub markers: Vec<RigidBodyMarker>,
    pub mean_error: Option<f32>,
    pub tracking_valid: Option<bool>,
}

impl RigidBodySample {
    /// `false` only when the server explicitly reported a tracking loss.
    pub fn is_tracked(&self) -> bool {
        self.tracking_valid.unwrap_or(true)
    }
}

/// Skeleton pose made of its bone rigid bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonSample {
    pub id: i32,
    pub rigid_bodies: Vec<RigidBodySample>,
}

/// Composite labeled marker id: model id in the high word, member id in the low word.
///
/// Both halves are read unsigned, so a set high bit stays in `model_id`
/// instead of sign-extending it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId {
    pub model_id: u16,
    pub marker_id: u16,
}

impl MarkerId {
    pub const fn from_raw(raw: u32) -> Self {
        Self { model_id: (raw >> 16) as u16, marker_id: (raw & 0xFFFF) as u16 }
    }

    pub const fn to_raw(self) -> u32 {
        ((self.model_id as u32) << 16) | self.marker_id as u32
    }
}

mod marker_bits {
    pub const OCCLUDED: u16 = 0x01;
    pub const POINT_CLOUD_SOLVED: u16 = 0x02;
    pub const MODEL_SOLVED: u16 = 0x04;
    pub const HAS_MODEL: u16 = 0x08;
    pub const UNLABELED: u16 = 0x10;
    pub const ACTIVE: u16 = 0x20;
}

/// Labeled marker state flags (2.6 and later).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerParams {
    /// Marker was not visible in this frame
    pub occluded: bool,
    /// Position came from the point cloud solve
    pub point_cloud_solved: bool,
    /// Position came from the model solve
    pub model_solved: bool,
    /// Flags added in 3.0
    pub extended: Option<ExtendedMarkerParams>,
}

/// Labeled marker flags added in protocol 3.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedMarkerParams {
    pub has_model: bool,
    pub unlabeled: bool,
    pub active: bool,
}

impl MarkerParams {
    /// Interpret the wire bitfield. Bits above `MODEL_SOLVED` are only read
    /// when `extended` is set.
    pub fn from_bits(bits: u16, extended: bool) -> Self {
        let has = |flag: u16| bits & flag != 0;
        Self {
            occluded: has(marker_bits::OCCLUDED),
            point_cloud_solved: has(marker_bits::POINT_CLOUD_SOLVED),
            model_solved: has(marker_bits::MODEL_SOLVED),
            extended: extended.then(|| ExtendedMarkerParams {
                has_model: has(marker_bits::HAS_MODEL),
                unlabeled: has(marker_bits::UNLABELED),
                active: has(marker_bits::ACTIVE),
            }),
        }
    }

    pub fn bits(&self) -> u16 {
        let mut bits = 0;
        let mut set = |flag: u16, on: bool| {
            if on {
                bits |= flag;
            }
        };
        set(marker_bits::OCCLUDED, self.occluded);
        set(marker_bits::POINT_CLOUD_SOLVED, self.point_cloud_solved);
        set(marker_bits::MODEL_SOLVED, self.model_solved);
        if let Some(ext) = self.extended {
            set(marker_bits::HAS_MODEL, ext.has_model);
            set(marker_bits::UNLABELED, ext.unlabeled);
            set(marker_bits::ACTIVE, ext.active);
        }
        bits
    }
}

/// Labeled marker sample (2.3 and later).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledMarkerSample {
    pub id: MarkerId,
    pub position: Vec3,
    pub size: f32,
    pub params: Option<MarkerParams>,
    /// Solve residual, 3.0 and later
    pub residual: Option<f32>,
}

/// Analog samples of a force plate or generic device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalogDeviceSample {
    pub id: i32,
    /// One entry per channel, each holding the sub-frame samples for this frame
    pub channels: Vec<Vec<f32>>,
}

/// SMPTE-style timecode packed as `hh mm ss ff` bytes plus a subframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
    pub subframe: u32,
}

impl Timecode {
    pub const fn from_raw(timecode: u32, subframe: u32) -> Self {
        Self {
            hour: (timecode >> 24) as u8,
            minute: (timecode >> 16) as u8,
            second: (timecode >> 8) as u8,
            frame: timecode as u8,
            subframe,
        }
    }

    /// Packed timecode word as sent on the wire.
    pub const fn raw(&self) -> u32 {
        ((self.hour as u32) << 24)
            | ((self.minute as u32) << 16)
            | ((self.second as u32) << 8)
            | self.frame as u32
    }
}

/// Formats as `hh:mm:ss:ff.s`, each field zero-padded to two digits.
impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}.{}",
            self.hour, self.minute, self.second, self.frame, self.subframe
        )
    }
}

/// Server clock ticks captured along the frame pipeline (3.0 and later).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighResTimestamps {
    /// Camera mid-exposure time
    pub mid_exposure: u64,
    /// Time the camera data reached the server
    pub data_received: u64,
    /// Time the frame was transmitted
    pub transmit: u64,
}

/// Frame-level status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFlags {
    /// Server is recording
    pub recording: bool,
    /// The list of actively tracked models changed
    pub tracked_models_changed: bool,
}

impl FrameFlags {
    pub const fn from_bits(bits: u16) -> Self {
        Self { recording: bits & 0x01 != 0, tracked_models_changed: bits & 0x02 != 0 }
    }

    pub const fn bits(&self) -> u16 {
        (self.recording as u16) | ((self.tracked_models_changed as u16) << 1)
    }
}

/// One decoded frame of motion-capture data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameOfData {
    pub frame_number: i32,
    pub marker_sets: Vec<MarkerSetSample>,
    /// Deprecated "other markers" list, kept only so frames re-encode faithfully
    #[serde(skip)]
    pub unlabeled_markers: Vec<Vec3>,
    pub rigid_bodies: Vec<RigidBodySample>,
    pub skeletons: Vec<SkeletonSample>,
    pub labeled_markers: Vec<LabeledMarkerSample>,
    pub force_plates: Vec<AnalogDeviceSample>,
    pub devices: Vec<AnalogDeviceSample>,
    /// Removed in 3.0
    pub software_latency: Option<f32>,
    pub timecode: Timecode,
    /// Seconds since the server started streaming
    pub timestamp: f64,
    pub high_res_timestamps: Option<HighResTimestamps>,
    pub flags: FrameFlags,
}

impl FrameOfData {
    /// Find a rigid body by its streaming id.
    pub fn rigid_body(&self, id: i32) -> Option<&RigidBodySample> {
        self.rigid_bodies.iter().find(|body| body.id == id)
    }

    /// Canonical `hh:mm:ss:ff.s` timecode string.
    pub fn timecode_string(&self) -> String {
        self.timecode.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn composite_marker_id_splits_words() {
        let id = MarkerId::from_raw(0x0001_0005);
        assert_eq!(id.model_id, 1);
        assert_eq!(id.marker_id, 5);
        assert_eq!(id.to_raw(), 0x0001_0005);
    }

    #[test]
    fn high_bit_marker_id_stays_unsigned() {
        let id = MarkerId::from_raw(0x8001_FFFE);
        assert_eq!(id.model_id, 0x8001);
        assert_eq!(id.marker_id, 0xFFFE);
        assert_eq!(id.to_raw(), 0x8001_FFFE);
    }

    #[test]
    fn timecode_formats_zero_padded() {
        let timecode = Timecode::from_raw(0x0102_030A, 7);
        assert_eq!((timecode.hour, timecode.minute, timecode.second), (1, 2, 3));
        assert_eq!(timecode.frame, 10);
        assert_eq!(timecode.to_string(), "01:02:03:10.7");
        assert_eq!(Timecode::default().to_string(), "00:00:00:00.0");
    }

    #[test]
    fn marker_params_ignore_extended_bits_before_three() {
        let params = MarkerParams::from_bits(0x3F, false);
        assert!(params.occluded && params.point_cloud_solved && params.model_solved);
        assert_eq!(params.extended, None);
        assert_eq!(params.bits(), 0x07);

        let params = MarkerParams::from_bits(0x28, true);
        let ext = params.extended.expect("extended flags should decode");
        assert!(ext.has_model && ext.active && !ext.unlabeled);
        assert_eq!(params.bits(), 0x28);
    }

    #[test]
    fn frame_flags_bits() {
        assert_eq!(FrameFlags::from_bits(0x03).bits(), 0x03);
        assert!(FrameFlags::from_bits(0x01).recording);
        assert!(!FrameFlags::from_bits(0x01).tracked_models_changed);
    }

    #[test]
    fn rigid_body_lookup_by_id() {
        let frame = FrameOfData {
            rigid_bodies: vec![
                RigidBodySample { id: 3, ..Default::default() },
                RigidBodySample { id: 7, tracking_valid: Some(false), ..Default::default() },
            ],
            ..Default::default()
        };
        assert!(frame.rigid_body(3).is_some_and(RigidBodySample::is_tracked));
        assert!(frame.rigid_body(7).is_some_and(|body| !body.is_tracked()));
        assert!(frame.rigid_body(9).is_none());
    }

    proptest! {
        #[test]
        fn timecode_raw_round_trips(raw in any::<u32>(), sub in any::<u32>()) {
            let timecode = Timecode::from_raw(raw, sub);
            prop_assert_eq!(timecode.raw(), raw);
            prop_assert_eq!(timecode.subframe, sub);
        }

        #[test]
        fn marker_id_round_trips(raw in any::<u32>()) {
            prop_assert_eq!(MarkerId::from_raw(raw).to_raw(), raw);
        }
    }
}
