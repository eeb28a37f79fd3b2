//! Core types for NatNet data representation.
//!
//! This module holds the plain data produced by the codec and consumed by
//! frame sinks:
//! - [`ProtocolVersion`] gates which fields a packet carries
//! - [`ServerInfo`] is the handshake result
//! - [`FrameOfData`] and its samples describe one tracked frame
//! - [`Descriptor`] variants describe the scene's assets
//! - [`MessageKind`] identifies envelope payloads
//!
//! All types derive `serde` traits so sinks can forward them to other
//! middleware without an intermediate mapping.

mod command;
mod descriptor;
mod frame;
mod message;
mod server_info;
mod update_rate;
mod version;

pub use command::CommandOutcome;
pub use descriptor::{
    BoneDescriptor, Descriptor, MarkerSetDescriptor, RigidBodyDescriptor,
    RigidBodyMarkerDescriptor, SkeletonDescriptor,
};
pub use frame::{
    AnalogDeviceSample, ExtendedMarkerParams, FrameFlags, FrameOfData, HighResTimestamps,
    LabeledMarkerSample, MarkerId, MarkerParams, MarkerSetSample, Quaternion, RigidBodyMarker,
    RigidBodySample, SkeletonSample, Timecode, Vec3,
};
pub use message::MessageKind;
pub use server_info::{ServerCapabilities, ServerInfo};
pub use update_rate::UpdateRate;
pub use version::ProtocolVersion;
