//! Message kinds carried in the packet envelope

use serde::{Deserialize, Serialize};

/// Envelope message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Connect,
    ServerInfo,
    Request,
    Response,
    RequestModelDefinition,
    ModelDefinition,
    RequestFrameOfData,
    FrameOfData,
    MessageString,
    UnrecognizedRequest,
    /// Any identifier this client does not know
    Unknown(u16),
}

impl MessageKind {
    pub const fn from_id(id: u16) -> Self {
        match id {
            0 => MessageKind::Connect,
            1 => MessageKind::ServerInfo,
            2 => MessageKind::Request,
            3 => MessageKind::Response,
            4 => MessageKind::RequestModelDefinition,
            5 => MessageKind::ModelDefinition,
            6 => MessageKind::RequestFrameOfData,
            7 => MessageKind::FrameOfData,
            8 => MessageKind::MessageString,
            100 => MessageKind::UnrecognizedRequest,
            other => MessageKind::Unknown(other),
        }
    }

    pub const fn id(self) -> u16 {
        match self {
            MessageKind::Connect => 0,
            MessageKind::ServerInfo => 1,
            MessageKind::Request => 2,
            MessageKind::Response => 3,
            MessageKind::RequestModelDefinition => 4,
            MessageKind::ModelDefinition => 5,
            MessageKind::RequestFrameOfData => 6,
            MessageKind::FrameOfData => 7,
            MessageKind::MessageString => 8,
            MessageKind::UnrecognizedRequest => 100,
            MessageKind::Unknown(id) => id,
        }
    }
}

impl From<u16> for MessageKind {
    fn from(id: u16) -> Self {
        Self::from_id(id)
    }
}
