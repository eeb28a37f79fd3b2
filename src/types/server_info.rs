//! Server identity reported during the connection handshake

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use super::ProtocolVersion;

/// Identity and capabilities of the streaming server.
///
/// Built from a server-info response and never modified afterwards. A newer
/// handshake replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Sending application name, e.g. "Motive"
    pub app_name: String,

    /// Sending application version
    pub app_version: [u8; 4],

    /// NatNet protocol version the server streams with
    pub protocol_version: ProtocolVersion,

    /// Present when the server sent the extended server block
    pub capabilities: Option<ServerCapabilities>,
}

/// Optional trailer of the server-info payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// High resolution clock frequency in ticks per second
    pub clock_frequency: u64,

    /// Port the server streams frame data to
    pub data_port: u16,

    /// Whether frame data is multicast
    pub multicast: bool,

    /// Multicast group the server streams to
    pub multicast_group: Ipv4Addr,
}

impl ServerCapabilities {
    /// Convert a high resolution timestamp to seconds using the server clock.
    pub fn ticks_to_seconds(&self, ticks: u64) -> Option<f64> {
        if self.clock_frequency == 0 {
            return None;
        }
        Some(ticks as f64 / self.clock_frequency as f64)
    }
}
