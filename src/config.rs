//! # Client Configuration
//!
//! [`ClientConfig`] holds every address, port and timing knob the client
//! needs. All fields have defaults matching a stock server on the local
//! machine, so a YAML file only has to name what differs:
//!
//! ```yaml
//! server_address: 192.168.1.20
//! local_address: 192.168.1.31
//! command_timeout_ms: 250
//! ```
//!
//! Load with [`ClientConfig::from_yaml_str`] or [`ClientConfig::from_file`];
//! both validate before returning.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

use crate::{NatNetError, Result};

pub const DEFAULT_COMMAND_PORT: u16 = 1510;
pub const DEFAULT_DATA_PORT: u16 = 1511;
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 42, 99);
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 0x10_0000;

/// How frame data reaches the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Data socket joins the multicast group on the local interface
    #[default]
    Multicast,
    /// Server sends data straight to this host; no group is joined
    Unicast,
}

/// Connection settings for [`NatNetClient`](crate::NatNetClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server host that receives commands
    pub server_address: Ipv4Addr,

    /// Local interface for the command socket and multicast membership
    pub local_address: Ipv4Addr,

    /// Server command port
    pub command_port: u16,

    /// Port the data socket binds; 0 picks an ephemeral port (unicast only)
    pub data_port: u16,

    /// Local port for the command socket; 0 picks an ephemeral port
    pub command_bind_port: u16,

    pub multicast_group: Ipv4Addr,

    pub connection_type: ConnectionType,

    /// Requested socket receive buffer in bytes; 0 keeps the OS default
    pub receive_buffer_size: usize,

    /// Deadline for a command response
    pub command_timeout_ms: u64,

    /// Send attempts per request before giving up
    pub send_attempts: u32,

    /// How long `connect` waits for the server info reply
    pub handshake_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: Ipv4Addr::LOCALHOST,
            local_address: Ipv4Addr::UNSPECIFIED,
            command_port: DEFAULT_COMMAND_PORT,
            data_port: DEFAULT_DATA_PORT,
            command_bind_port: 0,
            multicast_group: DEFAULT_MULTICAST_GROUP,
            connection_type: ConnectionType::Multicast,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            command_timeout_ms: 150,
            send_attempts: 3,
            handshake_timeout_ms: 1000,
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at `server`, listening on `local`.
    pub fn new(server: Ipv4Addr, local: Ipv4Addr) -> Self {
        Self { server_address: server, local_address: local, ..Self::default() }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            NatNetError::config_error_with_source("invalid client configuration", None, Box::new(e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            NatNetError::config_error_with_source(
                "cannot read configuration file",
                Some(path.to_path_buf()),
                Box::new(e),
            )
        })?;
        Self::from_yaml_str(&yaml).map_err(|e| match e {
            NatNetError::Config { reason, source, .. } => {
                NatNetError::Config { reason, path: Some(path.to_path_buf()), source }
            }
            other => other,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| {
            NatNetError::config_error_with_source("cannot serialize configuration", None, Box::new(e))
        })
    }

    /// Check the settings for combinations the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server_address.is_unspecified() {
            return Err(NatNetError::config_error("server_address must name a host"));
        }
        if self.command_port == 0 {
            return Err(NatNetError::config_error("command_port must be non-zero"));
        }
        if self.connection_type == ConnectionType::Multicast {
            if !self.multicast_group.is_multicast() {
                return Err(NatNetError::config_error(format!(
                    "multicast_group {} is not a multicast address",
                    self.multicast_group
                )));
            }
            if self.data_port == 0 {
                return Err(NatNetError::config_error(
                    "data_port must be fixed when joining a multicast group",
                ));
            }
        }
        if self.command_timeout_ms == 0 {
            return Err(NatNetError::config_error("command_timeout_ms must be non-zero"));
        }
        if self.send_attempts == 0 {
            return Err(NatNetError::config_error("send_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Server command endpoint.
    pub fn server_command_addr(&self) -> SocketAddr {
        SocketAddrV4::new(self.server_address, self.command_port).into()
    }
}
