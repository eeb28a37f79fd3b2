//! Socket setup for the command and data channels
//!
//! Options that must be set before `bind` (address reuse, broadcast,
//! receive buffer) go through `socket2`; the configured socket is then
//! handed to tokio.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, ConnectionType};
use crate::{NatNetError, Result};

fn new_udp_socket(role: &str) -> Result<Socket> {
    Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NatNetError::socket_error(format!("create {role} socket"), e))
}

/// Best effort: a smaller buffer than requested is logged, not fatal.
fn request_receive_buffer(socket: &Socket, requested: usize, role: &str) {
    if requested == 0 {
        return;
    }
    if let Err(e) = socket.set_recv_buffer_size(requested) {
        warn!(role, requested, error = %e, "Failed to set receive buffer size");
        return;
    }
    match socket.recv_buffer_size() {
        Ok(actual) if actual < requested => {
            warn!(role, requested, actual, "Receive buffer smaller than requested");
        }
        Ok(actual) => debug!(role, actual, "Receive buffer size"),
        Err(e) => warn!(role, error = %e, "Failed to read back receive buffer size"),
    }
}

fn into_tokio(socket: Socket, role: &str) -> Result<UdpSocket> {
    socket
        .set_nonblocking(true)
        .map_err(|e| NatNetError::socket_error(format!("set {role} socket non-blocking"), e))?;
    UdpSocket::from_std(socket.into())
        .map_err(|e| NatNetError::socket_error(format!("register {role} socket"), e))
}

/// Bind the command socket on `local_address:command_bind_port` with
/// broadcast enabled.
pub(crate) fn bind_command_socket(config: &ClientConfig) -> Result<UdpSocket> {
    let socket = new_udp_socket("command")?;
    socket
        .set_broadcast(true)
        .map_err(|e| NatNetError::socket_error("enable broadcast on command socket", e))?;
    request_receive_buffer(&socket, config.receive_buffer_size, "command");

    let addr = SocketAddrV4::new(config.local_address, config.command_bind_port);
    socket
        .bind(&addr.into())
        .map_err(|e| NatNetError::socket_error(format!("bind command socket to {addr}"), e))?;

    let socket = into_tokio(socket, "command")?;
    info!(local = ?socket.local_addr().ok(), "Command socket bound");
    Ok(socket)
}

/// Bind the data socket on `0.0.0.0:data_port` with address reuse and, in
/// multicast mode, join the group on the local interface.
pub(crate) fn bind_data_socket(config: &ClientConfig) -> Result<UdpSocket> {
    let socket = new_udp_socket("data")?;
    socket
        .set_reuse_address(true)
        .map_err(|e| NatNetError::socket_error("enable address reuse on data socket", e))?;
    request_receive_buffer(&socket, config.receive_buffer_size, "data");

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.data_port);
    socket
        .bind(&addr.into())
        .map_err(|e| NatNetError::socket_error(format!("bind data socket to {addr}"), e))?;

    if config.connection_type == ConnectionType::Multicast {
        socket.join_multicast_v4(&config.multicast_group, &config.local_address).map_err(|e| {
            NatNetError::socket_error(
                format!(
                    "join multicast group {} on {}",
                    config.multicast_group, config.local_address
                ),
                e,
            )
        })?;
        info!(group = %config.multicast_group, interface = %config.local_address, "Joined multicast group");
    }

    let socket = into_tokio(socket, "data")?;
    info!(local = ?socket.local_addr().ok(), "Data socket bound");
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> ClientConfig {
        ClientConfig {
            local_address: Ipv4Addr::LOCALHOST,
            data_port: 0,
            connection_type: ConnectionType::Unicast,
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn binds_ephemeral_ports() {
        let config = loopback();
        let command = bind_command_socket(&config).unwrap();
        let data = bind_data_socket(&config).unwrap();
        assert_ne!(command.local_addr().unwrap().port(), 0);
        assert_ne!(data.local_addr().unwrap().port(), 0);
        assert!(command.broadcast().unwrap());
    }

    #[tokio::test]
    async fn taken_command_port_is_a_socket_error() {
        let config = loopback();
        let first = bind_command_socket(&config).unwrap();
        let taken = ClientConfig {
            command_bind_port: first.local_addr().unwrap().port(),
            ..config
        };
        let err = bind_command_socket(&taken).unwrap_err();
        assert!(matches!(err, NatNetError::Socket { .. }));
        assert!(err.to_string().contains("bind command socket"));
    }

    #[tokio::test]
    #[ignore = "multicast_required"]
    async fn joins_default_multicast_group() {
        let config = ClientConfig { data_port: 0, ..ClientConfig::default() };
        // Ephemeral ports are rejected by validation but binding still works.
        let data = bind_data_socket(&config).unwrap();
        assert_eq!(data.local_addr().unwrap().ip(), Ipv4Addr::UNSPECIFIED);
    }
}
