//! Outbound side of the command channel

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

use super::stats::ChannelCounters;
use crate::correlator::PacketSender;

/// Command socket paired with the server's command endpoint.
///
/// Sends are fire-and-forget datagrams; replies arrive on the receive loop
/// that shares the socket.
#[derive(Debug, Clone)]
pub(crate) struct CommandChannel {
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    counters: Arc<ChannelCounters>,
}

impl CommandChannel {
    pub fn new(socket: Arc<UdpSocket>, server: SocketAddr, counters: Arc<ChannelCounters>) -> Self {
        Self { socket, server, counters }
    }

    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn counters(&self) -> &Arc<ChannelCounters> {
        &self.counters
    }
}

impl PacketSender for CommandChannel {
    fn send_packet(&self, packet: &[u8]) -> impl Future<Output = io::Result<usize>> + Send {
        async move {
            match self.socket.send_to(packet, self.server).await {
                Ok(sent) => {
                    self.counters.record_sent();
                    Ok(sent)
                }
                Err(e) => {
                    self.counters.record_send_error();
                    Err(e)
                }
            }
        }
    }
}
