//! Driver spawns and manages the receive loop tasks

use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::channel::{ChannelCounters, ChannelKind, Dispatcher};
use crate::codec::MAX_PACKET_SIZE;

/// Receive errors in a row before each escalation to `error!`.
const ERROR_REPORT_INTERVAL: u32 = 10;

/// Handles to the spawned receive loops.
pub(crate) struct DriverTasks {
    pub command: JoinHandle<()>,
    pub data: JoinHandle<()>,
    /// Cancels both loops
    pub cancel: CancellationToken,
}

/// One receive loop: a socket, what arrives on it and where it goes.
pub(crate) struct ReceiveLoop {
    pub channel: ChannelKind,
    pub socket: Arc<UdpSocket>,
    pub counters: Arc<ChannelCounters>,
}

/// Driver spawns and manages the command and data receive loops
///
/// Each loop owns its receive buffer and runs until cancelled. Per-datagram
/// failures are logged and counted; they never stop a loop.
pub(crate) struct Driver;

impl Driver {
    pub fn spawn(
        command: ReceiveLoop,
        data: ReceiveLoop,
        dispatcher: Arc<Dispatcher>,
    ) -> DriverTasks {
        let cancel = CancellationToken::new();

        let command = tokio::spawn(Self::receive_task(command, dispatcher.clone(), cancel.clone()));
        let data = tokio::spawn(Self::receive_task(data, dispatcher, cancel.clone()));

        DriverTasks { command, data, cancel }
    }

    async fn receive_task(
        receive: ReceiveLoop,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) {
        let ReceiveLoop { channel, socket, counters } = receive;
        let name = channel.name();
        info!(channel = name, "Receive loop started");

        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut datagram_count = 0u64;
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(channel = name, "Receive loop cancelled");
                    break;
                }
                result = socket.recv_from(&mut buf) => result,
            };

            match result {
                Ok((len, from)) => {
                    datagram_count += 1;
                    error_count = 0;
                    counters.record_received(len);
                    trace!(channel = name, len, %from, "Received datagram");

                    if let Err(e) = dispatcher.dispatch(channel, &buf[..len], &counters) {
                        counters.record_decode_error();
                        warn!(channel = name, len, %from, error = %e, "Dropping malformed datagram");
                    }
                }
                Err(e) => {
                    // Socket errors don't end the loop; back off and keep serving.
                    error_count += 1;
                    counters.record_receive_error();
                    if error_count % ERROR_REPORT_INTERVAL == 0 {
                        error!(channel = name, error_count, error = %e, "Repeated receive failures");
                    } else {
                        warn!(channel = name, error_count, error = %e, "Receive failed");
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ... capped at 1.6s
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!(channel = name, datagrams = datagram_count, "Receive loop ended");
    }
}
