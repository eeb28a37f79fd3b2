//! Request/response correlation for the command channel
//!
//! The server answers commands without echoing an identifier, so only one
//! command may be in flight. [`CommandCorrelator`] serializes callers with a
//! fair async mutex and keeps the single outstanding request in a slot the
//! command receive loop resolves.
//!
//! ```text
//! caller ──► gate (FIFO) ──► install slot ──► send ──► await reply ─┬─► outcome
//!                                                                   └─► timeout: clear slot
//! receive loop ──► Response / UnrecognizedRequest ──► resolve slot
//! ```

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::codec::encode_request;
use crate::{CommandOutcome, NatNetError, Result};

/// Outbound half of the command channel.
pub(crate) trait PacketSender: Send + Sync {
    fn send_packet(&self, packet: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

/// Send `packet`, retrying failed sends up to `attempts` tries in total.
pub(crate) async fn send_with_retries<S: PacketSender>(
    sender: &S,
    packet: &[u8],
    attempts: u32,
    what: &str,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match sender.send_packet(packet).await {
            Ok(_) => {
                trace!(what, attempt, len = packet.len(), "Sent");
                return Ok(());
            }
            Err(e) if attempt < attempts => {
                warn!(what, attempt, attempts, error = %e, "Send failed, retrying");
            }
            Err(e) => return Err(NatNetError::socket_error(format!("send {what}"), e)),
        }
    }
}

/// How the server resolved a pending command.
#[derive(Debug)]
pub(crate) enum Reply {
    Outcome(CommandOutcome),
    Rejected,
}

#[derive(Debug)]
struct PendingCommand {
    id: u64,
    command: String,
    reply: oneshot::Sender<Reply>,
}

#[derive(Debug, Default)]
pub(crate) struct CommandCorrelator {
    gate: tokio::sync::Mutex<()>,
    pending: Mutex<Option<PendingCommand>>,
    next_id: AtomicU64,
}

impl CommandCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PendingCommand>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a reply to the waiting caller. Returns `false` when nothing was
    /// waiting, e.g. a reply arriving after its command timed out.
    pub fn resolve(&self, reply: Reply) -> bool {
        let Some(pending) = self.slot().take() else {
            debug!(?reply, "Discarding response with no pending command");
            return false;
        };
        debug!(id = pending.id, command = %pending.command, ?reply, "Command resolved");
        // The caller may have given up between the take and the send.
        pending.reply.send(reply).is_ok()
    }

    /// `true` while a command is awaiting its reply.
    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    fn clear(&self, id: u64) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            *slot = None;
        }
    }

    /// Send `command` and wait up to `timeout` for its reply.
    ///
    /// Concurrent callers queue in arrival order. Send failures are retried
    /// up to `max_retries` attempts in total; a missing reply is not resent.
    pub async fn request_response<S: PacketSender>(
        &self,
        sender: &S,
        command: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<CommandOutcome> {
        let packet = encode_request(command)?;
        let _turn = self.gate.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        *self.slot() = Some(PendingCommand { id, command: command.to_owned(), reply: tx });
        debug!(id, command, "Sending command");

        if let Err(e) = send_with_retries(sender, &packet, max_retries, command).await {
            self.clear(id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Reply::Outcome(outcome))) => Ok(outcome),
            Ok(Ok(Reply::Rejected)) => {
                Err(NatNetError::CommandRejected { command: command.to_owned() })
            }
            Ok(Err(_)) => Err(NatNetError::socket_error(
                "await command response",
                io::Error::new(io::ErrorKind::ConnectionAborted, "command channel closed"),
            )),
            Err(_) => {
                self.clear(id);
                warn!(id, command, ?timeout, "Command timed out");
                Err(NatNetError::CommandTimeout { command: command.to_owned(), timeout })
            }
        }
    }
}
