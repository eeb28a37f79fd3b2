//! Per-channel traffic counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of one channel's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Datagrams received
    pub datagrams_received: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Datagrams sent
    pub datagrams_sent: u64,
    /// Send errors, including ones a retry later recovered from
    pub send_errors: u64,
    /// Receive errors reported by the socket
    pub receive_errors: u64,
    /// Datagrams dropped because they failed to decode
    pub decode_errors: u64,
    /// Frames handed to the sink
    pub frames_delivered: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ChannelCounters {
    datagrams_received: AtomicU64,
    bytes_received: AtomicU64,
    datagrams_sent: AtomicU64,
    send_errors: AtomicU64,
    receive_errors: AtomicU64,
    decode_errors: AtomicU64,
    frames_delivered: AtomicU64,
}

impl ChannelCounters {
    pub fn record_received(&self, len: usize) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_records() {
        let counters = ChannelCounters::default();
        counters.record_received(100);
        counters.record_received(28);
        counters.record_decode_error();
        counters.record_frame();
        counters.record_sent();
        counters.record_send_error();

        let stats = counters.snapshot();
        assert_eq!(stats.datagrams_received, 2);
        assert_eq!(stats.bytes_received, 128);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.frames_delivered, 1);
        assert_eq!(stats.datagrams_sent, 1);
        assert_eq!(stats.send_errors, 1);
        assert_eq!(stats.receive_errors, 0);
    }
}
