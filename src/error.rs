//! Error types for the NatNet client.
//!
//! Every fallible operation in the crate returns [`NatNetError`]. Variants fall
//! into four groups, and the group decides how the error is handled:
//!
//! - **Decode errors** (`TruncatedEnvelope`, `PayloadLengthMismatch`,
//!   `TruncatedPayload`, `InvalidCount`, `UnknownDescriptor`, `InvalidText`)
//!   are per-packet. The receive loops log them and drop the datagram.
//! - **Encode errors** (`PayloadTooLarge`, `InvalidCommand`) are caller errors.
//! - **Socket errors** abort channel setup but are retried by the caller for
//!   transient send failures.
//! - **Command errors** (`CommandTimeout`, `CommandRejected`) are returned to the
//!   caller awaiting that command.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use natnet::NatNetError;
//! use std::time::Duration;
//!
//! let error = NatNetError::CommandTimeout { command: "TestRequest".into(), timeout: Duration::from_millis(150) };
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for NatNet operations.
pub type Result<T, E = NatNetError> = std::result::Result<T, E>;

/// Main error type for NatNet operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NatNetError {
    #[error("Packet too short for envelope header: {available} bytes")]
    TruncatedEnvelope { available: usize },

    #[error("Envelope declares {declared} payload bytes but only {available} are present")]
    PayloadLengthMismatch { declared: usize, available: usize },

    #[error("Truncated payload while reading {context}: need {needed} bytes at offset {offset}, have {available}")]
    TruncatedPayload { context: &'static str, offset: usize, needed: usize, available: usize },

    #[error("Invalid element count {count} while reading {context}")]
    InvalidCount { context: &'static str, count: i64 },

    #[error("Unknown data description type {type_tag}")]
    UnknownDescriptor { type_tag: i32 },

    #[error("Invalid text in {context}: {details}")]
    InvalidText { context: &'static str, details: String },

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Invalid command text: {reason}")]
    InvalidCommand { reason: String },

    #[error("Socket error during {operation}")]
    Socket {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Server rejected command '{command}' as unrecognized")]
    CommandRejected { command: String },

    #[error("Configuration error: {reason}")]
    Config {
        reason: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NatNetError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            NatNetError::Socket { .. } => true,
            NatNetError::CommandTimeout { .. } => true,
            NatNetError::TruncatedEnvelope { .. } => false,
            NatNetError::PayloadLengthMismatch { .. } => false,
            NatNetError::TruncatedPayload { .. } => false,
            NatNetError::InvalidCount { .. } => false,
            NatNetError::UnknownDescriptor { .. } => false,
            NatNetError::InvalidText { .. } => false,
            NatNetError::PayloadTooLarge { .. } => false,
            NatNetError::InvalidCommand { .. } => false,
            NatNetError::CommandRejected { .. } => false,
            NatNetError::Config { .. } => false,
        }
    }

    /// Returns whether this error came from decoding a single inbound packet.
    ///
    /// Receive loops drop the packet and keep running for these.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            NatNetError::TruncatedEnvelope { .. }
                | NatNetError::PayloadLengthMismatch { .. }
                | NatNetError::TruncatedPayload { .. }
                | NatNetError::InvalidCount { .. }
                | NatNetError::UnknownDescriptor { .. }
                | NatNetError::InvalidText { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            NatNetError::TruncatedEnvelope { .. } | NatNetError::PayloadLengthMismatch { .. } => {
                vec![
                    "Check for datagram truncation by undersized receive buffers",
                    "Verify the sender speaks the NatNet envelope format",
                ]
            }
            NatNetError::TruncatedPayload { .. }
            | NatNetError::InvalidCount { .. }
            | NatNetError::UnknownDescriptor { .. } => vec![
                "Confirm the server info handshake completed before streaming",
                "Check that the server's NatNet version is supported",
                "Capture the datagram for offline inspection",
            ],
            NatNetError::InvalidText { .. } => vec![
                "Check asset names for non-UTF-8 characters",
                "Verify the sender NUL-terminates strings",
            ],
            NatNetError::PayloadTooLarge { .. } => {
                vec!["Shorten the command text", "Split the request into several commands"]
            }
            NatNetError::InvalidCommand { .. } => vec!["Remove NUL characters from command text"],
            NatNetError::Socket { .. } => vec![
                "Check that the local interface address exists on this host",
                "Ensure no other process holds the command or data port exclusively",
                "Verify firewall rules allow UDP on ports 1510 and 1511",
            ],
            NatNetError::CommandTimeout { .. } => vec![
                "Verify the server address and command port",
                "Check that streaming is enabled on the server",
                "Increase the command timeout",
            ],
            NatNetError::CommandRejected { .. } => vec![
                "Check the command name and argument syntax",
                "Verify the server version supports this command",
            ],
            NatNetError::Config { .. } => {
                vec!["Check the configuration file syntax", "Compare against the documented defaults"]
            }
        }
    }

    /// Helper constructor for truncated payload errors.
    pub fn truncated_payload(
        context: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    ) -> Self {
        NatNetError::TruncatedPayload { context, offset, needed, available }
    }

    /// Helper constructor for socket errors.
    pub fn socket_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        NatNetError::Socket { operation: operation.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        NatNetError::Config { reason: reason.into(), path: None, source: None }
    }

    /// Helper constructor for configuration errors with a file and source.
    pub fn config_error_with_source(
        reason: impl Into<String>,
        path: Option<PathBuf>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        NatNetError::Config { reason: reason.into(), path, source: Some(source) }
    }
}

impl From<std::io::Error> for NatNetError {
    fn from(err: std::io::Error) -> Self {
        NatNetError::Socket { operation: "<unknown>".to_string(), source: err }
    }
}
