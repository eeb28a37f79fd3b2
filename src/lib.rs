//! Async client for NatNet motion-capture streaming.
//!
//! NatNet servers (Motive and compatible tools) stream tracked frames over
//! UDP: a command channel for requests and replies, and a data channel
//! carrying frames to a multicast group or straight to the client. The
//! binary layout of every packet depends on the protocol version the server
//! reports during the handshake.
//!
//! # Features
//!
//! - **Version-aware codec**: one table of field gates drives both decoding
//!   and encoding for every protocol version from 1.x to 4.x
//! - **Async transport**: tokio receive loops that survive malformed
//!   datagrams and socket errors
//! - **Request/response**: serialized commands with deadlines and send
//!   retries
//! - **Streams**: [`StreamSink`] republishes frames with optional rate
//!   limiting
//!
//! ## Example
//!
//! ```rust,no_run
//! use natnet::{ClientConfig, NatNet, UpdateRate};
//! use futures::StreamExt;
//! use std::net::Ipv4Addr;
//!
//! #[tokio::main]
//! async fn main() -> natnet::Result<()> {
//!     let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 20), Ipv4Addr::new(192, 168, 1, 5));
//!     let (client, sink) = NatNet::connect_streaming(config).await?;
//!     println!("Server speaks NatNet {}", client.protocol_version());
//!
//!     client.request_model_definition().await?;
//!     let mut frames = sink.frames(UpdateRate::Native);
//!     while let Some(frame) = frames.next().await {
//!         println!("Frame {} with {} rigid bodies", frame.frame_number, frame.rigid_bodies.len());
//!     }
//!     Ok(())
//! }
//! ```

mod channel;
pub mod codec;
mod config;
mod connection;
mod correlator;
mod driver;
mod error;
mod session;
mod sink;
pub mod stream;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub use channel::ChannelStats;
pub use config::{
    ClientConfig, ConnectionType, DEFAULT_COMMAND_PORT, DEFAULT_DATA_PORT,
    DEFAULT_MULTICAST_GROUP,
};
pub use connection::NatNetClient;
pub use error::*;
pub use sink::{FrameSink, StreamSink};
pub use types::*;

/// Entry point for NatNet connections.
///
/// ```rust,no_run
/// use natnet::{ClientConfig, FrameOfData, FrameSink, NatNet};
///
/// struct Printer;
///
/// impl FrameSink for Printer {
///     fn on_frame(&self, frame: FrameOfData) {
///         println!("{} @ {}", frame.frame_number, frame.timecode_string());
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> natnet::Result<()> {
///     let client = NatNet::connect(ClientConfig::default(), Printer).await?;
///     client.request_frame_of_data().await?;
///     Ok(())
/// }
/// ```
pub struct NatNet;

impl NatNet {
    /// Connect and deliver decoded packets to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration fails validation
    /// - Either socket cannot be bound or the multicast group cannot be joined
    /// - The connect request cannot be sent
    pub async fn connect<S: FrameSink>(config: ClientConfig, sink: S) -> Result<NatNetClient> {
        NatNetClient::connect(config, sink).await
    }

    /// Connect with a [`StreamSink`] and return both.
    pub async fn connect_streaming(config: ClientConfig) -> Result<(NatNetClient, StreamSink)> {
        let sink = StreamSink::new();
        let client = NatNetClient::connect(config, sink.clone()).await?;
        Ok((client, sink))
    }
}
