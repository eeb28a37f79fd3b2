//! Frame sinks: where decoded packets go
//!
//! The receive loops hand every decoded frame, model definition and server
//! message to a [`FrameSink`]. Implement the trait directly for synchronous
//! consumers, or use [`StreamSink`] to get async streams with optional rate
//! limiting.
//!
//! ```rust,no_run
//! use natnet::{ClientConfig, NatNet, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> natnet::Result<()> {
//!     let (client, sink) = NatNet::connect_streaming(ClientConfig::default()).await?;
//!     let mut frames = sink.frames(UpdateRate::Max(10));
//!     while let Some(frame) = frames.next().await {
//!         if let Some(body) = frame.rigid_body(1) {
//!             println!("{:?}", body.position);
//!         }
//!     }
//!     drop(client);
//!     Ok(())
//! }
//! ```

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::debug;

use crate::stream::ThrottleExt;
use crate::{Descriptor, FrameOfData, UpdateRate};

/// Consumer of decoded packets.
///
/// Called from the receive loop tasks, so implementations must return
/// quickly. Frames from the data channel arrive in datagram order.
pub trait FrameSink: Send + Sync + 'static {
    fn on_frame(&self, frame: FrameOfData);

    fn on_model_definition(&self, descriptors: Vec<Descriptor>) {
        debug!(count = descriptors.len(), "Model definition ignored by sink");
    }

    fn on_message(&self, message: String) {
        debug!(%message, "Server message ignored by sink");
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Arc<S> {
    fn on_frame(&self, frame: FrameOfData) {
        (**self).on_frame(frame);
    }

    fn on_model_definition(&self, descriptors: Vec<Descriptor>) {
        (**self).on_model_definition(descriptors);
    }

    fn on_message(&self, message: String) {
        (**self).on_message(message);
    }
}

const MESSAGE_CAPACITY: usize = 64;

/// [`FrameSink`] that republishes everything to async subscribers.
///
/// Frames and model definitions use watch semantics: a slow subscriber skips
/// to the newest value instead of queueing. Server messages are broadcast
/// and a lagging subscriber loses the oldest ones.
#[derive(Debug, Clone)]
pub struct StreamSink {
    frames: Arc<watch::Sender<Option<Arc<FrameOfData>>>>,
    models: Arc<watch::Sender<Option<Arc<Vec<Descriptor>>>>>,
    messages: broadcast::Sender<String>,
}

impl Default for StreamSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSink {
    pub fn new() -> Self {
        let (frames, _) = watch::channel(None);
        let (models, _) = watch::channel(None);
        let (messages, _) = broadcast::channel(MESSAGE_CAPACITY);
        Self { frames: Arc::new(frames), models: Arc::new(models), messages }
    }

    /// Subscribe to frames at `rate`.
    ///
    /// The stream starts with the most recent frame, if any.
    pub fn frames(&self, rate: UpdateRate) -> BoxStream<'static, Arc<FrameOfData>> {
        let frames =
            WatchStream::new(self.frames.subscribe()).filter_map(|opt| async move { opt });
        match rate.throttle_interval() {
            None => frames.boxed(),
            Some(period) => frames.throttle(period).boxed(),
        }
    }

    pub fn model_definitions(&self) -> BoxStream<'static, Arc<Vec<Descriptor>>> {
        WatchStream::new(self.models.subscribe()).filter_map(|opt| async move { opt }).boxed()
    }

    /// Server messages received after subscribing.
    pub fn messages(&self) -> BoxStream<'static, String> {
        BroadcastStream::new(self.messages.subscribe())
            .filter_map(|msg| async move { msg.ok() })
            .boxed()
    }

    pub fn latest_frame(&self) -> Option<Arc<FrameOfData>> {
        self.frames.borrow().clone()
    }

    pub fn latest_model_definition(&self) -> Option<Arc<Vec<Descriptor>>> {
        self.models.borrow().clone()
    }
}

impl FrameSink for StreamSink {
    fn on_frame(&self, frame: FrameOfData) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    fn on_model_definition(&self, descriptors: Vec<Descriptor>) {
        self.models.send_replace(Some(Arc::new(descriptors)));
    }

    fn on_message(&self, message: String) {
        // No subscribers is not an error.
        let _ = self.messages.send(message);
    }
}
