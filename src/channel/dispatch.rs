//! Routing of inbound datagrams to session state, the correlator and the sink

use std::sync::Arc;
use tracing::{debug, trace};

use super::stats::ChannelCounters;
use crate::codec::{
    PacketEnvelope, decode_envelope, decode_frame, decode_message_string, decode_model_definition,
    decode_response, decode_server_info,
};
use crate::correlator::{CommandCorrelator, Reply};
use crate::session::SessionState;
use crate::sink::FrameSink;
use crate::{MessageKind, Result};

/// Which socket a datagram arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelKind {
    Command,
    Data,
}

impl ChannelKind {
    pub const fn name(self) -> &'static str {
        match self {
            ChannelKind::Command => "command",
            ChannelKind::Data => "data",
        }
    }
}

/// Shared state every receive loop dispatches into.
pub(crate) struct Dispatcher {
    session: Arc<SessionState>,
    correlator: Arc<CommandCorrelator>,
    sink: Arc<dyn FrameSink>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<SessionState>,
        correlator: Arc<CommandCorrelator>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self { session, correlator, sink }
    }

    /// Decode one datagram and act on it.
    ///
    /// Errors are per-datagram decode failures; the caller logs and moves on.
    pub fn dispatch(
        &self,
        channel: ChannelKind,
        packet: &[u8],
        counters: &ChannelCounters,
    ) -> Result<()> {
        let PacketEnvelope { kind, payload } = decode_envelope(packet)?;
        trace!(channel = channel.name(), ?kind, len = payload.len(), "Datagram");

        match (channel, kind) {
            (_, MessageKind::FrameOfData) => {
                let frame = decode_frame(payload, self.session.protocol_version())?;
                counters.record_frame();
                self.sink.on_frame(frame);
            }
            (_, MessageKind::ModelDefinition) => {
                let descriptors =
                    decode_model_definition(payload, self.session.protocol_version())?;
                debug!(channel = channel.name(), count = descriptors.len(), "Model definition");
                self.sink.on_model_definition(descriptors);
            }
            (ChannelKind::Command, MessageKind::ServerInfo) => {
                self.session.publish(decode_server_info(payload)?);
            }
            (ChannelKind::Command, MessageKind::Response) => {
                self.correlator.resolve(Reply::Outcome(decode_response(payload)));
            }
            (ChannelKind::Command, MessageKind::UnrecognizedRequest) => {
                self.correlator.resolve(Reply::Rejected);
            }
            (ChannelKind::Command, MessageKind::MessageString) => {
                self.sink.on_message(decode_message_string(payload));
            }
            (channel, kind) => {
                debug!(channel = channel.name(), ?kind, "Ignoring unexpected message");
            }
        }
        Ok(())
    }
}
