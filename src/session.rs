//! Negotiated server state shared by the receive loops and the client

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{ProtocolVersion, ServerInfo};

/// Latest [`ServerInfo`], published through a watch channel.
///
/// Written only by the command receive loop; every reader sees either the
/// previous or the new value, never a mix.
#[derive(Debug)]
pub(crate) struct SessionState {
    server: watch::Sender<Option<Arc<ServerInfo>>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (server, _) = watch::channel(None);
        Self { server }
    }

    /// Replace the server info; later handshakes overwrite earlier ones.
    pub fn publish(&self, info: ServerInfo) {
        let version = info.protocol_version;
        let previous = self.server.send_replace(Some(Arc::new(info)));
        match previous {
            Some(prev) if prev.protocol_version != version => {
                warn!(from = %prev.protocol_version, to = %version, "Server protocol version changed");
            }
            Some(_) => {}
            None => {
                if let Some(current) = self.server.borrow().as_ref() {
                    info!(
                        app = %current.app_name,
                        version = %version,
                        "Server info received"
                    );
                }
            }
        }
    }

    pub fn server_info(&self) -> Option<Arc<ServerInfo>> {
        self.server.borrow().clone()
    }

    /// Version to decode with. Before the handshake completes this is
    /// [`ProtocolVersion::UNNEGOTIATED`].
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.server
            .borrow()
            .as_ref()
            .map_or(ProtocolVersion::UNNEGOTIATED, |info| info.protocol_version)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ServerInfo>>> {
        self.server.subscribe()
    }
}
