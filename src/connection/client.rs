//! NatNet client: socket setup, handshake and the command surface

use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::channel::{
    ChannelCounters, ChannelKind, ChannelStats, CommandChannel, Dispatcher, bind_command_socket,
    bind_data_socket,
};
use crate::codec::encode_empty;
use crate::config::ClientConfig;
use crate::correlator::{CommandCorrelator, send_with_retries};
use crate::driver::{Driver, DriverTasks, ReceiveLoop};
use crate::session::SessionState;
use crate::sink::FrameSink;
use crate::{CommandOutcome, MessageKind, ProtocolVersion, Result, ServerInfo};

/// Connected NatNet client.
///
/// Owns the command and data sockets and their receive loops. Decoded
/// packets go to the [`FrameSink`] given to [`connect`](Self::connect);
/// commands are issued through the methods here. Dropping the client stops
/// both loops.
pub struct NatNetClient {
    config: ClientConfig,
    command: CommandChannel,
    data_addr: SocketAddr,
    data_counters: Arc<ChannelCounters>,
    session: Arc<SessionState>,
    correlator: Arc<CommandCorrelator>,
    tasks: DriverTasks,
}

impl NatNetClient {
    /// Bind both channels, start the receive loops and perform the
    /// connect handshake.
    ///
    /// Socket setup failures are returned. A server that does not answer the
    /// handshake within `handshake_timeout_ms` is only logged: frames are then
    /// decoded with the pre-negotiation layout until server info arrives.
    pub async fn connect<S: FrameSink>(config: ClientConfig, sink: S) -> Result<Self> {
        config.validate()?;
        info!(
            server = %config.server_command_addr(),
            local = %config.local_address,
            mode = ?config.connection_type,
            "Connecting to NatNet server"
        );

        let command_socket = Arc::new(bind_command_socket(&config)?);
        let data_socket = Arc::new(bind_data_socket(&config)?);
        let data_addr = data_socket
            .local_addr()
            .map_err(|e| crate::NatNetError::socket_error("read data socket address", e))?;

        let session = Arc::new(SessionState::new());
        let correlator = Arc::new(CommandCorrelator::new());
        let command_counters = Arc::new(ChannelCounters::default());
        let data_counters = Arc::new(ChannelCounters::default());

        let dispatcher =
            Arc::new(Dispatcher::new(session.clone(), correlator.clone(), Arc::new(sink)));
        let tasks = Driver::spawn(
            ReceiveLoop {
                channel: ChannelKind::Command,
                socket: command_socket.clone(),
                counters: command_counters.clone(),
            },
            ReceiveLoop {
                channel: ChannelKind::Data,
                socket: data_socket,
                counters: data_counters.clone(),
            },
            dispatcher,
        );

        let command =
            CommandChannel::new(command_socket, config.server_command_addr(), command_counters);
        let client = Self {
            config,
            command,
            data_addr,
            data_counters,
            session,
            correlator,
            tasks,
        };

        client.handshake().await?;
        Ok(client)
    }

    async fn handshake(&self) -> Result<()> {
        let mut updates = self.session.subscribe();
        self.send_empty(MessageKind::Connect, "connect request").await?;

        let timeout = self.config.handshake_timeout();
        match tokio::time::timeout(timeout, updates.wait_for(Option::is_some)).await {
            Ok(Ok(info)) => {
                if let Some(info) = info.as_ref() {
                    info!(app = %info.app_name, version = %info.protocol_version, "Connected");
                }
            }
            Ok(Err(_)) => debug!("Session state closed during handshake"),
            Err(_) => warn!(
                ?timeout,
                "No server info received; decoding with the pre-negotiation layout"
            ),
        }
        Ok(())
    }

    async fn send_empty(&self, kind: MessageKind, what: &str) -> Result<()> {
        let packet = encode_empty(kind);
        send_with_retries(&self.command, &packet, self.config.send_attempts, what).await
    }

    /// Ask the server to send its model definition. The reply reaches the
    /// sink's `on_model_definition`.
    pub async fn request_model_definition(&self) -> Result<()> {
        self.send_empty(MessageKind::RequestModelDefinition, "model definition request").await
    }

    /// Ask the server for one frame of data. The reply reaches the sink's
    /// `on_frame`.
    pub async fn request_frame_of_data(&self) -> Result<()> {
        self.send_empty(MessageKind::RequestFrameOfData, "frame of data request").await
    }

    /// Send a text command with the configured timeout and send attempts.
    pub async fn send_raw_command(&self, command: &str) -> Result<CommandOutcome> {
        self.request_response(command, self.config.command_timeout(), self.config.send_attempts)
            .await
    }

    /// Send a text command and wait up to `timeout` for its response.
    ///
    /// Only one command is in flight at a time; concurrent callers wait
    /// their turn in call order.
    pub async fn request_response(
        &self,
        command: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<CommandOutcome> {
        self.correlator.request_response(&self.command, command, timeout, max_retries).await
    }

    pub async fn set_playback_start_frame(&self, frame: i32) -> Result<CommandOutcome> {
        self.send_raw_command(&format!("SetPlaybackStartFrame,{frame}")).await
    }

    pub async fn set_playback_stop_frame(&self, frame: i32) -> Result<CommandOutcome> {
        self.send_raw_command(&format!("SetPlaybackStopFrame,{frame}")).await
    }

    pub async fn set_playback_looping(&self, looping: bool) -> Result<CommandOutcome> {
        self.send_raw_command(&format!("SetPlaybackLooping,{}", i32::from(looping))).await
    }

    pub async fn set_playback_current_frame(&self, frame: i32) -> Result<CommandOutcome> {
        self.send_raw_command(&format!("SetPlaybackCurrentFrame,{frame}")).await
    }

    /// Latest server info, if the handshake has completed.
    pub fn server_info(&self) -> Option<Arc<ServerInfo>> {
        self.session.server_info()
    }

    /// Version packets are currently decoded with.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.session.protocol_version()
    }

    /// Server info now (if known) and on every later handshake.
    pub fn server_info_updates(&self) -> impl Stream<Item = Arc<ServerInfo>> + Send + 'static {
        WatchStream::new(self.session.subscribe()).filter_map(|opt| async move { opt })
    }

    /// Local address of the command socket.
    pub fn command_addr(&self) -> Result<SocketAddr> {
        self.command
            .socket()
            .local_addr()
            .map_err(|e| crate::NatNetError::socket_error("read command socket address", e))
    }

    /// Local address of the data socket.
    pub fn data_addr(&self) -> SocketAddr {
        self.data_addr
    }

    /// Server command endpoint this client talks to.
    pub fn server_addr(&self) -> SocketAddr {
        self.command.server()
    }

    pub fn command_stats(&self) -> ChannelStats {
        self.command.counters().snapshot()
    }

    pub fn data_stats(&self) -> ChannelStats {
        self.data_counters.snapshot()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `true` while both receive loops are running.
    pub fn is_running(&self) -> bool {
        !self.tasks.command.is_finished() && !self.tasks.data.is_finished()
    }
}

impl Drop for NatNetClient {
    fn drop(&mut self) {
        debug!("Dropping NatNet client");
        self.tasks.cancel.cancel();
    }
}
