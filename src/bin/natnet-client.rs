//! Interactive NatNet client
//!
//! ```text
//! natnet-client [config.yaml]
//! natnet-client [server_ip] [local_ip]
//! ```
//!
//! Logs rigid-body poses at 10 Hz and reads single-letter commands from
//! stdin. Set `RUST_LOG` to change verbosity.

use anyhow::Context;
use futures::StreamExt;
use natnet::{
    ClientConfig, CommandOutcome, NatNet, NatNetClient, NatNetError, Result, StreamSink,
    UpdateRate,
};
use std::net::Ipv4Addr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MENU: &str = "s = model definition, f = one frame, t = test request, w = playback setup, q = quit";

fn load_config(args: &[String]) -> Result<ClientConfig> {
    let mut config = match args.first() {
        Some(path) if path.ends_with(".yaml") || path.ends_with(".yml") => {
            return ClientConfig::from_file(path);
        }
        _ => ClientConfig::default(),
    };

    let parse = |text: &String, what: &str| {
        text.parse::<Ipv4Addr>().map_err(|e| {
            NatNetError::config_error(format!("invalid {what} address {text:?}: {e}"))
        })
    };
    if let Some(server) = args.first() {
        config.server_address = parse(server, "server")?;
    }
    if let Some(local) = args.get(1) {
        config.local_address = parse(local, "local")?;
    }
    config.validate()?;
    Ok(config)
}

fn report(command: &str, outcome: Result<CommandOutcome>) {
    match outcome {
        Ok(CommandOutcome::Text(text)) => info!(command, response = %text, "Command answered"),
        Ok(CommandOutcome::Success) => info!(command, "Command succeeded"),
        Ok(CommandOutcome::Error { code }) => warn!(command, code, "Command failed"),
        Err(e) => warn!(command, error = %e, "Command not completed"),
    }
}

async fn setup_playback(client: &NatNetClient) {
    report("SetPlaybackStartFrame", client.set_playback_start_frame(-50).await);
    report("SetPlaybackStopFrame", client.set_playback_stop_frame(1500).await);
    report("SetPlaybackLooping", client.set_playback_looping(false).await);
    report("SetPlaybackCurrentFrame", client.set_playback_current_frame(100).await);
}

fn spawn_pose_logger(sink: &StreamSink) {
    let mut frames = sink.frames(UpdateRate::Max(10));
    tokio::spawn(async move {
        while let Some(frame) = frames.next().await {
            for body in frame.rigid_bodies.iter().filter(|body| body.is_tracked()) {
                info!(
                    frame = frame.frame_number,
                    id = body.id,
                    x = body.position.x,
                    y = body.position.y,
                    z = body.position.z,
                    qx = body.orientation.x,
                    qy = body.orientation.y,
                    qz = body.orientation.z,
                    qw = body.orientation.w,
                    "Rigid body pose"
                );
            }
        }
    });
}

fn spawn_model_logger(sink: &StreamSink) {
    let mut models = sink.model_definitions();
    tokio::spawn(async move {
        while let Some(descriptors) = models.next().await {
            info!(count = descriptors.len(), "Model definition received");
            for descriptor in descriptors.iter() {
                info!(tag = descriptor.type_tag(), name = ?descriptor.name(), "Descriptor");
            }
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(&args).context("loading client configuration")?;
    let (client, sink) = NatNet::connect_streaming(config)
        .await
        .context("connecting to NatNet server")?;

    match client.server_info() {
        Some(server) => info!(
            app = %server.app_name,
            app_version = ?server.app_version,
            protocol = %server.protocol_version,
            "Server connected"
        ),
        None => warn!("Server did not answer the connect request"),
    }
    spawn_pose_logger(&sink);
    spawn_model_logger(&sink);

    info!("{MENU}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match line.trim() {
            "s" => {
                if let Err(e) = client.request_model_definition().await {
                    error!(error = %e, "Model definition request failed");
                }
            }
            "f" => {
                if let Err(e) = client.request_frame_of_data().await {
                    error!(error = %e, "Frame request failed");
                }
            }
            "t" => report("TestRequest", client.send_raw_command("TestRequest").await),
            "w" => setup_playback(&client).await,
            "q" => break,
            "" => {}
            other => warn!(input = other, "Unknown command; {MENU}"),
        }
    }

    let command = client.command_stats();
    let data = client.data_stats();
    info!(
        commands_sent = command.datagrams_sent,
        frames = command.frames_delivered + data.frames_delivered,
        decode_errors = command.decode_errors + data.decode_errors,
        "Shutting down"
    );
    Ok(())
}
