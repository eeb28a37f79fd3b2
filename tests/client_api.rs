//! Public API tests against a scripted loopback server
//!
//! The server here is built only from the public codec, so these tests also
//! check that an application can produce every packet the client consumes.

use anyhow::{Context, Result};
use futures::StreamExt;
use natnet::codec::{
    decode_envelope, decode_frame, encode_envelope, encode_frame, encode_model_definition, encode_server_info,
    encode_text_message,
};
use natnet::{
    ClientConfig, CommandOutcome, ConnectionType, Descriptor, FrameOfData, MessageKind, NatNet,
    ProtocolVersion, Quaternion, RigidBodyDescriptor, RigidBodySample, ServerInfo, UpdateRate,
    Vec3,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

const VERSION: ProtocolVersion = ProtocolVersion::new(3, 0, 0, 0);
const WAIT: Duration = Duration::from_secs(2);

fn pose_frame(number: i32) -> FrameOfData {
    FrameOfData {
        frame_number: number,
        rigid_bodies: vec![RigidBodySample {
            id: 4,
            position: Vec3::new(0.5, 1.25, -2.0),
            orientation: Quaternion::IDENTITY,
            mean_error: Some(0.001),
            tracking_valid: Some(true),
            ..Default::default()
        }],
        timestamp: 12.5,
        ..Default::default()
    }
}

/// Answers connect, model definition requests and echoes text requests.
async fn spawn_server() -> Result<Arc<UdpSocket>> {
    let socket = Arc::new(UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?);
    let server = socket.clone();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        while let Ok((len, from)) = server.recv_from(&mut buf).await {
            let Ok(envelope) = decode_envelope(&buf[..len]) else {
                continue;
            };
            let reply = match envelope.kind {
                MessageKind::Connect => {
                    let info = ServerInfo {
                        app_name: "Scripted".into(),
                        app_version: [1, 0, 0, 0],
                        protocol_version: VERSION,
                        capabilities: None,
                    };
                    encode_envelope(MessageKind::ServerInfo, &encode_server_info(&info))
                }
                MessageKind::RequestModelDefinition => {
                    let scene = [Descriptor::RigidBody(RigidBodyDescriptor {
                        name: Some("Tracker".into()),
                        id: 4,
                        parent_id: -1,
                        ..Default::default()
                    })];
                    encode_envelope(
                        MessageKind::ModelDefinition,
                        &encode_model_definition(&scene, VERSION),
                    )
                }
                MessageKind::Request => {
                    let text = String::from_utf8_lossy(envelope.payload);
                    let reply = format!("ack {}", text.trim_end_matches('\0'));
                    encode_text_message(MessageKind::Response, &reply)
                }
                _ => continue,
            };
            if let Ok(reply) = reply {
                let _ = server.send_to(&reply, from).await;
            }
        }
    });
    Ok(socket)
}

fn unicast_config(server: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST);
    config.command_port = server.port();
    config.data_port = 0;
    config.connection_type = ConnectionType::Unicast;
    config
}

#[tokio::test]
async fn streams_poses_from_a_unicast_server() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let server = spawn_server().await?;
    let (client, sink) =
        NatNet::connect_streaming(unicast_config(server.local_addr()?)).await?;
    assert_eq!(client.protocol_version(), VERSION);

    let data = SocketAddr::from((Ipv4Addr::LOCALHOST, client.data_addr().port()));
    let packet = encode_envelope(MessageKind::FrameOfData, &encode_frame(&pose_frame(1), VERSION))?;
    server.send_to(&packet, data).await?;

    let mut frames = sink.frames(UpdateRate::Native);
    let frame = tokio::time::timeout(WAIT, frames.next()).await?.context("frame stream ended")?;
    let body = frame.rigid_body(4).context("rigid body 4 missing")?;
    assert_eq!(body.position, Vec3::new(0.5, 1.25, -2.0));
    assert!(body.is_tracked());
    assert!(frame.high_res_timestamps.is_some());
    Ok(())
}

#[tokio::test]
async fn commands_and_model_definitions() -> Result<()> {
    let server = spawn_server().await?;
    let (client, sink) =
        NatNet::connect_streaming(unicast_config(server.local_addr()?)).await?;

    let outcome = client.send_raw_command("TestRequest").await?;
    assert_eq!(outcome, CommandOutcome::Text("ack TestRequest".into()));

    let mut models = sink.model_definitions();
    client.request_model_definition().await?;
    let scene = tokio::time::timeout(WAIT, models.next()).await?.context("model stream ended")?;
    assert_eq!(scene.len(), 1);
    assert_eq!(scene[0].name(), Some("Tracker"));
    assert!(client.command_stats().datagrams_sent >= 3);
    Ok(())
}

#[test]
fn config_round_trips_through_yaml() -> Result<()> {
    let yaml = "server_address: 10.0.0.2\nlocal_address: 10.0.0.7\nconnection_type: unicast\n";
    let config = ClientConfig::from_yaml_str(yaml)?;
    assert_eq!(config.server_address, Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(config.connection_type, ConnectionType::Unicast);
    assert_eq!(config.command_port, natnet::DEFAULT_COMMAND_PORT);

    let reparsed = ClientConfig::from_yaml_str(&config.to_yaml()?)?;
    assert_eq!(reparsed, config);
    Ok(())
}

#[test]
fn application_built_frames_encode_every_section() -> Result<()> {
    let frame = FrameOfData {
        unlabeled_markers: vec![Vec3::new(0.1, 0.2, 0.3), Vec3::new(-1.0, 0.0, 2.5)],
        ..pose_frame(8)
    };
    let decoded = decode_frame(&encode_frame(&frame, VERSION), VERSION)?;
    assert_eq!(decoded.frame_number, 8);
    assert_eq!(decoded.unlabeled_markers, frame.unlabeled_markers);
    assert_eq!(decoded.rigid_bodies, frame.rigid_bodies);
    Ok(())
}
