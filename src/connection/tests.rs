//! Loopback tests for the client connection
//!
//! Each test runs a [`FakeServer`] on 127.0.0.1 and a unicast client against
//! it, so nothing here needs a real Motive instance except the multicast
//! test, which also needs a route for the multicast group.

use super::*;
use crate::codec::{encode_envelope, encode_frame, encode_text_message};
use crate::config::{ClientConfig, ConnectionType};
use crate::test_utils::{FakeReply, FakeServer, sample_frame, sample_scene, server_info};
use crate::{CommandOutcome, MessageKind, NatNetError, ProtocolVersion, StreamSink, UpdateRate};
use futures::StreamExt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::info;

const V3_1: ProtocolVersion = ProtocolVersion::new(3, 1, 0, 0);
const WAIT: Duration = Duration::from_secs(2);

async fn connect(server: &FakeServer) -> (NatNetClient, StreamSink) {
    let sink = StreamSink::new();
    let client = NatNetClient::connect(server.client_config(), sink.clone())
        .await
        .expect("client should connect to the fake server");
    (client, sink)
}

fn echo(request: &str) -> FakeReply {
    FakeReply::Text(format!("echo {request}"))
}

fn loopback(addr: SocketAddr) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))
}

#[tokio::test]
async fn handshake_negotiates_frame_layout() {
    let _ = tracing_subscriber::fmt::try_init();

    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (client, sink) = connect(&server).await;
    assert_eq!(client.protocol_version(), V3_1);
    assert_eq!(client.server_info().unwrap().app_name, "Motive");
    assert!(client.is_running());

    let frame = sample_frame(42, V3_1);
    let packet = encode_envelope(MessageKind::FrameOfData, &encode_frame(&frame, V3_1)).unwrap();
    server.send_to(&packet, loopback(client.data_addr())).await.unwrap();

    let mut frames = sink.frames(UpdateRate::Native);
    let received = tokio::time::timeout(WAIT, frames.next()).await.unwrap().unwrap();
    info!(frame = received.frame_number, "Frame received");

    assert_eq!(*received, frame);
    assert!(received.high_res_timestamps.is_some());
    assert_eq!(received.software_latency, None);
    assert_eq!(received.timecode_string(), "01:02:03:10.7");
    assert_eq!(client.data_stats().frames_delivered, 1);
}

#[tokio::test]
async fn legacy_server_frames_decode_with_legacy_layout() {
    let version = ProtocolVersion::new(2, 5, 0, 0);
    let server = FakeServer::start(server_info(version), echo).await.unwrap();
    let (client, sink) = connect(&server).await;
    assert_eq!(client.protocol_version(), version);

    let frame = sample_frame(7, version);
    let packet =
        encode_envelope(MessageKind::FrameOfData, &encode_frame(&frame, version)).unwrap();
    server.send_to(&packet, loopback(client.data_addr())).await.unwrap();

    let mut frames = sink.frames(UpdateRate::Native);
    let received = tokio::time::timeout(WAIT, frames.next()).await.unwrap().unwrap();
    assert_eq!(*received, frame);
    assert!(received.software_latency.is_some());
    assert!(received.rigid_bodies[0].markers.len() == 3);
}

#[tokio::test]
async fn unanswered_handshake_is_not_fatal() {
    // Bound but never read: the connect request goes nowhere.
    let mute = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut config = ClientConfig::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST);
    config.command_port = mute.local_addr().unwrap().port();
    config.data_port = 0;
    config.connection_type = ConnectionType::Unicast;
    config.handshake_timeout_ms = 200;

    let client = NatNetClient::connect(config, StreamSink::new()).await.unwrap();
    assert!(client.server_info().is_none());
    assert!(client.protocol_version().is_unnegotiated());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_binding() {
    let config = ClientConfig::new(Ipv4Addr::UNSPECIFIED, Ipv4Addr::LOCALHOST);
    let result = NatNetClient::connect(config, StreamSink::new()).await;
    assert!(matches!(result, Err(NatNetError::Config { .. })));
}

#[tokio::test]
async fn model_definition_request_reaches_the_sink() {
    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (client, sink) = connect(&server).await;
    let mut models = sink.model_definitions();

    client.request_model_definition().await.unwrap();

    let scene = tokio::time::timeout(WAIT, models.next()).await.unwrap().unwrap();
    assert_eq!(*scene, sample_scene());
    assert_eq!(scene[1].name(), Some("Drone"));
}

#[tokio::test]
async fn frames_on_the_command_channel_are_delivered() {
    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (client, sink) = connect(&server).await;
    let mut frames = sink.frames(UpdateRate::Native);

    client.request_frame_of_data().await.unwrap();

    let frame = tokio::time::timeout(WAIT, frames.next()).await.unwrap().unwrap();
    assert_eq!(frame.frame_number, 1);
    assert_eq!(client.command_stats().frames_delivered, 1);
    assert_eq!(client.data_stats().frames_delivered, 0);
}

#[tokio::test]
async fn responses_resolve_commands() {
    let server = FakeServer::start(server_info(V3_1), |request| match request {
        "TestRequest" => FakeReply::Text("TestResponse".into()),
        "SetPlaybackLooping,0" => FakeReply::Status(0),
        "SetPlaybackCurrentFrame,100" => FakeReply::Status(3),
        _ => FakeReply::Unrecognized,
    })
    .await
    .unwrap();
    let (client, _sink) = connect(&server).await;

    let outcome = client.send_raw_command("TestRequest").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Text("TestResponse".into()));

    assert_eq!(client.set_playback_looping(false).await.unwrap(), CommandOutcome::Success);
    assert_eq!(
        client.set_playback_current_frame(100).await.unwrap(),
        CommandOutcome::Error { code: 3 }
    );

    let rejected = client.send_raw_command("NoSuchCommand").await;
    assert!(matches!(rejected, Err(NatNetError::CommandRejected { .. })));
}

#[tokio::test]
async fn playback_commands_use_name_value_text() {
    let server = FakeServer::start(server_info(V3_1), |_| FakeReply::Status(0)).await.unwrap();
    let (client, _sink) = connect(&server).await;

    client.set_playback_start_frame(-50).await.unwrap();
    client.set_playback_stop_frame(1500).await.unwrap();
    client.set_playback_looping(true).await.unwrap();
    client.set_playback_current_frame(100).await.unwrap();

    assert_eq!(
        server.requests(),
        vec![
            "SetPlaybackStartFrame,-50",
            "SetPlaybackStopFrame,1500",
            "SetPlaybackLooping,1",
            "SetPlaybackCurrentFrame,100",
        ]
    );
}

#[tokio::test]
async fn silent_server_times_out() {
    let server = FakeServer::start(server_info(V3_1), |_| FakeReply::Silent).await.unwrap();
    let (client, _sink) = connect(&server).await;

    let start = Instant::now();
    let result = client.request_response("Ping", Duration::from_millis(150), 3).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(NatNetError::CommandTimeout { .. })));
    assert!(elapsed >= Duration::from_millis(150), "timed out after {elapsed:?}");
    // A timeout is not a send failure, so nothing is resent.
    assert_eq!(server.requests(), vec!["Ping"]);
}

#[tokio::test]
async fn concurrent_commands_each_get_their_own_reply() {
    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (client, _sink) = connect(&server).await;

    let (first, second, third) = tokio::join!(
        client.send_raw_command("first"),
        client.send_raw_command("second"),
        client.send_raw_command("third"),
    );

    assert_eq!(first.unwrap().text(), Some("echo first"));
    assert_eq!(second.unwrap().text(), Some("echo second"));
    assert_eq!(third.unwrap().text(), Some("echo third"));
    assert_eq!(server.requests(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn server_messages_reach_the_sink() {
    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (_client, sink) = connect(&server).await;
    let mut messages = sink.messages();

    let packet = encode_text_message(MessageKind::MessageString, "Recording started").unwrap();
    server.send_to_client(&packet).await.unwrap();

    let message = tokio::time::timeout(WAIT, messages.next()).await.unwrap().unwrap();
    assert_eq!(message, "Recording started");
}

#[tokio::test]
async fn server_info_updates_start_with_current_info() {
    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (client, _sink) = connect(&server).await;

    let mut updates = Box::pin(client.server_info_updates());
    let info = tokio::time::timeout(Duration::from_secs(1), updates.next())
        .await
        .expect("stream should yield the negotiated info immediately")
        .unwrap();
    assert_eq!(info.protocol_version, V3_1);
    assert_eq!(*info, *server.info());
}

#[tokio::test]
async fn malformed_datagrams_are_counted_and_skipped() {
    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let (client, sink) = connect(&server).await;
    let target = loopback(client.data_addr());

    server.send_to(&[7, 0, 200, 0, 1, 2], target).await.unwrap();
    let frame = sample_frame(9, V3_1);
    let packet = encode_envelope(MessageKind::FrameOfData, &encode_frame(&frame, V3_1)).unwrap();
    server.send_to(&packet, target).await.unwrap();

    let mut frames = sink.frames(UpdateRate::Native);
    let received = tokio::time::timeout(WAIT, frames.next()).await.unwrap().unwrap();
    assert_eq!(received.frame_number, 9);

    let stats = client.data_stats();
    assert_eq!(stats.datagrams_received, 2);
    assert_eq!(stats.decode_errors, 1);
}

#[tokio::test]
#[ignore = "multicast_required"]
async fn multicast_frames_are_received() {
    let _ = tracing_subscriber::fmt::try_init();

    let server = FakeServer::start(server_info(V3_1), echo).await.unwrap();
    let mut config = server.client_config();
    config.connection_type = ConnectionType::Multicast;
    config.local_address = Ipv4Addr::UNSPECIFIED;
    config.data_port = 31511;

    let sink = StreamSink::new();
    let client = NatNetClient::connect(config.clone(), sink.clone()).await.unwrap();

    let frame = sample_frame(3, V3_1);
    let packet = encode_envelope(MessageKind::FrameOfData, &encode_frame(&frame, V3_1)).unwrap();
    server
        .send_to(&packet, SocketAddr::from((config.multicast_group, config.data_port)))
        .await
        .unwrap();

    let mut frames = sink.frames(UpdateRate::Native);
    let received = tokio::time::timeout(WAIT, frames.next()).await.unwrap().unwrap();
    assert_eq!(*received, frame);
    drop(client);
}
