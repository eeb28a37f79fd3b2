//! Test utilities: sample scenes, sample frames and a loopback fake server
//!
//! Shared by the unit tests and, behind the `benchmark` feature, by the
//! criterion benches.

#![cfg(any(test, feature = "benchmark"))]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::codec::{
    MAX_PACKET_SIZE, decode_envelope, encode_empty, encode_envelope, encode_frame,
    encode_model_definition, encode_server_info, encode_status_response, encode_text_message,
};
use crate::config::{ClientConfig, ConnectionType};
use crate::{
    AnalogDeviceSample, BoneDescriptor, Descriptor, FrameFlags, FrameOfData, HighResTimestamps,
    LabeledMarkerSample, MarkerId, MarkerParams, MarkerSetDescriptor, MarkerSetSample,
    MessageKind, ProtocolVersion, Quaternion, RigidBodyDescriptor, RigidBodyMarker,
    RigidBodyMarkerDescriptor, RigidBodySample, ServerInfo, SkeletonDescriptor, SkeletonSample,
    Timecode, Vec3,
};

/// Scene with one marker set, two rigid bodies and a two-bone skeleton.
pub fn sample_scene() -> Vec<Descriptor> {
    vec![
        Descriptor::MarkerSet(MarkerSetDescriptor {
            name: "Wand".into(),
            marker_names: vec!["Tip".into(), "Middle".into(), "Base".into()],
        }),
        Descriptor::RigidBody(RigidBodyDescriptor {
            name: Some("Drone".into()),
            id: 1,
            parent_id: -1,
            offset: Vec3::default(),
            markers: vec![
                RigidBodyMarkerDescriptor { position: Vec3::new(0.1, 0.0, 0.0), required_label: 1 },
                RigidBodyMarkerDescriptor { position: Vec3::new(0.0, 0.1, 0.0), required_label: 2 },
            ],
        }),
        Descriptor::RigidBody(RigidBodyDescriptor {
            name: Some("Camera".into()),
            id: 2,
            parent_id: -1,
            offset: Vec3::new(0.0, 0.0, 0.05),
            markers: Vec::new(),
        }),
        Descriptor::Skeleton(SkeletonDescriptor {
            name: "Performer".into(),
            id: 3,
            bones: vec![
                BoneDescriptor {
                    name: Some("Hip".into()),
                    id: 1,
                    parent_id: 0,
                    offset: Vec3::default(),
                },
                BoneDescriptor {
                    name: Some("Spine".into()),
                    id: 2,
                    parent_id: 1,
                    offset: Vec3::new(0.0, 0.2, 0.0),
                },
            ],
        }),
    ]
}

fn rigid_body(id: i32, offset: f32, version: ProtocolVersion) -> RigidBodySample {
    let markers = if version.supports(crate::codec::GatedField::RigidBodyMarkers) {
        let details = version.supports(crate::codec::GatedField::RigidBodyMarkerDetails);
        (0..3i32)
            .map(|i| RigidBodyMarker {
                position: Vec3::new(offset + i as f32 * 0.01, 1.0, 0.5),
                id: details.then_some(i + 1),
                size: details.then_some(0.014),
            })
            .collect()
    } else {
        Vec::new()
    };

    RigidBodySample {
        id,
        position: Vec3::new(offset, 1.0, 0.5),
        orientation: Quaternion::IDENTITY,
        markers,
        mean_error: version
            .supports(crate::codec::GatedField::MeanMarkerError)
            .then_some(0.0004),
        tracking_valid: version.supports(crate::codec::GatedField::TrackingValid).then_some(true),
    }
}

/// Frame populated with every section `version` carries.
///
/// Fields the version does not carry keep the values `decode_frame` produces
/// for them, so decoding the encoded frame gives it back unchanged.
pub fn sample_frame(frame_number: i32, version: ProtocolVersion) -> FrameOfData {
    use crate::codec::GatedField as F;
    let has = |field| version.supports(field);

    let labeled_markers = if has(F::LabeledMarkers) {
        (1..=4u16)
            .map(|marker| LabeledMarkerSample {
                id: MarkerId { model_id: 1, marker_id: marker },
                position: Vec3::new(f32::from(marker) * 0.1, 1.0, 0.5),
                size: 0.014,
                params: has(F::LabeledMarkerParams).then(|| {
                    MarkerParams::from_bits(0x04, has(F::LabeledMarkerExtendedParams))
                }),
                residual: has(F::LabeledMarkerResidual).then_some(0.0002),
            })
            .collect()
    } else {
        Vec::new()
    };

    let analog = |id| AnalogDeviceSample {
        id,
        channels: vec![vec![0.5, 0.25], vec![1.0, 2.0]],
    };

    FrameOfData {
        frame_number,
        marker_sets: vec![MarkerSetSample {
            name: "Wand".into(),
            markers: vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.1, 0.0)],
        }],
        unlabeled_markers: vec![Vec3::new(2.0, 0.1, -1.0)],
        rigid_bodies: vec![rigid_body(1, 0.0, version), rigid_body(2, 1.5, version)],
        skeletons: if has(F::Skeletons) {
            vec![SkeletonSample { id: 3, rigid_bodies: vec![rigid_body(1, 0.2, version)] }]
        } else {
            Vec::new()
        },
        labeled_markers,
        force_plates: if has(F::ForcePlates) { vec![analog(7)] } else { Vec::new() },
        devices: if has(F::Devices) { vec![analog(9)] } else { Vec::new() },
        software_latency: has(F::SoftwareLatency).then_some(0.0042),
        timecode: Timecode::from_raw(0x0102_030A, 7),
        timestamp: f64::from(frame_number) * 0.25,
        high_res_timestamps: has(F::HighResTimestamps).then_some(HighResTimestamps {
            mid_exposure: 1_000,
            data_received: 1_500,
            transmit: 1_800,
        }),
        flags: FrameFlags { recording: true, tracked_models_changed: false },
    }
}

/// Server info advertising `version`.
pub fn server_info(version: ProtocolVersion) -> ServerInfo {
    ServerInfo {
        app_name: "Motive".into(),
        app_version: [3, 1, 0, 0],
        protocol_version: version,
        capabilities: None,
    }
}

/// How the fake server answers a text request.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeReply {
    Status(i32),
    Text(String),
    Unrecognized,
    Silent,
}

type Responder = dyn Fn(&str) -> FakeReply + Send + Sync;

/// Loopback NatNet server for exercising the client end to end.
///
/// Answers connect with server info, model definition and frame requests
/// with [`sample_scene`] and [`sample_frame`], and text requests with
/// whatever the responder returns. Every text request is recorded in arrival
/// order.
pub struct FakeServer {
    socket: Arc<UdpSocket>,
    info: ServerInfo,
    client: Arc<Mutex<Option<SocketAddr>>>,
    requests: Arc<Mutex<Vec<String>>>,
    cancel: CancellationToken,
}

impl FakeServer {
    pub async fn start(
        info: ServerInfo,
        respond: impl Fn(&str) -> FakeReply + Send + Sync + 'static,
    ) -> std::io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?);
        let server = Self {
            socket,
            info,
            client: Arc::default(),
            requests: Arc::default(),
            cancel: CancellationToken::new(),
        };
        tokio::spawn(serve(
            server.socket.clone(),
            server.info.clone(),
            Arc::new(respond),
            server.client.clone(),
            server.requests.clone(),
            server.cancel.clone(),
        ));
        Ok(server)
    }

    fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap_or_else(|_| SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Unicast loopback configuration pointing at this server.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST);
        config.command_port = self.addr().port();
        config.data_port = 0;
        config.connection_type = ConnectionType::Unicast;
        config.handshake_timeout_ms = 2_000;
        config
    }

    /// Command endpoint of the last client that sent anything.
    fn client(&self) -> Option<SocketAddr> {
        *lock(&self.client)
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    /// Send a raw datagram to the client's command socket.
    pub async fn send_to_client(&self, packet: &[u8]) -> std::io::Result<()> {
        let Some(client) = self.client() else {
            return Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "no client yet"));
        };
        self.socket.send_to(packet, client).await.map(|_| ())
    }

    /// Send a datagram from this server's socket to an arbitrary endpoint.
    pub async fn send_to(&self, packet: &[u8], target: SocketAddr) -> std::io::Result<()> {
        self.socket.send_to(packet, target).await.map(|_| ())
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn serve(
    socket: Arc<UdpSocket>,
    info: ServerInfo,
    respond: Arc<Responder>,
    client: Arc<Mutex<Option<SocketAddr>>>,
    requests: Arc<Mutex<Vec<String>>>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    let version = info.protocol_version;
    let mut frame_number = 0;

    loop {
        let (len, from) = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(_) => continue,
            },
        };
        *lock(&client) = Some(from);

        let Ok(envelope) = decode_envelope(&buf[..len]) else {
            continue;
        };
        let reply = match envelope.kind {
            MessageKind::Connect => {
                encode_envelope(MessageKind::ServerInfo, &encode_server_info(&info)).ok()
            }
            MessageKind::RequestModelDefinition => encode_envelope(
                MessageKind::ModelDefinition,
                &encode_model_definition(&sample_scene(), version),
            )
            .ok(),
            MessageKind::RequestFrameOfData => {
                frame_number += 1;
                encode_envelope(
                    MessageKind::FrameOfData,
                    &encode_frame(&sample_frame(frame_number, version), version),
                )
                .ok()
            }
            MessageKind::Request => {
                let text = crate::codec::cursor::text_until_nul(envelope.payload);
                lock(&requests).push(text.clone());
                match respond(&text) {
                    FakeReply::Status(code) => encode_status_response(code).ok(),
                    FakeReply::Text(reply) => encode_text_message(MessageKind::Response, &reply).ok(),
                    FakeReply::Unrecognized => Some(encode_empty(MessageKind::UnrecognizedRequest)),
                    FakeReply::Silent => None,
                }
            }
            other => {
                debug!(?other, "Fake server ignoring message");
                None
            }
        };

        if let Some(reply) = reply {
            let _ = socket.send_to(&reply, from).await;
        }
    }
}
