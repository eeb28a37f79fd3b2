//! Server info payload
//!
//! Layout: 256-byte NUL-padded application name, application version
//! `[u8; 4]`, protocol version `[u8; 4]`. Newer servers append a clock
//! frequency, data port and multicast settings; they are decoded when the
//! payload is long enough and ignored otherwise.

use std::net::Ipv4Addr;

use super::cursor::{PayloadReader, PayloadWriter};
use crate::{ProtocolVersion, Result, ServerCapabilities, ServerInfo};

/// Width of the application name field.
pub const APP_NAME_WIDTH: usize = 256;

/// Bytes required for the name and both version arrays.
pub const SERVER_INFO_SIZE: usize = APP_NAME_WIDTH + 4 + 4;

/// Bytes required for the capability trailer.
pub const SERVER_CAPABILITIES_SIZE: usize = 8 + 2 + 1 + 4;

pub fn decode_server_info(payload: &[u8]) -> Result<ServerInfo> {
    let mut reader = PayloadReader::new(payload);
    let app_name = reader.fixed_string(APP_NAME_WIDTH, "server name")?;
    let app_version = reader.array::<4>("application version")?;
    let protocol_version = ProtocolVersion::from_bytes(reader.array::<4>("protocol version")?);

    let capabilities = if reader.remaining() >= SERVER_CAPABILITIES_SIZE {
        Some(ServerCapabilities {
            clock_frequency: reader.u64("clock frequency")?,
            data_port: reader.u16("data port")?,
            multicast: reader.u8("multicast flag")? != 0,
            multicast_group: Ipv4Addr::from(reader.array::<4>("multicast address")?),
        })
    } else {
        None
    };

    Ok(ServerInfo { app_name, app_version, protocol_version, capabilities })
}

/// Encode a server info payload. Names longer than 255 bytes are truncated.
pub fn encode_server_info(info: &ServerInfo) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(SERVER_INFO_SIZE + SERVER_CAPABILITIES_SIZE);
    writer
        .fixed_string(&info.app_name, APP_NAME_WIDTH)
        .bytes(&info.app_version)
        .bytes(&info.protocol_version.to_bytes());
    if let Some(caps) = &info.capabilities {
        writer
            .u64(caps.clock_frequency)
            .u16(caps.data_port)
            .u8(u8::from(caps.multicast))
            .bytes(&caps.multicast_group.octets());
    }
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NatNetError;

    fn motive(version: [u8; 4]) -> ServerInfo {
        ServerInfo {
            app_name: "Motive".to_string(),
            app_version: [2, 3, 1, 0],
            protocol_version: ProtocolVersion::from_bytes(version),
            capabilities: None,
        }
    }

    #[test]
    fn decodes_base_layout() {
        let payload = encode_server_info(&motive([3, 1, 0, 0]));
        assert_eq!(payload.len(), SERVER_INFO_SIZE);

        let info = decode_server_info(&payload).unwrap();
        assert_eq!(info.app_name, "Motive");
        assert_eq!(info.app_version, [2, 3, 1, 0]);
        assert_eq!(info.protocol_version, ProtocolVersion::new(3, 1, 0, 0));
        assert_eq!(info.capabilities, None);
    }

    #[test]
    fn decodes_capability_trailer() {
        let info = ServerInfo {
            capabilities: Some(ServerCapabilities {
                clock_frequency: 10_000_000,
                data_port: 1511,
                multicast: true,
                multicast_group: Ipv4Addr::new(239, 255, 42, 99),
            }),
            ..motive([3, 0, 0, 0])
        };
        let mut payload = encode_server_info(&info);
        // Struct padding some servers send is ignored.
        payload.push(0);
        assert_eq!(decode_server_info(&payload).unwrap(), info);
    }

    #[test]
    fn partial_trailer_is_ignored() {
        let mut payload = encode_server_info(&motive([2, 9, 0, 0]));
        payload.extend_from_slice(&[1, 2, 3]);
        assert_eq!(decode_server_info(&payload).unwrap().capabilities, None);
    }

    #[test]
    fn short_payload_is_truncated() {
        let payload = encode_server_info(&motive([3, 1, 0, 0]));
        let err = decode_server_info(&payload[..SERVER_INFO_SIZE - 1]).unwrap_err();
        assert!(matches!(err, NatNetError::TruncatedPayload { context: "protocol version", .. }));
    }

    #[test]
    fn long_names_are_truncated() {
        let info = ServerInfo { app_name: "n".repeat(400), ..motive([3, 1, 0, 0]) };
        let decoded = decode_server_info(&encode_server_info(&info)).unwrap();
        assert_eq!(decoded.app_name.len(), APP_NAME_WIDTH - 1);
    }
}
