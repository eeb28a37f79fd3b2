//! NatNet wire codec
//!
//! Pure functions between byte buffers and the types in [`crate::types`].
//! Nothing here touches sockets or shared state: decoders that depend on the
//! protocol version take it as an explicit parameter.
//!
//! Every decoder has a matching encoder so tests and loopback servers can
//! produce the exact bytes a server would send.

pub(crate) mod cursor;
mod envelope;
mod frame;
mod gates;
mod model_def;
mod server_info;

pub use cursor::MAX_NAME_LENGTH;
pub use envelope::{
    ENVELOPE_HEADER_SIZE, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, PacketEnvelope, decode_envelope,
    decode_message_string, decode_response, encode_empty, encode_envelope, encode_request,
    encode_status_response, encode_text_message,
};
pub use frame::{END_OF_DATA_TAG, decode_frame, encode_frame};
pub use gates::{Availability, FIELD_GATES, FieldSet, GatedField};
pub use model_def::{decode_model_definition, encode_model_definition};
pub use server_info::{
    APP_NAME_WIDTH, SERVER_CAPABILITIES_SIZE, SERVER_INFO_SIZE, decode_server_info,
    encode_server_info,
};
