//! onair-protocol: Wire protocol for the onair rotation coordinator
//!
//! This crate defines the JSON messages exchanged between browser clients
//! and the coordinator over a WebSocket. Every frame is a single JSON object
//! tagged by its `type` field.

pub mod codec;
pub mod connection;
pub mod error;
pub mod message;

pub use codec::{
    decode_client_event, decode_client_event_bytes, encode_server_event, MAX_FRAME_SIZE,
};
pub use connection::ConnectionId;
pub use error::ProtocolError;
pub use message::{ClientEvent, DisplayColors, ErrorCode, ServerEvent};
