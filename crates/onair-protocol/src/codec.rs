//! Text frame codec
//!
//! WebSocket frames are decoded one at a time, so unlike a stream codec
//! there is no partial-frame state to carry between calls.

use crate::error::ProtocolError;
use crate::message::{ClientEvent, ServerEvent};

/// Maximum accepted size of an inbound frame (64 KiB)
///
/// Session descriptions are the largest legitimate payloads and stay well
/// below this.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Decode an inbound text frame
pub fn decode_client_event(text: &str) -> Result<ClientEvent, ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(serde_json::from_str(text)?)
}

/// Decode an inbound binary frame carrying UTF-8 JSON
pub fn decode_client_event_bytes(bytes: &[u8]) -> Result<ClientEvent, ProtocolError> {
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
    decode_client_event(text)
}

/// Encode an outbound notification as a text frame
pub fn encode_server_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vote() {
        let event = decode_client_event(r#"{"type":"vote","position":100}"#).unwrap();
        assert_eq!(event, ClientEvent::Vote { position: 100.0 });
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let text = format!(
            r#"{{"type":"new-comment","text":"{}"}}"#,
            "x".repeat(MAX_FRAME_SIZE)
        );
        match decode_client_event(&text) {
            Err(ProtocolError::FrameTooLarge { size, max }) => {
                assert!(size > max);
                assert_eq!(max, MAX_FRAME_SIZE);
            }
            other => panic!("Expected FrameTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_client_event("not json"),
            Err(ProtocolError::Serialization(_))
        ));
    }

    #[test]
    fn test_decode_bytes_rejects_invalid_utf8() {
        assert!(matches!(
            decode_client_event_bytes(&[0xff, 0xfe, 0xfd]),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_decode_bytes() {
        let event = decode_client_event_bytes(br#"{"type":"ping"}"#).unwrap();
        assert_eq!(event, ClientEvent::Ping);
    }

    #[test]
    fn test_encode_no_one_live() {
        let text = encode_server_event(&ServerEvent::NoOneLive).unwrap();
        assert_eq!(text, r#"{"type":"no-one-live"}"#);
    }
}
