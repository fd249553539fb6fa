//! Typed events pushed by the server over the per-call channel.
//!
//! Inbound messages are JSON objects with a `type` discriminant. The
//! decoder is tolerant by contract: unknown types are ignored, and a
//! malformed payload becomes an `Error` event rather than a fault, so a
//! bad message can never take down the stream.

use serde::{Deserialize, Serialize};

/// One server-pushed message describing call progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ChannelEvent {
    /// A line of conversation. `speaker` is `"agent"` or any other
    /// value, which maps to the customer role.
    Transcript { text: String, speaker: String },

    /// The call finished; terminal for the session
    CallEnded,

    /// A server-reported problem; non-terminal
    Error { message: String },
}

/// Minimal envelope to pull out the discriminant before committing to a
/// full parse, so unknown types can be skipped cheaply.
#[derive(Deserialize)]
struct TypeEnvelope {
    #[serde(rename = "type")]
    msg_type: Option<String>,
}

/// Decode one inbound channel message.
///
/// Returns `None` for recognized-but-ignorable input (unknown `type`),
/// and an `Error` event for anything malformed.
pub fn decode_message(text: &str) -> Option<ChannelEvent> {
    let envelope: TypeEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Malformed channel message: {e}");
            return Some(ChannelEvent::Error {
                message: format!("Malformed message from server: {e}"),
            });
        }
    };

    match envelope.msg_type.as_deref() {
        Some("transcript") | Some("call_ended") | Some("error") => {
            match serde_json::from_str(text) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Channel message failed to decode: {e}");
                    Some(ChannelEvent::Error {
                        message: format!("Malformed message from server: {e}"),
                    })
                }
            }
        }
        other => {
            tracing::trace!(msg_type = ?other, "Ignoring unrecognized channel message type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_transcript() {
        let event = decode_message(r#"{"type":"transcript","text":"Hello","speaker":"agent"}"#);
        assert_eq!(
            event,
            Some(ChannelEvent::Transcript {
                text: "Hello".to_string(),
                speaker: "agent".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_call_ended() {
        assert_eq!(
            decode_message(r#"{"type":"call_ended"}"#),
            Some(ChannelEvent::CallEnded)
        );
    }

    #[test]
    fn test_decode_error() {
        assert_eq!(
            decode_message(r#"{"type":"error","message":"boom"}"#),
            Some(ChannelEvent::Error {
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        assert_eq!(decode_message(r#"{"type":"heartbeat","seq":42}"#), None);
        assert_eq!(decode_message(r#"{"no_type":true}"#), None);
    }

    #[test]
    fn test_malformed_payload_becomes_error_event() {
        // Invalid JSON
        let event = decode_message("{not json").unwrap();
        assert!(matches!(event, ChannelEvent::Error { .. }));

        // Known type, missing required field
        let event = decode_message(r#"{"type":"transcript","speaker":"agent"}"#).unwrap();
        assert!(matches!(event, ChannelEvent::Error { .. }));
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = ChannelEvent::Transcript {
            text: "Hi".to_string(),
            speaker: "customer".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"transcript""#));
        let parsed: ChannelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
