//! Wire protocol shared by the bonfire client and its chat server.
//! Keeping this in a dedicated crate keeps the message shapes in one place
//! for the CLI, tests, and any future web frontend.
//!
//! Both directions travel as a JSON array of `{"type": ..., "value": ...}`
//! envelopes. Client batches carry sent messages and disconnect notices;
//! server batches carry incoming messages, connection diagnostics, and
//! delivery confirmations.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Client-side message identifier, unique for the lifetime of a session.
pub type LocalId = u64;

const TYPE_SEND_MESSAGE: &str = "send_message";
const TYPE_CONNECTION_CLOSED: &str = "connection_closed";
const TYPE_MESSAGE: &str = "message";
const TYPE_CONNECTION_ERROR: &str = "connection_error";
const TYPE_CONNECTION_WARNING: &str = "connection_warning";
const TYPE_MESSAGE_CONFIRMATION: &str = "message_confirmation";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("malformed batch: {0}")]
    MalformedPayload(String),
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("invalid {kind} payload: {detail}")]
    InvalidPayload { kind: String, detail: String },
}

/// Events the client originates.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    SendMessage { id: LocalId, message: String },
    Disconnect,
}

/// Events the server originates. Server-assigned message ids are arbitrary
/// JSON scalars and are carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Message {
        /// Unix seconds, with fractional precision.
        time: f64,
        author: String,
        id: Value,
        contents: String,
    },
    ConnectionError {
        detail: String,
    },
    ConnectionWarning {
        detail: String,
    },
    ConnectionClosed,
    MessageConfirmation {
        id: Value,
        /// Round trip in microseconds.
        time_delta: u64,
    },
}

/// One decoded batch element: either a recognized event or the per-element
/// error describing why it could not be decoded.
pub type DecodedEvent = Result<ServerEvent, WireError>;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    time: f64,
    author: String,
    id: Value,
    contents: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmationPayload {
    id: Value,
    time_delta: u64,
}

impl ClientEvent {
    fn to_envelope(&self) -> Value {
        match self {
            ClientEvent::SendMessage { id, message } => json!({
                "type": TYPE_SEND_MESSAGE,
                "value": {"id": id, "message": message},
            }),
            ClientEvent::Disconnect => json!({
                "type": TYPE_CONNECTION_CLOSED,
                "value": null,
            }),
        }
    }
}

impl ServerEvent {
    fn from_envelope(envelope: Envelope) -> Result<ServerEvent, WireError> {
        match envelope.kind.as_str() {
            TYPE_MESSAGE => {
                let payload: MessagePayload = parse_payload(TYPE_MESSAGE, envelope.value)?;
                Ok(ServerEvent::Message {
                    time: payload.time,
                    author: payload.author,
                    id: payload.id,
                    contents: payload.contents,
                })
            }
            TYPE_CONNECTION_ERROR => Ok(ServerEvent::ConnectionError {
                detail: parse_payload(TYPE_CONNECTION_ERROR, envelope.value)?,
            }),
            TYPE_CONNECTION_WARNING => Ok(ServerEvent::ConnectionWarning {
                detail: parse_payload(TYPE_CONNECTION_WARNING, envelope.value)?,
            }),
            TYPE_CONNECTION_CLOSED => Ok(ServerEvent::ConnectionClosed),
            TYPE_MESSAGE_CONFIRMATION => {
                let payload: ConfirmationPayload =
                    parse_payload(TYPE_MESSAGE_CONFIRMATION, envelope.value)?;
                Ok(ServerEvent::MessageConfirmation {
                    id: payload.id,
                    time_delta: payload.time_delta,
                })
            }
            other => Err(WireError::UnknownEventType(other.to_string())),
        }
    }
}

fn parse_payload<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, WireError> {
    serde_json::from_value(value).map_err(|err| WireError::InvalidPayload {
        kind: kind.to_string(),
        detail: err.to_string(),
    })
}

/// Serializes an outbound batch, preserving envelope order.
pub fn encode_batch(events: &[ClientEvent]) -> Result<Vec<u8>, WireError> {
    let envelopes: Vec<Value> = events.iter().map(ClientEvent::to_envelope).collect();
    serde_json::to_vec(&envelopes).map_err(|err| WireError::MalformedPayload(err.to_string()))
}

/// Decodes an inbound batch, preserving envelope order.
///
/// The outer error covers input that is not a JSON array of envelopes.
/// An element whose tag is unrecognized, or whose payload does not match its
/// tag, becomes an `Err` element; the rest of the batch still decodes, and
/// the caller decides how to report it.
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<DecodedEvent>, WireError> {
    let envelopes: Vec<Envelope> = serde_json::from_slice(bytes)
        .map_err(|err| WireError::MalformedPayload(err.to_string()))?;
    Ok(envelopes.into_iter().map(ServerEvent::from_envelope).collect())
}

/// Server timestamps are Unix seconds with fractional precision; the
/// presentation layer works in milliseconds.
pub fn timestamp_ms(seconds: f64) -> i64 {
    (seconds * 1000.0) as i64
}

/// Renders a round trip, delivered in microseconds, as a millisecond string
/// with at most three significant digits, truncated rather than rounded.
/// Digits left of the decimal point are always kept.
pub fn round_trip_display(micros: u64) -> String {
    let millis = micros as f64 / 1000.0;
    let full = format!("{millis}");
    let (int_part, frac_part) = match full.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (full.as_str(), ""),
    };

    let mut significant = if int_part == "0" { 0 } else { int_part.len() };
    let mut out = String::from(int_part);
    let mut frac = String::new();
    for ch in frac_part.chars() {
        if significant >= 3 {
            break;
        }
        if ch != '0' || significant > 0 {
            significant += 1;
        }
        frac.push(ch);
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_value(batch: Value) -> Vec<DecodedEvent> {
        decode_batch(&serde_json::to_vec(&batch).unwrap()).expect("well-formed batch")
    }

    #[test]
    fn encodes_send_message_wire_shape() {
        let bytes = encode_batch(&[ClientEvent::SendMessage {
            id: 1,
            message: "hello".into(),
        }])
        .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!([{"type": "send_message", "value": {"id": 1, "message": "hello"}}])
        );
    }

    #[test]
    fn encodes_disconnect_with_null_value() {
        let bytes = encode_batch(&[ClientEvent::Disconnect]).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!([{"type": "connection_closed", "value": null}]));
    }

    #[test]
    fn encodes_batches_in_order() {
        let bytes = encode_batch(&[
            ClientEvent::SendMessage {
                id: 1,
                message: "a".into(),
            },
            ClientEvent::SendMessage {
                id: 2,
                message: "b".into(),
            },
            ClientEvent::Disconnect,
        ])
        .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let batch = value.as_array().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0]["value"]["id"], 1);
        assert_eq!(batch[1]["value"]["id"], 2);
        assert_eq!(batch[2]["type"], "connection_closed");
    }

    #[test]
    fn decodes_message_fixture() {
        let events = decode_value(json!([
            {"type": "message", "value": {"time": 1700000000, "author": "Bob", "id": 42, "contents": "hi"}}
        ]));
        assert_eq!(events.len(), 1);
        match events[0].as_ref().unwrap() {
            ServerEvent::Message {
                time,
                author,
                id,
                contents,
            } => {
                assert_eq!(timestamp_ms(*time), 1_700_000_000_000);
                assert_eq!(author, "Bob");
                assert_eq!(id, &json!(42));
                assert_eq!(contents, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_diagnostics_and_confirmation() {
        let events = decode_value(json!([
            {"type": "connection_warning", "value": "lossy link"},
            {"type": "connection_error", "value": "kicked"},
            {"type": "connection_closed"},
            {"type": "message_confirmation", "value": {"id": 1, "time_delta": 1500}}
        ]));
        assert_eq!(
            events[0],
            Ok(ServerEvent::ConnectionWarning {
                detail: "lossy link".into()
            })
        );
        assert_eq!(
            events[1],
            Ok(ServerEvent::ConnectionError {
                detail: "kicked".into()
            })
        );
        assert_eq!(events[2], Ok(ServerEvent::ConnectionClosed));
        assert_eq!(
            events[3],
            Ok(ServerEvent::MessageConfirmation {
                id: json!(1),
                time_delta: 1500
            })
        );
    }

    #[test]
    fn connection_closed_accepts_explicit_null_value() {
        let events = decode_value(json!([{"type": "connection_closed", "value": null}]));
        assert_eq!(events[0], Ok(ServerEvent::ConnectionClosed));
    }

    #[test]
    fn unknown_type_is_a_per_element_error() {
        let events = decode_value(json!([
            {"type": "bogus", "value": {"x": 1}},
            {"type": "message", "value": {"time": 1.0, "author": "Bob", "id": 1, "contents": "hi"}}
        ]));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Err(WireError::UnknownEventType("bogus".into())));
        assert!(events[1].is_ok());
    }

    #[test]
    fn bad_payload_for_known_type_is_a_per_element_error() {
        let events = decode_value(json!([
            {"type": "message", "value": {"time": "not a number"}}
        ]));
        match &events[0] {
            Err(WireError::InvalidPayload { kind, .. }) => assert_eq!(kind, "message"),
            other => panic!("unexpected element: {other:?}"),
        }
    }

    #[test]
    fn non_array_input_is_malformed() {
        let err = decode_batch(br#"{"type": "message"}"#).unwrap_err();
        assert!(matches!(err, WireError::MalformedPayload(_)));
        let err = decode_batch(b"[{").unwrap_err();
        assert!(matches!(err, WireError::MalformedPayload(_)));
    }

    #[test]
    fn timestamp_keeps_fractional_seconds() {
        assert_eq!(timestamp_ms(1_700_000_000.5), 1_700_000_000_500);
    }

    #[test]
    fn round_trip_display_truncates_to_three_significant_digits() {
        assert_eq!(round_trip_display(1500), "1.5");
        assert_eq!(round_trip_display(123_456), "123");
        assert_eq!(round_trip_display(12_345), "12.3");
        assert_eq!(round_trip_display(999), "0.999");
        assert_eq!(round_trip_display(1), "0.001");
        assert_eq!(round_trip_display(1000), "1");
        assert_eq!(round_trip_display(0), "0");
        // Integer digits are never dropped, even past three significant.
        assert_eq!(round_trip_display(1_000_000), "1000");
        assert_eq!(round_trip_display(10_500), "10.5");
    }
}
