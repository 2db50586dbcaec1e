//! Inbound frame classification.
//!
//! Every text message read from the socket is decoded here exactly once
//! and sorted into a response, an event, or a malformed frame.
//!
//! | Shape | Classified as |
//! |-------|---------------|
//! | object with numeric `id` | [`Frame::Response`] |
//! | object with numeric `id` and string `method` | [`Frame::Tagged`] |
//! | object with numeric `id`, unreadable body | [`Frame::Invalid`] |
//! | object with `method`, no `id` | [`Frame::Event`] |
//! | anything else that is valid JSON | [`Frame::Malformed`] |
//! | invalid JSON | decode error (fatal for the connection) |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::Result;
use crate::identifiers::RequestId;

use super::{Event, Response};

// ============================================================================
// Frame
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Response to a previously issued command.
    Response(Response),
    /// Carries both an `id` and a `method`.
    ///
    /// Settles the request if the id is pending; otherwise it is an event.
    Tagged(Response, Event),
    /// Has a usable `id` but a body that is not a valid response.
    ///
    /// The pending request with that id is failed rather than left waiting.
    Invalid {
        /// Request the frame answers.
        id: RequestId,
        /// `error.code` when present, else 0.
        code: i64,
        /// Decode failure.
        reason: String,
    },
    /// Unsolicited event.
    Event(Event),
    /// Valid JSON that is neither; carries the reason for logging.
    Malformed(String),
}

impl Frame {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] when the text is not JSON at all.
    /// Well-formed JSON of the wrong shape is reported as
    /// [`Frame::Malformed`] instead.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::classify(value))
    }

    /// Classifies an already parsed JSON value.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        let Value::Object(object) = value else {
            return Self::Malformed("frame is not a JSON object".to_string());
        };

        let has_id = object.get("id").is_some_and(|id| !id.is_null());
        let has_method = object.get("method").is_some_and(Value::is_string);

        if has_id {
            let id = object.get("id").and_then(Value::as_u64).map(RequestId::new);
            let code = object
                .get("error")
                .and_then(|error| error.get("code"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let event = if has_method {
                serde_json::from_value::<Event>(Value::Object(object.clone())).ok()
            } else {
                None
            };

            return match (serde_json::from_value::<Response>(Value::Object(object)), id) {
                (Ok(response), _) => match event {
                    Some(event) => Self::Tagged(response, event),
                    None => Self::Response(response),
                },
                (Err(e), Some(id)) => Self::Invalid {
                    id,
                    code,
                    reason: format!("invalid response frame: {e}"),
                },
                (Err(e), None) => Self::Malformed(format!("invalid response frame: {e}")),
            };
        }

        if has_method {
            return match serde_json::from_value::<Event>(Value::Object(object)) {
                Ok(event) => Self::Event(event),
                Err(e) => Self::Malformed(format!("invalid event frame: {e}")),
            };
        }

        Self::Malformed("frame has neither id nor method".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    use crate::identifiers::RequestId;

    #[test]
    fn test_decode_response() {
        let frame = Frame::decode(r#"{"id":1,"result":{}}"#).expect("decode");
        match frame {
            Frame::Response(response) => assert_eq!(response.id, RequestId::new(1)),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_event() {
        let frame =
            Frame::decode(r#"{"method":"Network.responseReceived","params":{"requestId":"9"}}"#)
                .expect("decode");
        match frame {
            Frame::Event(event) => {
                assert_eq!(event.method, "Network.responseReceived");
                assert_eq!(event.params["requestId"], "9");
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_without_id_or_method_is_malformed() {
        let frame = Frame::decode(r#"{"params":{}}"#).expect("decode");
        assert!(matches!(frame, Frame::Malformed(_)));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(Frame::classify(json!([1, 2])), Frame::Malformed(_)));
        assert!(matches!(Frame::classify(json!("text")), Frame::Malformed(_)));
    }

    #[test]
    fn test_wrong_id_type_is_malformed() {
        let frame = Frame::decode(r#"{"id":"abc","result":{}}"#).expect("decode");
        assert!(matches!(frame, Frame::Malformed(_)));
    }

    #[test]
    fn test_id_and_method_is_tagged() {
        let frame = Frame::decode(
            r#"{"id":77,"method":"Target.receivedMessage","params":{"message":"{}"}}"#,
        )
        .expect("decode");
        match frame {
            Frame::Tagged(response, event) => {
                assert_eq!(response.id, RequestId::new(77));
                assert_eq!(event.method, "Target.receivedMessage");
                assert_eq!(event.params["message"], "{}");
            }
            other => panic!("expected tagged frame, got {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_body_with_id_is_invalid() {
        match Frame::decode(r#"{"id":1,"error":"boom"}"#).expect("decode") {
            Frame::Invalid { id, code, reason } => {
                assert_eq!(id, RequestId::new(1));
                assert_eq!(code, 0);
                assert!(reason.contains("invalid response frame"));
            }
            other => panic!("expected invalid frame, got {other:?}"),
        }

        match Frame::decode(r#"{"id":2,"error":{"code":-32000,"message":7}}"#).expect("decode") {
            Frame::Invalid { id, code, .. } => {
                assert_eq!(id, RequestId::new(2));
                assert_eq!(code, -32000);
            }
            other => panic!("expected invalid frame, got {other:?}"),
        }
    }

    #[test]
    fn test_null_id_with_method_is_event() {
        let frame = Frame::decode(r#"{"id":null,"method":"Page.frameNavigated"}"#).expect("decode");
        assert!(matches!(frame, Frame::Event(_)));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(Frame::decode("{not json").is_err());
    }

    proptest! {
        #[test]
        fn prop_any_id_with_result_is_response(id in any::<u64>(), key in "[a-z]{1,8}") {
            let value = json!({"id": id, "result": {key: true}});
            match Frame::classify(value) {
                Frame::Response(response) => prop_assert_eq!(response.id.get(), id),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn prop_method_without_id_is_event(domain in "[A-Z][a-zA-Z]{0,10}", name in "[a-z][a-zA-Z]{0,12}") {
            let method = format!("{domain}.{name}");
            let value = json!({"method": method.clone(), "params": {}});
            match Frame::classify(value) {
                Frame::Event(event) => prop_assert_eq!(event.method, method),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
