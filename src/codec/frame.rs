//! OCPP-J message framing (§4.2, §6).
//!
//! WebSocket carries the standard bracketed tuple:
//! - CALL       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - CALLRESULT `[3, "<uniqueId>", {<payload>}]`
//! - CALLERROR  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! MQTT carries the same three message kinds as JSON objects instead (§6):
//! - CALL       `{"action": "...", "messageId": "...", "payload": {...}}`
//! - CALLRESULT `{"messageId": "...", "payload": {...}}`
//! - CALLERROR  `{"messageId": "...", "errorCode": "...", "errorDescription": "...", "errorDetails": {...}}`

use serde_json::Value;
use std::fmt;

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

/// Maximum length of a messageId, per §4.2.
pub const MAX_MESSAGE_ID_LEN: usize = 36;

/// A parsed OCPP-J frame, before action-specific payload validation.
#[derive(Debug, Clone)]
pub enum OcppFrame {
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        unique_id: String,
        payload: Value,
    },
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    /// Parse raw JSON text into a frame. Accepts JSON UTF-8 text only; callers must reject
    /// binary payloads before this point (the WebSocket/MQTT transports only forward text).
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let arr: Vec<Value> =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;

        if arr.is_empty() {
            return Err(OcppFrameError::EmptyArray);
        }

        let msg_type = arr[0].as_u64().ok_or(OcppFrameError::InvalidMessageType)?;

        let frame = match msg_type {
            MSG_TYPE_CALL => Self::parse_call(&arr)?,
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(&arr)?,
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(&arr)?,
            other => return Err(OcppFrameError::UnknownMessageType(other)),
        };

        if frame.unique_id().len() > MAX_MESSAGE_ID_LEN {
            return Err(OcppFrameError::MessageIdTooLong(frame.unique_id().len()));
        }

        Ok(frame)
    }

    fn parse_call(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 4 {
            return Err(OcppFrameError::MissingFields { expected: 4, got: arr.len() });
        }
        let unique_id = arr[1]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))?
            .to_string();
        let action = arr[2]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("action must be a string"))?
            .to_string();
        let payload = arr[3].clone();
        Ok(Self::Call { unique_id, action, payload })
    }

    fn parse_call_result(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 3 {
            return Err(OcppFrameError::MissingFields { expected: 3, got: arr.len() });
        }
        let unique_id = arr[1]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))?
            .to_string();
        let payload = arr.get(2).cloned().unwrap_or(Value::Object(Default::default()));
        Ok(Self::CallResult { unique_id, payload })
    }

    fn parse_call_error(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 4 {
            return Err(OcppFrameError::MissingFields { expected: 4, got: arr.len() });
        }
        let unique_id = arr[1]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))?
            .to_string();
        let error_code = arr[2].as_str().unwrap_or("InternalError").to_string();
        let error_description = arr.get(3).and_then(|v| v.as_str()).unwrap_or("").to_string();
        let error_details = arr.get(4).cloned().unwrap_or(Value::Object(Default::default()));
        Ok(Self::CallError { unique_id, error_code, error_description, error_details })
    }

    /// Parse an MQTT message body (JSON object encoding) into a frame.
    pub fn parse_mqtt(text: &str) -> Result<Self, OcppFrameError> {
        let obj: Value =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;

        let unique_id = obj
            .get("messageId")
            .and_then(|v| v.as_str())
            .ok_or(OcppFrameError::FieldTypeMismatch("messageId must be a string"))?
            .to_string();

        let frame = if let Some(action) = obj.get("action").and_then(|v| v.as_str()) {
            Self::Call {
                unique_id,
                action: action.to_string(),
                payload: obj.get("payload").cloned().unwrap_or(Value::Object(Default::default())),
            }
        } else if let Some(error_code) = obj.get("errorCode").and_then(|v| v.as_str()) {
            Self::CallError {
                unique_id,
                error_code: error_code.to_string(),
                error_description: obj
                    .get("errorDescription")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                error_details: obj.get("errorDetails").cloned().unwrap_or(Value::Object(Default::default())),
            }
        } else {
            Self::CallResult {
                unique_id,
                payload: obj.get("payload").cloned().unwrap_or(Value::Object(Default::default())),
            }
        };

        if frame.unique_id().len() > MAX_MESSAGE_ID_LEN {
            return Err(OcppFrameError::MessageIdTooLong(frame.unique_id().len()));
        }

        Ok(frame)
    }

    /// Serialize this frame to the MQTT JSON-object body.
    pub fn serialize_mqtt(&self) -> String {
        let obj = match self {
            Self::Call { unique_id, action, payload } => serde_json::json!({
                "messageId": unique_id,
                "action": action,
                "payload": payload,
            }),
            Self::CallResult { unique_id, payload } => serde_json::json!({
                "messageId": unique_id,
                "payload": payload,
            }),
            Self::CallError { unique_id, error_code, error_description, error_details } => {
                serde_json::json!({
                    "messageId": unique_id,
                    "errorCode": error_code,
                    "errorDescription": error_description,
                    "errorDetails": error_details,
                })
            }
        };
        serde_json::to_string(&obj).unwrap()
    }

    /// Serialize this frame to a JSON string (WebSocket bracketed-tuple encoding).
    pub fn serialize(&self) -> String {
        let arr: Value = match self {
            Self::Call { unique_id, action, payload } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL.into()),
                Value::String(unique_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),
            Self::CallResult { unique_id, payload } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_RESULT.into()),
                Value::String(unique_id.clone()),
                payload.clone(),
            ]),
            Self::CallError { unique_id, error_code, error_description, error_details } => {
                Value::Array(vec![
                    Value::Number(MSG_TYPE_CALL_ERROR.into()),
                    Value::String(unique_id.clone()),
                    Value::String(error_code.clone()),
                    Value::String(error_description.clone()),
                    error_details.clone(),
                ])
            }
        };
        serde_json::to_string(&arr).unwrap()
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }

    pub fn error_response(
        unique_id: impl Into<String>,
        error_code: impl Into<String>,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: error_code.into(),
            error_description: error_description.into(),
            error_details: Value::Object(Default::default()),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }
}

#[derive(Debug, Clone)]
pub enum OcppFrameError {
    InvalidJson(String),
    EmptyArray,
    InvalidMessageType,
    UnknownMessageType(u64),
    MessageIdTooLong(usize),
    MissingFields { expected: usize, got: usize },
    FieldTypeMismatch(&'static str),
}

impl fmt::Display for OcppFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "invalid JSON: {}", msg),
            Self::EmptyArray => write!(f, "empty OCPP message array"),
            Self::InvalidMessageType => write!(f, "message type is not a number"),
            Self::UnknownMessageType(t) => write!(f, "unknown message type: {}", t),
            Self::MessageIdTooLong(n) => write!(f, "messageId too long: {} chars", n),
            Self::MissingFields { expected, got } => {
                write!(f, "expected at least {} fields, got {}", expected, got)
            }
            Self::FieldTypeMismatch(msg) => write!(f, "field type mismatch: {}", msg),
        }
    }
}

impl std::error::Error for OcppFrameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call() {
        let text = r#"[2,"abc123","BootNotification",{"chargePointVendor":"V","chargePointModel":"M"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::Call { unique_id, action, payload } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "V");
            }
            _ => panic!("expected Call"),
        }
    }

    #[test]
    fn rejects_overlong_message_id() {
        let long_id = "x".repeat(37);
        let text = format!(r#"[2,"{}","Heartbeat",{{}}]"#, long_id);
        assert!(matches!(
            OcppFrame::parse(&text),
            Err(OcppFrameError::MessageIdTooLong(_))
        ));
    }

    #[test]
    fn roundtrip_call_result() {
        let frame = OcppFrame::CallResult {
            unique_id: "id2".into(),
            payload: serde_json::json!({"currentTime": "2024-01-01T00:00:00Z"}),
        };
        let json = frame.serialize();
        let parsed = OcppFrame::parse(&json).unwrap();
        assert_eq!(parsed.unique_id(), "id2");
    }

    #[test]
    fn roundtrip_call_error() {
        let frame = OcppFrame::error_response("id3", "GenericError", "boom");
        let json = frame.serialize();
        let parsed = OcppFrame::parse(&json).unwrap();
        assert_eq!(parsed.unique_id(), "id3");
    }

    #[test]
    fn parse_mqtt_call() {
        let text = r#"{"action":"Heartbeat","messageId":"m1","payload":{}}"#;
        let frame = OcppFrame::parse_mqtt(text).unwrap();
        assert!(frame.is_call());
        assert_eq!(frame.unique_id(), "m1");
    }

    #[test]
    fn roundtrip_mqtt_call_result() {
        let frame = OcppFrame::CallResult {
            unique_id: "m2".into(),
            payload: serde_json::json!({"currentTime": "2024-01-01T00:00:00Z"}),
        };
        let body = frame.serialize_mqtt();
        let parsed = OcppFrame::parse_mqtt(&body).unwrap();
        assert_eq!(parsed.unique_id(), "m2");
    }
}
