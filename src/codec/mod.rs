//! Wire codec: OCPP-J framing plus per-action payload validation (§4.2).

pub mod action;
pub mod frame;

pub use action::{validate_inbound_payload, Action};
pub use frame::{OcppFrame, OcppFrameError};

use crate::support::errors::CodecError;

/// A CALL frame that has passed action-name resolution and payload validation.
#[derive(Debug, Clone)]
pub struct DecodedCall {
    pub unique_id: String,
    pub action: Action,
    pub payload: serde_json::Value,
}

/// Parses and validates raw inbound text as a charge-point-initiated CALL.
/// Used by the Router on every inbound message before it reaches a Session.
pub fn decode_inbound_call(text: &str) -> Result<DecodedCall, (Option<String>, CodecError)> {
    let frame = OcppFrame::parse(text).map_err(|e| (None, CodecError::Decode(e.to_string())))?;

    let (unique_id, action_name, payload) = match frame {
        OcppFrame::Call { unique_id, action, payload } => (unique_id, action, payload),
        other => {
            return Err((
                Some(other.unique_id().to_string()),
                CodecError::Decode("expected a CALL from the charge point".to_string()),
            ))
        }
    };

    let action: Action = action_name
        .parse()
        .map_err(|e: CodecError| (Some(unique_id.clone()), e))?;

    if !action.is_charge_point_initiated() {
        return Err((
            Some(unique_id),
            CodecError::Validation {
                code: "SecurityError",
                description: format!("'{}' may not be sent by a charge point", action),
            },
        ));
    }

    validate_inbound_payload(action, &payload).map_err(|e| (Some(unique_id.clone()), e))?;

    Ok(DecodedCall { unique_id, action, payload })
}
