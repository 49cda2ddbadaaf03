//! OCPP 1.6J action set (§4.2): the names the Router and Session accept, and the
//! structural validation that maps malformed payloads onto CALLERROR codes.

use serde_json::Value;
use std::fmt;

use crate::support::errors::CodecError;

/// Every action this CSMS recognizes, in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Charge-point-initiated
    BootNotification,
    Heartbeat,
    StatusNotification,
    Authorize,
    StartTransaction,
    StopTransaction,
    MeterValues,
    DataTransfer,
    FirmwareStatusNotification,
    DiagnosticsStatusNotification,
    // CSMS-initiated
    RemoteStartTransaction,
    RemoteStopTransaction,
    Reset,
    ChangeAvailability,
    ChangeConfiguration,
    GetConfiguration,
    ClearCache,
    TriggerMessage,
    UnlockConnector,
    GetDiagnostics,
    UpdateFirmware,
    ReserveNow,
    CancelReservation,
    SendLocalList,
    GetLocalListVersion,
    SetChargingProfile,
    ClearChargingProfile,
    GetCompositeSchedule,
}

impl Action {
    /// Whether the charge point is the originator of this action (inbound CALL).
    pub fn is_charge_point_initiated(self) -> bool {
        matches!(
            self,
            Self::BootNotification
                | Self::Heartbeat
                | Self::StatusNotification
                | Self::Authorize
                | Self::StartTransaction
                | Self::StopTransaction
                | Self::MeterValues
                | Self::DataTransfer
                | Self::FirmwareStatusNotification
                | Self::DiagnosticsStatusNotification
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BootNotification => "BootNotification",
            Self::Heartbeat => "Heartbeat",
            Self::StatusNotification => "StatusNotification",
            Self::Authorize => "Authorize",
            Self::StartTransaction => "StartTransaction",
            Self::StopTransaction => "StopTransaction",
            Self::MeterValues => "MeterValues",
            Self::DataTransfer => "DataTransfer",
            Self::FirmwareStatusNotification => "FirmwareStatusNotification",
            Self::DiagnosticsStatusNotification => "DiagnosticsStatusNotification",
            Self::RemoteStartTransaction => "RemoteStartTransaction",
            Self::RemoteStopTransaction => "RemoteStopTransaction",
            Self::Reset => "Reset",
            Self::ChangeAvailability => "ChangeAvailability",
            Self::ChangeConfiguration => "ChangeConfiguration",
            Self::GetConfiguration => "GetConfiguration",
            Self::ClearCache => "ClearCache",
            Self::TriggerMessage => "TriggerMessage",
            Self::UnlockConnector => "UnlockConnector",
            Self::GetDiagnostics => "GetDiagnostics",
            Self::UpdateFirmware => "UpdateFirmware",
            Self::ReserveNow => "ReserveNow",
            Self::CancelReservation => "CancelReservation",
            Self::SendLocalList => "SendLocalList",
            Self::GetLocalListVersion => "GetLocalListVersion",
            Self::SetChargingProfile => "SetChargingProfile",
            Self::ClearChargingProfile => "ClearChargingProfile",
            Self::GetCompositeSchedule => "GetCompositeSchedule",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BootNotification" => Self::BootNotification,
            "Heartbeat" => Self::Heartbeat,
            "StatusNotification" => Self::StatusNotification,
            "Authorize" => Self::Authorize,
            "StartTransaction" => Self::StartTransaction,
            "StopTransaction" => Self::StopTransaction,
            "MeterValues" => Self::MeterValues,
            "DataTransfer" => Self::DataTransfer,
            "FirmwareStatusNotification" => Self::FirmwareStatusNotification,
            "DiagnosticsStatusNotification" => Self::DiagnosticsStatusNotification,
            "RemoteStartTransaction" => Self::RemoteStartTransaction,
            "RemoteStopTransaction" => Self::RemoteStopTransaction,
            "Reset" => Self::Reset,
            "ChangeAvailability" => Self::ChangeAvailability,
            "ChangeConfiguration" => Self::ChangeConfiguration,
            "GetConfiguration" => Self::GetConfiguration,
            "ClearCache" => Self::ClearCache,
            "TriggerMessage" => Self::TriggerMessage,
            "UnlockConnector" => Self::UnlockConnector,
            "GetDiagnostics" => Self::GetDiagnostics,
            "UpdateFirmware" => Self::UpdateFirmware,
            "ReserveNow" => Self::ReserveNow,
            "CancelReservation" => Self::CancelReservation,
            "SendLocalList" => Self::SendLocalList,
            "GetLocalListVersion" => Self::GetLocalListVersion,
            "SetChargingProfile" => Self::SetChargingProfile,
            "ClearChargingProfile" => Self::ClearChargingProfile,
            "GetCompositeSchedule" => Self::GetCompositeSchedule,
            other => {
                return Err(CodecError::Validation {
                    code: "NotImplemented",
                    description: format!("unrecognized action '{}'", other),
                })
            }
        })
    }
}

/// Structurally validates a CALL payload against its action's rust-ocpp request type.
/// Field-level type mismatches, missing required fields, and bad enum values all surface
/// here as `TypeConstraintViolation`/`FormationViolation`, matching §4.2's CALLERROR table.
/// A handful of actions carry additional semantic checks beyond serde's structural ones.
pub fn validate_inbound_payload(action: Action, payload: &Value) -> Result<(), CodecError> {
    use rust_ocpp::v1_6::messages::{
        authorize::AuthorizeRequest, boot_notification::BootNotificationRequest,
        data_transfer::DataTransferRequest,
        diagnostics_status_notification::DiagnosticsStatusNotificationRequest,
        firmware_status_notification::FirmwareStatusNotificationRequest,
        meter_values::MeterValuesRequest, start_transaction::StartTransactionRequest,
        status_notification::StatusNotificationRequest, stop_transaction::StopTransactionRequest,
    };

    macro_rules! structural {
        ($ty:ty) => {
            serde_json::from_value::<$ty>(payload.clone())
                .map(|_| ())
                .map_err(|e| CodecError::Validation {
                    code: "TypeConstraintViolation",
                    description: e.to_string(),
                })
        };
    }

    match action {
        Action::BootNotification => structural!(BootNotificationRequest),
        Action::Heartbeat => Ok(()), // no payload fields to validate
        Action::StatusNotification => {
            let req: StatusNotificationRequest =
                serde_json::from_value(payload.clone()).map_err(|e| CodecError::Validation {
                    code: "TypeConstraintViolation",
                    description: e.to_string(),
                })?;
            if (req.connector_id as i64) < 0 {
                return Err(CodecError::Validation {
                    code: "PropertyConstraintViolation",
                    description: "connectorId must be >= 0".to_string(),
                });
            }
            Ok(())
        }
        Action::Authorize => structural!(AuthorizeRequest),
        Action::StartTransaction => {
            let req: StartTransactionRequest =
                serde_json::from_value(payload.clone()).map_err(|e| CodecError::Validation {
                    code: "TypeConstraintViolation",
                    description: e.to_string(),
                })?;
            if (req.meter_start as i64) < 0 {
                return Err(CodecError::Validation {
                    code: "PropertyConstraintViolation",
                    description: "meterStart must be >= 0".to_string(),
                });
            }
            Ok(())
        }
        Action::StopTransaction => {
            let req: StopTransactionRequest =
                serde_json::from_value(payload.clone()).map_err(|e| CodecError::Validation {
                    code: "TypeConstraintViolation",
                    description: e.to_string(),
                })?;
            if (req.meter_stop as i64) < 0 {
                return Err(CodecError::Validation {
                    code: "PropertyConstraintViolation",
                    description: "meterStop must be >= 0".to_string(),
                });
            }
            Ok(())
        }
        Action::MeterValues => structural!(MeterValuesRequest),
        Action::DataTransfer => structural!(DataTransferRequest),
        Action::FirmwareStatusNotification => structural!(FirmwareStatusNotificationRequest),
        Action::DiagnosticsStatusNotification => structural!(DiagnosticsStatusNotificationRequest),
        _ => Err(CodecError::Validation {
            code: "NotSupported",
            description: format!("'{}' is not charge-point-initiated", action),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_known_action() {
        assert_eq!(Action::from_str("Heartbeat").unwrap(), Action::Heartbeat);
    }

    #[test]
    fn rejects_unknown_action() {
        let err = Action::from_str("FooBar").unwrap_err();
        assert_eq!(err.call_error_code(), "NotImplemented");
    }

    #[test]
    fn rejects_negative_meter_start() {
        let payload = serde_json::json!({
            "connectorId": 1,
            "idTag": "ABC",
            "meterStart": -5,
            "timestamp": "2024-01-01T00:00:00Z",
        });
        let err = validate_inbound_payload(Action::StartTransaction, &payload).unwrap_err();
        assert_eq!(err.call_error_code(), "PropertyConstraintViolation");
    }

    #[test]
    fn accepts_well_formed_boot_notification() {
        let payload = serde_json::json!({
            "chargePointVendor": "Acme",
            "chargePointModel": "X1",
        });
        assert!(validate_inbound_payload(Action::BootNotification, &payload).is_ok());
    }
}
