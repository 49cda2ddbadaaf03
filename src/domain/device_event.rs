//! DeviceEvent — append-only audit log of OCPP actions and state transitions (§3, §7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    BootAccepted,
    BootRejected,
    Heartbeat,
    StatusNotification,
    Authorize,
    StartTransaction,
    StopTransaction,
    MeterValues,
    DecodeFailure,
    ValidationFailure,
    OrphanMeterValue,
    ClockSkew,
    StoreFailure,
    EncodeFailure,
    CallTimeout,
    DuplicateDelivery,
    Connected,
    Disconnected,
    HeartbeatWatchdogExpired,
    SessionStale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub id: i64,
    pub charge_point_id: String,
    pub evse_id: Option<i64>,
    pub event_kind: EventKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}
