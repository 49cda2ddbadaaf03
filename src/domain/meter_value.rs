//! MeterValue — one sampled energy reading. Every row has a session; there are no orphans (§8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterValue {
    pub id: i64,
    /// FK to the owning [`ChargingSession`](super::ChargingSession). Never null — a MeterValue
    /// with no resolvable session is dropped by the session handler before it reaches the store.
    pub session_id: i64,
    pub connector_id: u32,
    pub timestamp: DateTime<Utc>,
    pub value: i64,
    pub sampled_value: Value,
}
