//! ChargingSession — one active or historical transaction (§3, §4.4 StartTransaction/StopTransaction).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
    Interrupted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingSession {
    pub id: i64,
    pub charge_point_id: String,
    pub evse_id: i64,
    pub connector_id: u32,
    pub transaction_id: i64,
    pub id_tag: String,
    pub user_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub meter_start: i64,
    pub meter_stop: Option<i64>,
    pub status: SessionStatus,
}

impl ChargingSession {
    pub fn new(
        charge_point_id: impl Into<String>,
        evse_id: i64,
        connector_id: u32,
        transaction_id: i64,
        id_tag: impl Into<String>,
        meter_start: i64,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            charge_point_id: charge_point_id.into(),
            evse_id,
            connector_id,
            transaction_id,
            id_tag: id_tag.into(),
            user_id: None,
            start_time,
            end_time: None,
            meter_start,
            meter_stop: None,
            status: SessionStatus::Active,
        }
    }

    /// Energy delivered in kWh; `None` until the session is stopped.
    pub fn energy_kwh(&self) -> Option<f64> {
        self.meter_stop.map(|stop| (stop - self.meter_start) as f64 / 1000.0)
    }
}
