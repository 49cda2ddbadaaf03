//! EVSE / connector entity — one physical outlet of a charge point.

use serde::{Deserialize, Serialize};

use super::charge_point::PhysicalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorType {
    Type1,
    Type2,
    Ccs1,
    Ccs2,
    Gbt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evse {
    pub id: i64,
    pub charge_point_id: String,
    pub connector_id: u32,
    pub connector_type: ConnectorType,
    pub status: PhysicalStatus,
    pub last_error_code: Option<String>,
}

impl Evse {
    pub fn new(charge_point_id: impl Into<String>, connector_id: u32, connector_type: ConnectorType) -> Self {
        Self {
            id: 0,
            charge_point_id: charge_point_id.into(),
            connector_id,
            connector_type,
            status: PhysicalStatus::Available,
            last_error_code: None,
        }
    }
}
