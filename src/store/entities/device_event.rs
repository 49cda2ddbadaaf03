use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub charge_point_id: String,
    pub evse_id: Option<i64>,
    pub event_kind: String,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::DeviceEvent {
    fn from(m: Model) -> Self {
        domain::DeviceEvent {
            id: m.id,
            charge_point_id: m.charge_point_id,
            evse_id: m.evse_id,
            event_kind: serde_json::from_value(Value::String(m.event_kind))
                .unwrap_or(domain::EventKind::StoreFailure),
            payload: serde_json::from_str(&m.payload).unwrap_or(Value::Null),
            timestamp: m.timestamp,
        }
    }
}
