use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meter_values")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub connector_id: i32,
    pub timestamp: DateTime<Utc>,
    pub value: i64,
    #[sea_orm(column_type = "Text")]
    pub sampled_value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_session::Entity",
        from = "Column::SessionId",
        to = "super::charging_session::Column::Id"
    )]
    ChargingSession,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSession.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::MeterValue {
    fn from(m: Model) -> Self {
        domain::MeterValue {
            id: m.id,
            session_id: m.session_id,
            connector_id: m.connector_id as u32,
            timestamp: m.timestamp,
            value: m.value,
            sampled_value: serde_json::from_str::<Value>(&m.sampled_value)
                .unwrap_or(Value::Null),
        }
    }
}
