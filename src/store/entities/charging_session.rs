use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub charge_point_id: String,
    pub evse_id: i64,
    pub connector_id: i32,
    pub transaction_id: i64,
    pub id_tag: String,
    pub user_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub meter_start: i64,
    pub meter_stop: Option<i64>,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charge_point::Entity",
        from = "Column::ChargePointId",
        to = "super::charge_point::Column::Id"
    )]
    ChargePoint,
    #[sea_orm(has_many = "super::meter_value::Entity")]
    MeterValue,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl Related<super::meter_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeterValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::ChargingSession {
    fn from(m: Model) -> Self {
        domain::ChargingSession {
            id: m.id,
            charge_point_id: m.charge_point_id,
            evse_id: m.evse_id,
            connector_id: m.connector_id as u32,
            transaction_id: m.transaction_id,
            id_tag: m.id_tag,
            user_id: m.user_id,
            start_time: m.start_time,
            end_time: m.end_time,
            meter_start: m.meter_start,
            meter_stop: m.meter_stop,
            status: match m.status.as_str() {
                "Completed" => domain::SessionStatus::Completed,
                "Cancelled" => domain::SessionStatus::Cancelled,
                "Interrupted" => domain::SessionStatus::Interrupted,
                _ => domain::SessionStatus::Active,
            },
        }
    }
}
