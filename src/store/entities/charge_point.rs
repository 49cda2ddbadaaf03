use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charge_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub physical_status: String,
    pub operational_status: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub price_per_kwh: Option<f64>,
    pub nominal_rate_kw: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::evse::Entity")]
    Evse,
    #[sea_orm(has_many = "super::charging_session::Entity")]
    ChargingSession,
}

impl Related<super::evse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evse.def()
    }
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSession.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::ChargePoint {
    fn from(m: Model) -> Self {
        domain::ChargePoint {
            id: m.id,
            vendor: m.vendor,
            model: m.model,
            firmware_version: m.firmware_version,
            physical_status: m.physical_status.parse().unwrap_or_default(),
            operational_status: match m.operational_status.as_str() {
                "Disabled" => domain::OperationalStatus::Disabled,
                "Maintenance" => domain::OperationalStatus::Maintenance,
                _ => domain::OperationalStatus::Enabled,
            },
            last_seen: m.last_seen,
            location: domain::Location {
                latitude: m.latitude,
                longitude: m.longitude,
                address: m.address,
            },
            price_per_kwh: m.price_per_kwh,
            nominal_rate_kw: m.nominal_rate_kw,
        }
    }
}
