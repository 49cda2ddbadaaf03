use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub charge_point_id: String,
    pub energy_kwh: f64,
    pub price_per_kwh: f64,
    pub cost: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
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

impl From<Model> for domain::Order {
    fn from(m: Model) -> Self {
        domain::Order {
            id: m.id,
            session_id: m.session_id,
            charge_point_id: m.charge_point_id,
            energy_kwh: m.energy_kwh,
            price_per_kwh: m.price_per_kwh,
            cost: m.cost,
            currency: m.currency,
            created_at: m.created_at,
        }
    }
}
