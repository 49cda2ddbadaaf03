use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "evses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub charge_point_id: String,
    pub connector_id: i32,
    pub connector_type: String,
    pub status: String,
    pub last_error_code: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charge_point::Entity",
        from = "Column::ChargePointId",
        to = "super::charge_point::Column::Id"
    )]
    ChargePoint,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::Evse {
    fn from(m: Model) -> Self {
        domain::Evse {
            id: m.id,
            charge_point_id: m.charge_point_id,
            connector_id: m.connector_id as u32,
            connector_type: match m.connector_type.as_str() {
                "Type1" => domain::ConnectorType::Type1,
                "Ccs1" => domain::ConnectorType::Ccs1,
                "Ccs2" => domain::ConnectorType::Ccs2,
                "Gbt" => domain::ConnectorType::Gbt,
                _ => domain::ConnectorType::Type2,
            },
            status: m.status.parse().unwrap_or_default(),
            last_error_code: m.last_error_code,
        }
    }
}
