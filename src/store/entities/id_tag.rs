use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "id_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag: String,
    pub status: String,
    pub parent_id: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::IdTag {
    fn from(m: Model) -> Self {
        domain::IdTag {
            tag: m.tag,
            status: match m.status.as_str() {
                "Blocked" => domain::IdTagStatus::Blocked,
                "Expired" => domain::IdTagStatus::Expired,
                "ConcurrentTx" => domain::IdTagStatus::ConcurrentTx,
                "Invalid" => domain::IdTagStatus::Invalid,
                _ => domain::IdTagStatus::Accepted,
            },
            parent_id: m.parent_id,
            expiry: m.expiry,
        }
    }
}
