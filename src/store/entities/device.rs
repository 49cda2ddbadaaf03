use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub type_code: String,
    pub encrypted_secret: Vec<u8>,
    pub encryption_algorithm: String,
    pub mqtt_client_id: Option<String>,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::Device {
    fn from(m: Model) -> Self {
        domain::Device {
            id: m.id,
            serial_number: m.serial_number,
            type_code: m.type_code,
            encrypted_secret: m.encrypted_secret,
            encryption_algorithm: m.encryption_algorithm,
            mqtt_client_id: m.mqtt_client_id,
            active: m.active,
        }
    }
}
