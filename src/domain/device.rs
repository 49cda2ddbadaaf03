//! Device — identity of a physical unit, provisioned before or alongside its ChargePoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub serial_number: String,
    pub type_code: String,
    /// Master secret at rest, encrypted with `encryption_algorithm`. Used to derive the
    /// MQTT password (`client_id = "{type_code}&{serial}"`, `username = serial`).
    pub encrypted_secret: Vec<u8>,
    pub encryption_algorithm: String,
    pub mqtt_client_id: Option<String>,
    pub active: bool,
}

impl Device {
    pub fn mqtt_client_id(&self) -> String {
        self.mqtt_client_id
            .clone()
            .unwrap_or_else(|| format!("{}&{}", self.type_code, self.serial_number))
    }
}
