//! Response/request DTOs for the REST control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChargePoint, DeviceEvent, Location, OperationalStatus, PhysicalStatus};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Serialize)]
pub struct ChargePointDto {
    pub id: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub physical_status: PhysicalStatus,
    pub operational_status: OperationalStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub location: Location,
    pub price_per_kwh: Option<f64>,
    pub nominal_rate_kw: Option<f64>,
    pub is_available: bool,
    pub is_configured: bool,
}

impl From<ChargePoint> for ChargePointDto {
    fn from(cp: ChargePoint) -> Self {
        Self {
            is_available: cp.is_available(),
            is_configured: cp.is_configured(),
            id: cp.id,
            vendor: cp.vendor,
            model: cp.model,
            firmware_version: cp.firmware_version,
            physical_status: cp.physical_status,
            operational_status: cp.operational_status,
            last_seen: cp.last_seen,
            location: cp.location,
            price_per_kwh: cp.price_per_kwh,
            nominal_rate_kw: cp.nominal_rate_kw,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceEventDto {
    pub evse_id: Option<i64>,
    pub event_kind: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl From<DeviceEvent> for DeviceEventDto {
    fn from(e: DeviceEvent) -> Self {
        Self {
            evse_id: e.evse_id,
            event_kind: format!("{:?}", e.event_kind),
            payload: e.payload,
            timestamp: e.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateChargerRequest {
    pub id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub price_per_kwh: Option<f64>,
    pub nominal_rate_kw: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteStartRequest {
    pub charge_point_id: String,
    pub id_tag: String,
    pub connector_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteStopRequest {
    pub charge_point_id: String,
    pub transaction_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeAvailabilityRequest {
    pub charge_point_id: String,
    pub connector_id: u32,
    pub operative: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub charge_point_id: String,
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct TriggerMessageRequest {
    pub charge_point_id: String,
    pub requested_message: String,
    pub connector_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetDiagnosticsRequest {
    pub charge_point_id: String,
    pub location: String,
    pub retries: Option<i32>,
    pub retry_interval: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockConnectorRequest {
    pub charge_point_id: String,
    pub connector_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFirmwareRequest {
    pub charge_point_id: String,
    pub location: String,
    pub retrieve_date: DateTime<Utc>,
    pub retries: Option<i32>,
    pub retry_interval: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub charge_point_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub charge_point_id: String,
    pub price_per_kwh: f64,
    pub nominal_rate_kw: Option<f64>,
}
