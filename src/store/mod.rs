//! Transactional persistence interface (§4.5).
//!
//! `Store` is the seam between the Session/Router/Control API core and the database.
//! The only implementation is [`SeaOrmStore`], but handlers depend on the trait so tests
//! can swap in a fake.

pub mod entities;
pub mod migrator;
pub mod sea_orm_store;

pub use sea_orm_store::SeaOrmStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{
    ChargePoint, ChargingSession, DeviceEvent, EventKind, IdTag, MeterValue, Order,
};
use crate::support::errors::CsmsResult;

/// A half-open time window `[from, to)` used by history/timeline queries.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ChargePointFilter {
    pub operational_status: Option<crate::domain::OperationalStatus>,
    pub only_available: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_charge_points(&self, filter: &ChargePointFilter) -> CsmsResult<Vec<ChargePoint>>;
    async fn get_charge_point(&self, id: &str) -> CsmsResult<Option<ChargePoint>>;
    async fn list_pending_charge_points(&self) -> CsmsResult<Vec<ChargePoint>>;

    /// Insert-or-update on BootNotification; returns the post-upsert row.
    async fn upsert_charge_point_boot(
        &self,
        id: &str,
        vendor: &str,
        model: &str,
        firmware_version: Option<&str>,
    ) -> CsmsResult<ChargePoint>;

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> CsmsResult<()>;
    async fn set_location(&self, id: &str, lat: f64, lng: f64, address: Option<&str>) -> CsmsResult<()>;
    async fn set_pricing(&self, id: &str, price_per_kwh: f64, nominal_rate_kw: Option<f64>) -> CsmsResult<()>;

    async fn get_or_create_evse(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> CsmsResult<crate::domain::Evse>;
    /// Every EVSE registered for `charge_point_id`, used to aggregate per-connector status
    /// into the charge point's own physical status (§4.4: "if all connectors are Faulted").
    async fn list_evses(&self, charge_point_id: &str) -> CsmsResult<Vec<crate::domain::Evse>>;
    async fn update_evse_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        status: crate::domain::PhysicalStatus,
        error_code: Option<&str>,
    ) -> CsmsResult<()>;
    async fn update_charge_point_physical_status(
        &self,
        charge_point_id: &str,
        status: crate::domain::PhysicalStatus,
    ) -> CsmsResult<()>;

    async fn get_id_tag(&self, tag: &str) -> CsmsResult<Option<IdTag>>;

    /// Serializable-or-stronger: checks uniqueness of the active-session-per-evse invariant
    /// and inserts atomically.
    async fn start_charging_session(&self, session: ChargingSession) -> CsmsResult<ChargingSession>;
    async fn active_session_for_evse(
        &self,
        charge_point_id: &str,
        evse_id: i64,
    ) -> CsmsResult<Option<ChargingSession>>;
    async fn active_session_for_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: i64,
    ) -> CsmsResult<Option<ChargingSession>>;
    async fn list_active_sessions(&self, charge_point_id: &str) -> CsmsResult<Vec<ChargingSession>>;

    /// Serializable-or-stronger conditional update: only applies if the session is still active.
    async fn stop_charging_session(
        &self,
        session_id: i64,
        end_time: DateTime<Utc>,
        meter_stop: i64,
    ) -> CsmsResult<ChargingSession>;
    /// Marks sessions stale past `older_than` as `Interrupted` and returns the affected rows
    /// so the caller can log one `SessionStale` event per charge point.
    async fn interrupt_stale_sessions(&self, older_than: DateTime<Utc>) -> CsmsResult<Vec<ChargingSession>>;

    async fn last_meter_value_timestamp(&self, session_id: i64) -> CsmsResult<Option<DateTime<Utc>>>;
    async fn insert_meter_value(&self, meter_value: MeterValue) -> CsmsResult<()>;

    async fn insert_order(&self, order: Order) -> CsmsResult<Order>;

    async fn record_event(
        &self,
        charge_point_id: &str,
        evse_id: Option<i64>,
        kind: EventKind,
        payload: Value,
    ) -> CsmsResult<()>;
    async fn get_history(&self, charge_point_id: &str, window: Window) -> CsmsResult<Vec<DeviceEvent>>;
    async fn get_heartbeat_timeline(
        &self,
        charge_point_id: &str,
        window: Window,
    ) -> CsmsResult<Vec<DeviceEvent>>;
    async fn get_status_timeline(
        &self,
        charge_point_id: &str,
        window: Window,
    ) -> CsmsResult<Vec<DeviceEvent>>;
}
