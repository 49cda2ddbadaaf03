//! Control API (§4.7): the operator-facing surface over `Router`/`Store`, version-agnostic
//! in name even though only v1.6 is wired up today. Grounded on the teacher's
//! `CommandDispatcher` (a facade that builds a typed `rust_ocpp` request and calls through
//! a single transport-agnostic sender) — generalized to go through `Router::dispatch`
//! instead of resolving an OCPP version per charger, since this CSMS speaks only 1.6J.
//!
//! Every remote-call operation here rejects up front with `ChargerOffline` when the
//! session isn't accepting calls, the same early check the teacher's dispatcher leaves to
//! `CommandSender::send_command`'s session lookup — done here instead so a clear error
//! reaches the operator before a call is ever queued.

use chrono::{DateTime, Utc};
use rust_ocpp::v1_6::messages::change_availability::{ChangeAvailabilityRequest, ChangeAvailabilityResponse};
use rust_ocpp::v1_6::messages::get_diagnostics::{GetDiagnosticsRequest, GetDiagnosticsResponse};
use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::messages::trigger_message::{TriggerMessageRequest, TriggerMessageResponse};
use rust_ocpp::v1_6::messages::unlock_connector::{UnlockConnectorRequest, UnlockConnectorResponse};
use rust_ocpp::v1_6::messages::update_firmware::UpdateFirmwareRequest;
use rust_ocpp::v1_6::types::{AvailabilityType, MessageTrigger, ResetRequestStatus};
use std::sync::Arc;
use tracing::info;

use crate::cache::Cache;
use crate::codec::Action;
use crate::domain::{ChargePoint, DeviceEvent};
use crate::router::Router;
use crate::store::{ChargePointFilter, Store, Window};
use crate::support::errors::{CsmsError, CsmsResult};

/// Operator-controlled availability target for [`ControlApi::change_availability`].
#[derive(Debug, Clone, Copy)]
pub enum Availability {
    Operative,
    Inoperative,
}

impl From<Availability> for AvailabilityType {
    fn from(value: Availability) -> Self {
        match value {
            Availability::Operative => AvailabilityType::Operative,
            Availability::Inoperative => AvailabilityType::Inoperative,
        }
    }
}

/// Reset scope requested by the operator.
#[derive(Debug, Clone, Copy)]
pub enum ResetKind {
    Soft,
    Hard,
}

impl From<ResetKind> for ResetRequestStatus {
    fn from(value: ResetKind) -> Self {
        match value {
            ResetKind::Soft => ResetRequestStatus::Soft,
            ResetKind::Hard => ResetRequestStatus::Hard,
        }
    }
}

/// Which notification a `TriggerMessage` asks the charge point to re-send.
#[derive(Debug, Clone, Copy)]
pub enum TriggerTarget {
    BootNotification,
    DiagnosticsStatusNotification,
    FirmwareStatusNotification,
    Heartbeat,
    MeterValues,
    StatusNotification,
}

impl From<TriggerTarget> for MessageTrigger {
    fn from(value: TriggerTarget) -> Self {
        match value {
            TriggerTarget::BootNotification => MessageTrigger::BootNotification,
            TriggerTarget::DiagnosticsStatusNotification => MessageTrigger::DiagnosticsStatusNotification,
            TriggerTarget::FirmwareStatusNotification => MessageTrigger::FirmwareStatusNotification,
            TriggerTarget::Heartbeat => MessageTrigger::Heartbeat,
            TriggerTarget::MeterValues => MessageTrigger::MeterValues,
            TriggerTarget::StatusNotification => MessageTrigger::StatusNotification,
        }
    }
}

/// Operator-facing facade over the Router/Store/Cache. This is what `crate::api`'s HTTP
/// handlers call into; it carries no HTTP-specific types so it can be driven directly by
/// tests or another transport (CLI, gRPC) without change.
pub struct ControlApi {
    router: Arc<Router>,
    store: Arc<dyn Store>,
    cache: Arc<Cache>,
}

impl ControlApi {
    pub fn new(router: Arc<Router>, store: Arc<dyn Store>, cache: Arc<Cache>) -> Self {
        Self { router, store, cache }
    }

    // ── Read-only fleet queries ─────────────────────────────────────────

    pub async fn list_charge_points(&self, filter: &ChargePointFilter) -> CsmsResult<Vec<ChargePoint>> {
        self.store.list_charge_points(filter).await
    }

    pub async fn list_pending_charge_points(&self) -> CsmsResult<Vec<ChargePoint>> {
        self.store.list_pending_charge_points().await
    }

    pub async fn get_charge_point(&self, charge_point_id: &str) -> CsmsResult<Option<ChargePoint>> {
        self.store.get_charge_point(charge_point_id).await
    }

    pub async fn get_history(&self, charge_point_id: &str, window: Window) -> CsmsResult<Vec<DeviceEvent>> {
        self.store.get_history(charge_point_id, window).await
    }

    pub async fn get_heartbeat_timeline(&self, charge_point_id: &str, window: Window) -> CsmsResult<Vec<DeviceEvent>> {
        self.store.get_heartbeat_timeline(charge_point_id, window).await
    }

    pub async fn get_status_timeline(&self, charge_point_id: &str, window: Window) -> CsmsResult<Vec<DeviceEvent>> {
        self.store.get_status_timeline(charge_point_id, window).await
    }

    /// Live status, preferring the in-memory cache (populated on connect/status notification,
    /// rebuilt from the store on cold start) over a fresh store read.
    pub fn live_status(&self, charge_point_id: &str) -> Option<crate::domain::PhysicalStatus> {
        self.cache.status(charge_point_id)
    }

    // ── Local mutations (no OCPP call) ──────────────────────────────────

    pub async fn update_location(
        &self,
        charge_point_id: &str,
        latitude: f64,
        longitude: f64,
        address: Option<&str>,
    ) -> CsmsResult<()> {
        self.store.set_location(charge_point_id, latitude, longitude, address).await
    }

    pub async fn update_pricing(
        &self,
        charge_point_id: &str,
        price_per_kwh: f64,
        nominal_rate_kw: Option<f64>,
    ) -> CsmsResult<()> {
        self.store.set_pricing(charge_point_id, price_per_kwh, nominal_rate_kw).await
    }

    // ── Remote OCPP calls ────────────────────────────────────────────────

    fn require_session(&self, charge_point_id: &str) -> CsmsResult<()> {
        match self.router.session(charge_point_id) {
            Some(_) => Ok(()),
            None => Err(CsmsError::UnknownCharger(charge_point_id.to_string())),
        }
    }

    pub async fn remote_start_transaction(
        &self,
        charge_point_id: &str,
        id_tag: &str,
        connector_id: Option<u32>,
    ) -> CsmsResult<RemoteStartTransactionResponse> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, id_tag, ?connector_id, "RemoteStartTransaction");
        let request = RemoteStartTransactionRequest {
            connector_id,
            id_tag: id_tag.to_string(),
            charging_profile: None,
        };
        self.call(charge_point_id, Action::RemoteStartTransaction, request).await
    }

    /// With `transaction_id: None`, resolves the charge point's one active transaction;
    /// fails if there are zero or more than one (§4.7: ambiguous without an explicit id).
    pub async fn remote_stop_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: Option<i32>,
    ) -> CsmsResult<RemoteStopTransactionResponse> {
        self.require_session(charge_point_id)?;
        let transaction_id = match transaction_id {
            Some(id) => id,
            None => {
                let mut active = self.store.list_active_sessions(charge_point_id).await?;
                match active.len() {
                    1 => active.remove(0).transaction_id as i32,
                    0 => return Err(CsmsError::State(format!("{charge_point_id} has no active transaction"))),
                    n => return Err(CsmsError::State(format!("{charge_point_id} has {n} active transactions, specify one"))),
                }
            }
        };
        info!(charge_point_id, transaction_id, "RemoteStopTransaction");
        let request = RemoteStopTransactionRequest { transaction_id };
        self.call(charge_point_id, Action::RemoteStopTransaction, request).await
    }

    pub async fn change_availability(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        availability: Availability,
    ) -> CsmsResult<ChangeAvailabilityResponse> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, connector_id, ?availability, "ChangeAvailability");
        let request = ChangeAvailabilityRequest { connector_id, kind: availability.into() };
        self.call(charge_point_id, Action::ChangeAvailability, request).await
    }

    pub async fn reset(&self, charge_point_id: &str, kind: ResetKind) -> CsmsResult<ResetResponse> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, ?kind, "Reset");
        let request = ResetRequest { kind: kind.into() };
        self.call(charge_point_id, Action::Reset, request).await
    }

    pub async fn trigger_message(
        &self,
        charge_point_id: &str,
        requested_message: TriggerTarget,
        connector_id: Option<u32>,
    ) -> CsmsResult<TriggerMessageResponse> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, ?requested_message, ?connector_id, "TriggerMessage");
        let request = TriggerMessageRequest { requested_message: requested_message.into(), connector_id };
        self.call(charge_point_id, Action::TriggerMessage, request).await
    }

    pub async fn get_diagnostics(
        &self,
        charge_point_id: &str,
        location: &str,
        retries: Option<i32>,
        retry_interval: Option<i32>,
        start_time: Option<DateTime<Utc>>,
        stop_time: Option<DateTime<Utc>>,
    ) -> CsmsResult<GetDiagnosticsResponse> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, location, "GetDiagnostics");
        let request = GetDiagnosticsRequest {
            location: location.to_string(),
            retries,
            retry_interval,
            start_time,
            stop_time,
        };
        self.call(charge_point_id, Action::GetDiagnostics, request).await
    }

    pub async fn unlock_connector(&self, charge_point_id: &str, connector_id: u32) -> CsmsResult<UnlockConnectorResponse> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, connector_id, "UnlockConnector");
        let request = UnlockConnectorRequest { connector_id };
        self.call(charge_point_id, Action::UnlockConnector, request).await
    }

    /// v1.6's `UpdateFirmwareResponse` carries no status field — a successful round trip
    /// through the queue is the only acknowledgement the protocol offers.
    pub async fn update_firmware(
        &self,
        charge_point_id: &str,
        location: &str,
        retrieve_date: DateTime<Utc>,
        retries: Option<i32>,
        retry_interval: Option<i32>,
    ) -> CsmsResult<()> {
        self.require_session(charge_point_id)?;
        info!(charge_point_id, location, %retrieve_date, "UpdateFirmware");
        let request = UpdateFirmwareRequest {
            location: location.to_string(),
            retries,
            retrieve_date,
            retry_interval,
        };
        let payload = serde_json::to_value(&request).map_err(|e| CsmsError::Decode(e.to_string()))?;
        self.router.dispatch(charge_point_id, Action::UpdateFirmware, payload).await?;
        Ok(())
    }

    async fn call<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        charge_point_id: &str,
        action: Action,
        request: Req,
    ) -> CsmsResult<Resp> {
        let payload = serde_json::to_value(&request).map_err(|e| CsmsError::Decode(e.to_string()))?;
        let result = self.router.dispatch(charge_point_id, action, payload).await?;
        serde_json::from_value(result).map_err(|e| CsmsError::Decode(e.to_string()))
    }
}
