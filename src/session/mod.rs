//! Per-charger session state machine (§4.4).
//!
//! A `Session` owns no back-pointer to the `Router`; it is handed an [`OutboundChannel`]
//! on connect and driven purely by method calls (`on_connected`, `handle_call`, ...), the
//! way the teacher's `OcppHandlerV16` is driven by its WebSocket server loop rather than
//! reaching back into it. This keeps Router -> Session -> Transport acyclic per the
//! redesign flag that replaced the teacher's bidirectional registry/handler wiring.

mod auth_cache;
mod state;

pub use state::SessionState;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_ocpp::v1_6::messages::authorize::AuthorizeRequest;
use rust_ocpp::v1_6::messages::boot_notification::{BootNotificationRequest, BootNotificationResponse};
use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::messages::diagnostics_status_notification::{
    DiagnosticsStatusNotificationRequest, DiagnosticsStatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::firmware_status_notification::{
    FirmwareStatusNotificationRequest, FirmwareStatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::messages::start_transaction::{StartTransactionRequest, StartTransactionResponse};
use rust_ocpp::v1_6::messages::status_notification::{StatusNotificationRequest, StatusNotificationResponse};
use rust_ocpp::v1_6::messages::stop_transaction::{StopTransactionRequest, StopTransactionResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, DataTransferStatus, IdTagInfo, RegistrationStatus};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::codec::Action;
use crate::config::SessionConfig;
use crate::domain::{
    ChargingSession, DeviceEvent, EventKind, IdTagStatus, Order, PhysicalStatus,
};
use crate::store::Store;
use crate::support::errors::{CsmsError, CsmsResult};
use crate::transport::OutboundChannel;
use auth_cache::AuthCache;

/// A server-initiated CALL waiting for its turn to be sent (§5: at-most-one-in-flight).
pub struct QueuedCall {
    pub unique_id: String,
    pub frame: crate::codec::OcppFrame,
}

struct Inner {
    state: SessionState,
    channel: Option<Arc<dyn OutboundChannel>>,
    heartbeat_interval: Duration,
    offline_timeout: Duration,
    watchdog_deadline: Instant,
    auth_cache: AuthCache,
    outbound_queue: VecDeque<QueuedCall>,
    in_flight: Option<String>,
}

pub struct Session {
    pub charger_id: String,
    store: Arc<dyn Store>,
    cache: Arc<Cache>,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new(charger_id: impl Into<String>, store: Arc<dyn Store>, cache: Arc<Cache>, config: SessionConfig) -> Self {
        let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_seconds);
        let offline_timeout = Duration::from_secs(config.offline_timeout_seconds);
        Self {
            charger_id: charger_id.into(),
            store,
            cache,
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                channel: None,
                heartbeat_interval,
                offline_timeout,
                watchdog_deadline: Instant::now() + offline_timeout,
                auth_cache: AuthCache::new(1000, Duration::from_secs(config.authorize_cache_ttl_seconds)),
                outbound_queue: VecDeque::new(),
                in_flight: None,
            }),
            config,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn is_online(&self) -> bool {
        matches!(self.inner.lock().await.state, SessionState::Online | SessionState::Faulted)
    }

    pub async fn watchdog_deadline(&self) -> Instant {
        self.inner.lock().await.watchdog_deadline
    }

    /// Sends `frame` straight down the attached transport, bypassing the outbound call
    /// queue. Used for CALLRESULT/CALLERROR replies to inbound CALLs, which aren't
    /// server-initiated calls and so aren't subject to the at-most-one-in-flight rule.
    pub async fn send_direct(&self, frame: &crate::codec::OcppFrame) -> CsmsResult<()> {
        let channel = self.inner.lock().await.channel.clone();
        match channel {
            Some(channel) => channel.send(frame).await,
            None => Err(CsmsError::ChargerDisconnected(self.charger_id.clone())),
        }
    }

    /// A new transport connected (or reconnected) for this charger. Adopts the handle
    /// atomically; any outbound calls queued while disconnected are retried once a new
    /// CALL is dispatched by the router's drain loop.
    pub async fn on_connected(&self, channel: Arc<dyn OutboundChannel>) {
        let mut inner = self.inner.lock().await;
        inner.channel = Some(channel);
        if inner.state == SessionState::Disconnected {
            inner.state = SessionState::Booting;
        }
        inner.watchdog_deadline = Instant::now() + inner.offline_timeout;
    }

    /// The transport dropped. Active charging sessions are left alone — the router's
    /// stale-session sweep is what eventually marks them Interrupted.
    pub async fn on_disconnected(&self) {
        let mut inner = self.inner.lock().await;
        inner.channel = None;
        inner.state = SessionState::Disconnected;
        inner.in_flight = None;
    }

    /// Called by the router's watchdog when `watchdog_deadline` has passed with no
    /// Heartbeat/BootNotification refresh.
    pub async fn on_watchdog_expired(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Disconnected {
            return false;
        }
        inner.state = SessionState::Disconnected;
        inner.channel = None;
        true
    }

    /// The control API drove a ChangeAvailability/Reset that changed operational state
    /// outside the normal inbound-action flow.
    pub async fn set_state(&self, state: SessionState) {
        self.inner.lock().await.state = state;
    }

    fn touch_watchdog(inner: &mut Inner) {
        inner.watchdog_deadline = Instant::now() + inner.offline_timeout;
    }

    /// Enqueues a server-initiated CALL. Fails fast with `ChargerBusy` once the soft cap
    /// is reached rather than growing the queue without bound (§4.3).
    pub async fn enqueue_outbound(&self, unique_id: impl Into<String>, frame: crate::codec::OcppFrame) -> CsmsResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.outbound_queue.len() >= self.config.outbound_queue_depth {
            return Err(CsmsError::ChargerBusy(self.charger_id.clone()));
        }
        inner.outbound_queue.push_back(QueuedCall { unique_id: unique_id.into(), frame });
        Ok(())
    }

    /// Pops the next queued call if nothing is currently in flight and a transport is
    /// attached. Returns the channel to send on so the router doesn't need its own lock.
    pub async fn try_dispatch_next(&self) -> Option<(QueuedCall, Arc<dyn OutboundChannel>)> {
        let mut inner = self.inner.lock().await;
        if inner.in_flight.is_some() {
            return None;
        }
        let channel = inner.channel.clone()?;
        let call = inner.outbound_queue.pop_front()?;
        inner.in_flight = Some(call.unique_id.clone());
        Some((call, channel))
    }

    /// Releases the in-flight slot so the next queued call (if any) can be dispatched.
    /// Called on CALLRESULT, CALLERROR, or timeout.
    pub async fn complete_in_flight(&self, unique_id: &str) {
        let mut inner = self.inner.lock().await;
        if inner.in_flight.as_deref() == Some(unique_id) {
            inner.in_flight = None;
        }
    }

    /// Dispatches one inbound charge-point-initiated CALL to its handler and returns the
    /// CALLRESULT payload. Errors here are semantic (state/store), not structural — the
    /// router has already validated the payload shape before calling this.
    pub async fn handle_call(&self, action: Action, payload: Value) -> CsmsResult<Value> {
        match action {
            Action::BootNotification => self.handle_boot_notification(payload).await,
            Action::Heartbeat => self.handle_heartbeat().await,
            Action::StatusNotification => self.handle_status_notification(payload).await,
            Action::Authorize => self.handle_authorize(payload).await,
            Action::StartTransaction => self.handle_start_transaction(payload).await,
            Action::StopTransaction => self.handle_stop_transaction(payload).await,
            Action::MeterValues => self.handle_meter_values(payload).await,
            Action::DataTransfer => self.handle_data_transfer(payload).await,
            Action::FirmwareStatusNotification => self.handle_firmware_status_notification(payload).await,
            Action::DiagnosticsStatusNotification => self.handle_diagnostics_status_notification(payload).await,
            other => Err(CsmsError::State(format!("{other} is not charge-point-initiated"))),
        }
    }

    async fn record_event(&self, evse_id: Option<i64>, kind: EventKind, payload: Value) {
        if let Err(e) = self.store.record_event(&self.charger_id, evse_id, kind, payload).await {
            warn!(charge_point_id = self.charger_id.as_str(), error = %e, "failed to record device event");
        }
    }

    async fn handle_boot_notification(&self, payload: Value) -> CsmsResult<Value> {
        let req: BootNotificationRequest = serde_json::from_value(payload)
            .map_err(|e| CsmsError::Decode(e.to_string()))?;

        let cp = self.store
            .upsert_charge_point_boot(
                &self.charger_id,
                &req.charge_point_vendor,
                &req.charge_point_model,
                req.firmware_version.as_deref(),
            )
            .await?;

        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Online;
        Self::touch_watchdog(&mut inner);
        let interval = inner.heartbeat_interval.as_secs();
        drop(inner);

        self.cache.set_last_seen(&self.charger_id, Utc::now());
        self.cache.set_status(&self.charger_id, cp.physical_status);

        info!(charge_point_id = self.charger_id.as_str(), vendor = %req.charge_point_vendor, "BootNotification accepted");
        self.record_event(
            None,
            EventKind::BootAccepted,
            serde_json::json!({"vendor": req.charge_point_vendor, "model": req.charge_point_model}),
        )
        .await;

        let response = BootNotificationResponse {
            current_time: Utc::now(),
            interval: interval as i32,
            status: RegistrationStatus::Accepted,
        };
        Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_heartbeat(&self) -> CsmsResult<Value> {
        let now = Utc::now();
        self.store.touch_last_seen(&self.charger_id, now).await?;
        self.cache.set_last_seen(&self.charger_id, now);

        let mut inner = self.inner.lock().await;
        Self::touch_watchdog(&mut inner);
        drop(inner);

        self.record_event(None, EventKind::Heartbeat, serde_json::json!({})).await;

        Ok(serde_json::to_value(HeartbeatResponse { current_time: now })
            .map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_status_notification(&self, payload: Value) -> CsmsResult<Value> {
        let req: StatusNotificationRequest = serde_json::from_value(payload)
            .map_err(|e| CsmsError::Decode(e.to_string()))?;

        let status: PhysicalStatus = format!("{:?}", req.status)
            .parse()
            .map_err(CsmsError::State)?;
        let connector_id = req.connector_id as u32;
        let error_code = format!("{:?}", req.error_code);

        // §4.4: a single connector's Faulted status never taints the charge point by
        // itself — only the aggregate (every EVSE Faulted) does. connectorId=0 is the
        // charge point reporting its own status directly, not a connector.
        let aggregate_faulted = if connector_id == 0 {
            self.store.update_charge_point_physical_status(&self.charger_id, status).await?;
            status == PhysicalStatus::Faulted
        } else {
            self.store
                .update_evse_status(&self.charger_id, connector_id, status, Some(error_code.as_str()))
                .await?;
            let evses = self.store.list_evses(&self.charger_id).await?;
            let all_faulted = !evses.is_empty() && evses.iter().all(|e| e.status == PhysicalStatus::Faulted);
            if all_faulted {
                self.store.update_charge_point_physical_status(&self.charger_id, PhysicalStatus::Faulted).await?;
            }
            all_faulted
        };

        if aggregate_faulted {
            self.cache.set_status(&self.charger_id, PhysicalStatus::Faulted);
        }

        let mut inner = self.inner.lock().await;
        if aggregate_faulted {
            inner.state = SessionState::Faulted;
        } else if inner.state == SessionState::Faulted {
            inner.state = SessionState::Online;
        }
        drop(inner);

        self.record_event(
            None,
            EventKind::StatusNotification,
            serde_json::json!({"connectorId": connector_id, "status": format!("{:?}", req.status), "errorCode": error_code}),
        )
        .await;

        Ok(serde_json::to_value(StatusNotificationResponse {}).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn authorize_tag(&self, tag: &str) -> CsmsResult<IdTagStatus> {
        {
            let mut inner = self.inner.lock().await;
            if let Some(status) = inner.auth_cache.get(tag) {
                return Ok(status);
            }
        }
        if let Some(cached) = self.cache.id_tag_status(tag) {
            self.inner.lock().await.auth_cache.insert(tag, cached);
            return Ok(cached);
        }

        let status = match self.store.get_id_tag(tag).await? {
            Some(id_tag) if id_tag.is_usable(Utc::now()) => IdTagStatus::Accepted,
            Some(id_tag) => id_tag.status,
            None => IdTagStatus::Invalid,
        };

        self.inner.lock().await.auth_cache.insert(tag, status);
        self.cache.set_id_tag_status(tag, status);
        Ok(status)
    }

    async fn handle_authorize(&self, payload: Value) -> CsmsResult<Value> {
        let req: AuthorizeRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        let status = self.authorize_tag(&req.id_tag).await?;

        self.record_event(
            None,
            EventKind::Authorize,
            serde_json::json!({"idTag": req.id_tag, "status": format!("{:?}", status)}),
        )
        .await;

        let response = rust_ocpp::v1_6::messages::authorize::AuthorizeResponse {
            id_tag_info: IdTagInfo { status: to_authorization_status(status), expiry_date: None, parent_id_tag: None },
        };
        Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_start_transaction(&self, payload: Value) -> CsmsResult<Value> {
        let req: StartTransactionRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        let connector_id = req.connector_id as u32;
        let meter_start = req.meter_start as i64;

        let auth_status = self.authorize_tag(&req.id_tag).await?;
        if auth_status != IdTagStatus::Accepted {
            let response = StartTransactionResponse {
                transaction_id: 0,
                id_tag_info: IdTagInfo { status: to_authorization_status(auth_status), expiry_date: None, parent_id_tag: None },
            };
            return Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?);
        }

        let evse = self.store.get_or_create_evse(&self.charger_id, connector_id).await?;
        if self.store.active_session_for_evse(&self.charger_id, evse.id).await?.is_some() {
            warn!(charge_point_id = self.charger_id.as_str(), connector_id, "StartTransaction rejected: connector already has an active session");
            let response = StartTransactionResponse {
                transaction_id: 0,
                id_tag_info: IdTagInfo { status: AuthorizationStatus::ConcurrentTx, expiry_date: None, parent_id_tag: None },
            };
            return Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?);
        }

        let new_session = ChargingSession::new(
            self.charger_id.clone(),
            evse.id,
            connector_id,
            0,
            req.id_tag.clone(),
            meter_start,
            req.timestamp,
        );
        let started = self.store.start_charging_session(new_session).await?;

        self.record_event(
            Some(evse.id),
            EventKind::StartTransaction,
            serde_json::json!({"idTag": req.id_tag, "meterStart": meter_start, "transactionId": started.transaction_id}),
        )
        .await;

        let response = StartTransactionResponse {
            transaction_id: started.transaction_id as i32,
            id_tag_info: IdTagInfo { status: AuthorizationStatus::Accepted, expiry_date: None, parent_id_tag: None },
        };
        Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_stop_transaction(&self, payload: Value) -> CsmsResult<Value> {
        let req: StopTransactionRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        let transaction_id = req.transaction_id as i64;
        let mut meter_stop = req.meter_stop as i64;

        // Idempotent: a stop for an unknown or already-closed transaction id is still
        // Accepted (§4.4) — the charge point has no way to retry otherwise.
        let session = match self.store.active_session_for_transaction(&self.charger_id, transaction_id).await? {
            Some(s) => s,
            None => {
                warn!(charge_point_id = self.charger_id.as_str(), transaction_id, "StopTransaction for unknown/already-closed transaction");
                let response = StopTransactionResponse {
                    id_tag_info: Some(IdTagInfo { status: AuthorizationStatus::Accepted, expiry_date: None, parent_id_tag: None }),
                };
                return Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?);
            }
        };

        if meter_stop < session.meter_start {
            warn!(
                charge_point_id = self.charger_id.as_str(),
                transaction_id,
                meter_start = session.meter_start,
                meter_stop,
                "meterStop below meterStart, clamping"
            );
            self.record_event(
                Some(session.evse_id),
                EventKind::ValidationFailure,
                serde_json::json!({"transactionId": transaction_id, "meterStart": session.meter_start, "meterStop": meter_stop}),
            )
            .await;
            meter_stop = session.meter_start;
        }

        let stopped = self.store.stop_charging_session(session.id, Utc::now(), meter_stop).await?;

        if let Some(energy_kwh) = stopped.energy_kwh() {
            if let Ok(Some(cp)) = self.store.get_charge_point(&self.charger_id).await {
                if let Some(price) = cp.price_per_kwh {
                    let order = Order::new(stopped.id, self.charger_id.clone(), energy_kwh, price);
                    if let Err(e) = self.store.insert_order(order).await {
                        warn!(charge_point_id = self.charger_id.as_str(), error = %e, "failed to record order");
                    }
                }
            }
        }

        self.record_event(
            Some(stopped.evse_id),
            EventKind::StopTransaction,
            serde_json::json!({"transactionId": transaction_id, "meterStop": meter_stop}),
        )
        .await;

        let response = StopTransactionResponse {
            id_tag_info: Some(IdTagInfo { status: AuthorizationStatus::Accepted, expiry_date: None, parent_id_tag: None }),
        };
        Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_meter_values(&self, payload: Value) -> CsmsResult<Value> {
        let req: MeterValuesRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        let connector_id = req.connector_id as u32;

        // §4.4: the owning session is resolved via transactionId, not the connector's
        // current occupant — an unknown or inactive id discards the sample.
        let Some(transaction_id) = req.transaction_id else {
            warn!(charge_point_id = self.charger_id.as_str(), connector_id, "discarding orphan MeterValues: no transactionId");
            self.record_event(None, EventKind::OrphanMeterValue, serde_json::json!({"connectorId": connector_id})).await;
            return Ok(serde_json::to_value(MeterValuesResponse {}).map_err(|e| CsmsError::Decode(e.to_string()))?);
        };

        let session = self.store.active_session_for_transaction(&self.charger_id, transaction_id as i64).await?;

        let Some(session) = session else {
            warn!(charge_point_id = self.charger_id.as_str(), connector_id, transaction_id, "discarding orphan MeterValues: unknown or inactive transactionId");
            self.record_event(None, EventKind::OrphanMeterValue, serde_json::json!({"connectorId": connector_id, "transactionId": transaction_id})).await;
            return Ok(serde_json::to_value(MeterValuesResponse {}).map_err(|e| CsmsError::Decode(e.to_string()))?);
        };

        let last_ts = self.store.last_meter_value_timestamp(session.id).await?;
        let now = Utc::now();

        for mv in req.meter_value {
            let mut timestamp = mv.timestamp;
            if timestamp > now {
                // Clamp clock-skewed future timestamps rather than reject the sample (§4.4).
                self.record_event(Some(session.evse_id), EventKind::ClockSkew, serde_json::json!({"reported": timestamp})).await;
                timestamp = now;
            }
            if let Some(last) = last_ts {
                if timestamp < last {
                    continue;
                }
            }

            let primary_value = mv
                .sampled_value
                .first()
                .and_then(|sv| sv.value.parse::<f64>().ok())
                .map(|v| (v * 1000.0).round() as i64)
                .unwrap_or(0);

            let sampled_value_json = serde_json::to_value(&mv.sampled_value).unwrap_or(Value::Null);
            let meter_value = crate::domain::MeterValue {
                id: 0,
                session_id: session.id,
                connector_id,
                timestamp,
                value: primary_value,
                sampled_value: sampled_value_json,
            };
            self.store.insert_meter_value(meter_value).await?;
        }

        self.record_event(Some(session.evse_id), EventKind::MeterValues, serde_json::json!({"connectorId": connector_id})).await;

        Ok(serde_json::to_value(MeterValuesResponse {}).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_data_transfer(&self, payload: Value) -> CsmsResult<Value> {
        let _req: DataTransferRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        let response = DataTransferResponse { status: DataTransferStatus::Accepted, data: None };
        Ok(serde_json::to_value(response).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_firmware_status_notification(&self, payload: Value) -> CsmsResult<Value> {
        let req: FirmwareStatusNotificationRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        self.record_event(None, EventKind::StatusNotification, serde_json::json!({"firmwareStatus": format!("{:?}", req.status)})).await;
        Ok(serde_json::to_value(FirmwareStatusNotificationResponse {}).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }

    async fn handle_diagnostics_status_notification(&self, payload: Value) -> CsmsResult<Value> {
        let req: DiagnosticsStatusNotificationRequest = serde_json::from_value(payload).map_err(|e| CsmsError::Decode(e.to_string()))?;
        self.record_event(None, EventKind::StatusNotification, serde_json::json!({"diagnosticsStatus": format!("{:?}", req.status)})).await;
        Ok(serde_json::to_value(DiagnosticsStatusNotificationResponse {}).map_err(|e| CsmsError::Decode(e.to_string()))?)
    }
}

fn to_authorization_status(status: IdTagStatus) -> AuthorizationStatus {
    match status {
        IdTagStatus::Accepted => AuthorizationStatus::Accepted,
        IdTagStatus::Blocked => AuthorizationStatus::Blocked,
        IdTagStatus::Expired => AuthorizationStatus::Expired,
        IdTagStatus::Invalid => AuthorizationStatus::Invalid,
        IdTagStatus::ConcurrentTx => AuthorizationStatus::ConcurrentTx,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChargePointFilter, Window};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::Mutex as TMutex;

    struct FakeStore {
        charge_point: TMutex<Option<crate::domain::ChargePoint>>,
        sessions: TMutex<Vec<ChargingSession>>,
        evses: TMutex<Vec<crate::domain::Evse>>,
        next_id: AtomicI64,
        id_tags: TMutex<Vec<crate::domain::IdTag>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                charge_point: TMutex::new(None),
                sessions: TMutex::new(Vec::new()),
                evses: TMutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
                id_tags: TMutex::new(vec![crate::domain::IdTag {
                    tag: "GOODTAG".into(),
                    status: IdTagStatus::Accepted,
                    parent_id: None,
                    expiry: None,
                }]),
            }
        }
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn list_charge_points(&self, _filter: &ChargePointFilter) -> CsmsResult<Vec<crate::domain::ChargePoint>> {
            Ok(vec![])
        }
        async fn get_charge_point(&self, _id: &str) -> CsmsResult<Option<crate::domain::ChargePoint>> {
            Ok(self.charge_point.lock().await.clone())
        }
        async fn list_pending_charge_points(&self) -> CsmsResult<Vec<crate::domain::ChargePoint>> {
            Ok(vec![])
        }
        async fn upsert_charge_point_boot(&self, id: &str, vendor: &str, model: &str, _fw: Option<&str>) -> CsmsResult<crate::domain::ChargePoint> {
            let cp = crate::domain::ChargePoint::new(id, vendor, model);
            *self.charge_point.lock().await = Some(cp.clone());
            Ok(cp)
        }
        async fn touch_last_seen(&self, _id: &str, _at: chrono::DateTime<Utc>) -> CsmsResult<()> {
            Ok(())
        }
        async fn set_location(&self, _id: &str, _lat: f64, _lng: f64, _addr: Option<&str>) -> CsmsResult<()> {
            Ok(())
        }
        async fn set_pricing(&self, _id: &str, _price: f64, _rate: Option<f64>) -> CsmsResult<()> {
            Ok(())
        }
        async fn get_or_create_evse(&self, charge_point_id: &str, connector_id: u32) -> CsmsResult<crate::domain::Evse> {
            let mut evses = self.evses.lock().await;
            if let Some(evse) = evses.iter().find(|e| e.charge_point_id == charge_point_id && e.connector_id == connector_id) {
                return Ok(evse.clone());
            }
            let evse = crate::domain::Evse {
                id: connector_id as i64,
                charge_point_id: charge_point_id.to_string(),
                connector_id,
                connector_type: crate::domain::ConnectorType::Type2,
                status: PhysicalStatus::Available,
                last_error_code: None,
            };
            evses.push(evse.clone());
            Ok(evse)
        }
        async fn list_evses(&self, charge_point_id: &str) -> CsmsResult<Vec<crate::domain::Evse>> {
            Ok(self.evses.lock().await.iter().filter(|e| e.charge_point_id == charge_point_id).cloned().collect())
        }
        async fn update_evse_status(&self, cp: &str, connector_id: u32, status: PhysicalStatus, err: Option<&str>) -> CsmsResult<()> {
            drop(self.get_or_create_evse(cp, connector_id).await?);
            let mut evses = self.evses.lock().await;
            if let Some(evse) = evses.iter_mut().find(|e| e.charge_point_id == cp && e.connector_id == connector_id) {
                evse.status = status;
                evse.last_error_code = err.map(str::to_string);
            }
            Ok(())
        }
        async fn update_charge_point_physical_status(&self, _cp: &str, _status: PhysicalStatus) -> CsmsResult<()> {
            Ok(())
        }
        async fn get_id_tag(&self, tag: &str) -> CsmsResult<Option<crate::domain::IdTag>> {
            Ok(self.id_tags.lock().await.iter().find(|t| t.tag == tag).cloned())
        }
        async fn start_charging_session(&self, mut session: ChargingSession) -> CsmsResult<ChargingSession> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            session.id = id;
            session.transaction_id = id;
            self.sessions.lock().await.push(session.clone());
            Ok(session)
        }
        async fn active_session_for_evse(&self, charge_point_id: &str, evse_id: i64) -> CsmsResult<Option<ChargingSession>> {
            Ok(self.sessions.lock().await.iter().find(|s| {
                s.charge_point_id == charge_point_id && s.evse_id == evse_id && s.status == crate::domain::SessionStatus::Active
            }).cloned())
        }
        async fn active_session_for_transaction(&self, charge_point_id: &str, transaction_id: i64) -> CsmsResult<Option<ChargingSession>> {
            Ok(self.sessions.lock().await.iter().find(|s| {
                s.charge_point_id == charge_point_id && s.transaction_id == transaction_id && s.status == crate::domain::SessionStatus::Active
            }).cloned())
        }
        async fn list_active_sessions(&self, _cp: &str) -> CsmsResult<Vec<ChargingSession>> {
            Ok(vec![])
        }
        async fn stop_charging_session(&self, session_id: i64, end_time: chrono::DateTime<Utc>, meter_stop: i64) -> CsmsResult<ChargingSession> {
            let mut sessions = self.sessions.lock().await;
            let s = sessions.iter_mut().find(|s| s.id == session_id).expect("session exists");
            s.end_time = Some(end_time);
            s.meter_stop = Some(meter_stop);
            s.status = crate::domain::SessionStatus::Completed;
            Ok(s.clone())
        }
        async fn interrupt_stale_sessions(&self, _older_than: chrono::DateTime<Utc>) -> CsmsResult<Vec<ChargingSession>> {
            Ok(vec![])
        }
        async fn last_meter_value_timestamp(&self, _session_id: i64) -> CsmsResult<Option<chrono::DateTime<Utc>>> {
            Ok(None)
        }
        async fn insert_meter_value(&self, _mv: crate::domain::MeterValue) -> CsmsResult<()> {
            Ok(())
        }
        async fn insert_order(&self, order: Order) -> CsmsResult<Order> {
            Ok(order)
        }
        async fn record_event(&self, _cp: &str, _evse_id: Option<i64>, _kind: EventKind, _payload: Value) -> CsmsResult<()> {
            Ok(())
        }
        async fn get_history(&self, _cp: &str, _w: Window) -> CsmsResult<Vec<DeviceEvent>> {
            Ok(vec![])
        }
        async fn get_heartbeat_timeline(&self, _cp: &str, _w: Window) -> CsmsResult<Vec<DeviceEvent>> {
            Ok(vec![])
        }
        async fn get_status_timeline(&self, _cp: &str, _w: Window) -> CsmsResult<Vec<DeviceEvent>> {
            Ok(vec![])
        }
    }

    fn test_session() -> Session {
        let store: Arc<dyn Store> = Arc::new(FakeStore::new());
        let cache = Arc::new(Cache::new(Duration::from_secs(300)));
        Session::new("CP1", store, cache, SessionConfig::default())
    }

    #[tokio::test]
    async fn boot_notification_transitions_to_online() {
        let session = test_session();
        let payload = serde_json::json!({"chargePointVendor": "Acme", "chargePointModel": "X1"});
        let result = session.handle_call(Action::BootNotification, payload).await.unwrap();
        assert_eq!(result["status"], "Accepted");
        assert_eq!(session.state().await, SessionState::Online);
    }

    #[tokio::test]
    async fn start_transaction_rejects_unknown_tag() {
        let session = test_session();
        let payload = serde_json::json!({
            "connectorId": 1, "idTag": "BADTAG", "meterStart": 0, "timestamp": "2024-01-01T00:00:00Z"
        });
        let result = session.handle_call(Action::StartTransaction, payload).await.unwrap();
        assert_eq!(result["idTagInfo"]["status"], "Invalid");
    }

    #[tokio::test]
    async fn start_transaction_rejects_second_concurrent_session() {
        let session = test_session();
        let payload = serde_json::json!({
            "connectorId": 1, "idTag": "GOODTAG", "meterStart": 0, "timestamp": "2024-01-01T00:00:00Z"
        });
        session.handle_call(Action::StartTransaction, payload.clone()).await.unwrap();
        let second = session.handle_call(Action::StartTransaction, payload).await.unwrap();
        assert_eq!(second["idTagInfo"]["status"], "ConcurrentTx");
    }

    #[tokio::test]
    async fn stop_transaction_for_unknown_id_is_idempotent_accepted() {
        let session = test_session();
        let payload = serde_json::json!({"transactionId": 999, "meterStop": 100, "timestamp": "2024-01-01T00:00:00Z"});
        let result = session.handle_call(Action::StopTransaction, payload).await.unwrap();
        assert_eq!(result["idTagInfo"]["status"], "Accepted");
    }

    #[tokio::test]
    async fn outbound_queue_rejects_beyond_soft_cap() {
        let mut config = SessionConfig::default();
        config.outbound_queue_depth = 1;
        let store: Arc<dyn Store> = Arc::new(FakeStore::new());
        let cache = Arc::new(Cache::new(Duration::from_secs(300)));
        let session = Session::new("CP1", store, cache, config);
        let frame = crate::codec::OcppFrame::Call { unique_id: "id1".into(), action: "Reset".into(), payload: serde_json::json!({}) };
        session.enqueue_outbound("id1", frame.clone()).await.unwrap();
        assert!(session.enqueue_outbound("id2", frame).await.is_err());
    }
}
