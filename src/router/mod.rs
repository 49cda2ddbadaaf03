//! Router (§4.3): the seam between transports and sessions.
//!
//! Owns the `charger_id -> Session` map, correlates CSMS-initiated calls to their
//! responses across reconnects, and absorbs duplicate deliveries that MQTT's at-least-once
//! QoS can produce. Grounded on the teacher's `SessionRegistry` (`DashMap<String, Sender>`
//! keyed by charge point id) and `CommandSender` (request/response correlation for
//! CSMS-initiated calls), generalized to hold `Session`s instead of raw channels and to
//! operate over both transports uniformly through `OutboundChannel`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::Cache;
use crate::codec::{Action, OcppFrame};
use crate::config::SessionConfig;
use crate::domain::EventKind;
use crate::session::Session;
use crate::store::Store;
use crate::support::errors::{CsmsError, CsmsResult};
use crate::transport::OutboundChannel;

enum WaiterOutcome {
    Result(Value),
    Error { code: String, description: String },
}

struct DedupEntry {
    frame: OcppFrame,
    expires_at: Instant,
}

/// §4.1: N consecutive decode failures within a 10s window close the channel.
const DECODE_FAILURE_THRESHOLD: usize = 5;
const DECODE_FAILURE_WINDOW: Duration = Duration::from_secs(10);

pub struct Router {
    store: Arc<dyn Store>,
    cache: Arc<Cache>,
    config: SessionConfig,
    sessions: DashMap<String, Arc<Session>>,
    waiters: DashMap<(String, String), oneshot::Sender<WaiterOutcome>>,
    dedup: DashMap<(String, String), DedupEntry>,
    decode_failures: DashMap<String, VecDeque<Instant>>,
}

impl Router {
    pub fn new(store: Arc<dyn Store>, cache: Arc<Cache>, config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            cache,
            config,
            sessions: DashMap::new(),
            waiters: DashMap::new(),
            dedup: DashMap::new(),
            decode_failures: DashMap::new(),
        })
    }

    /// Records a malformed-frame decode failure for `charger_id` and reports whether the
    /// transport should close the channel: `DECODE_FAILURE_THRESHOLD` failures inside
    /// `DECODE_FAILURE_WINDOW` (§4.1).
    pub async fn on_decode_failure(&self, charger_id: &str, description: String) -> bool {
        let _ = self
            .store
            .record_event(charger_id, None, EventKind::DecodeFailure, serde_json::json!({"error": description}))
            .await;

        let now = Instant::now();
        let mut window = self.decode_failures.entry(charger_id.to_string()).or_insert_with(VecDeque::new);
        window.retain(|t| now.duration_since(*t) < DECODE_FAILURE_WINDOW);
        window.push_back(now);
        window.len() >= DECODE_FAILURE_THRESHOLD
    }

    /// Clears a charger's decode-failure window, called after any successfully parsed frame.
    pub fn clear_decode_failures(&self, charger_id: &str) {
        self.decode_failures.remove(charger_id);
    }

    fn session_for(&self, charger_id: &str) -> Arc<Session> {
        self.sessions
            .entry(charger_id.to_string())
            .or_insert_with(|| {
                Arc::new(Session::new(charger_id, self.store.clone(), self.cache.clone(), self.config.clone()))
            })
            .clone()
    }

    pub fn session(&self, charger_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(charger_id).map(|s| s.clone())
    }

    /// A new transport connected for `charger_id`. Unknown chargers are auto-provisioned
    /// here (see DESIGN.md "unknown charger on connect"): a `Session` is created in
    /// `Disconnected`->`Booting` and the charge point row is created lazily by the first
    /// BootNotification, the same upsert-on-boot the teacher's `register_or_update` does.
    pub async fn on_connected(&self, charger_id: &str, channel: Arc<dyn OutboundChannel>) {
        let session = self.session_for(charger_id);
        session.on_connected(channel).await;
        info!(charge_point_id = charger_id, "transport connected");
        if let Err(e) = self.store.record_event(charger_id, None, EventKind::Connected, serde_json::json!({})).await {
            warn!(charge_point_id = charger_id, error = %e, "failed to record connect event");
        }
    }

    pub async fn on_disconnected(&self, charger_id: &str) {
        if let Some(session) = self.session(charger_id) {
            session.on_disconnected().await;
        }
        info!(charge_point_id = charger_id, "transport disconnected");
        if let Err(e) = self.store.record_event(charger_id, None, EventKind::Disconnected, serde_json::json!({})).await {
            warn!(charge_point_id = charger_id, error = %e, "failed to record disconnect event");
        }
    }

    /// Handles one inbound frame, charge-point CALLs and CSMS-call responses alike.
    /// Returns the frame to send back immediately (CALLRESULT/CALLERROR for a CALL);
    /// `None` when the frame resolved a pending CSMS-initiated call instead.
    pub async fn on_inbound(&self, charger_id: &str, frame: OcppFrame) -> Option<OcppFrame> {
        match frame {
            OcppFrame::Call { unique_id, action, payload } => {
                self.handle_inbound_call(charger_id, unique_id, action, payload).await
            }
            OcppFrame::CallResult { unique_id, payload } => {
                self.resolve_waiter(charger_id, &unique_id, WaiterOutcome::Result(payload)).await;
                None
            }
            OcppFrame::CallError { unique_id, error_code, error_description, .. } => {
                self.resolve_waiter(charger_id, &unique_id, WaiterOutcome::Error { code: error_code, description: error_description }).await;
                None
            }
        }
    }

    async fn handle_inbound_call(&self, charger_id: &str, unique_id: String, action_name: String, payload: Value) -> Option<OcppFrame> {
        let key = (charger_id.to_string(), unique_id.clone());

        if let Some(entry) = self.dedup.get(&key) {
            if Instant::now() < entry.expires_at {
                warn!(charge_point_id = charger_id, unique_id = unique_id.as_str(), "duplicate CALL delivery, resending cached response");
                let _ = self.store.record_event(charger_id, None, EventKind::DuplicateDelivery, serde_json::json!({"uniqueId": unique_id})).await;
                return Some(entry.frame.clone());
            }
        }

        let response = match action_name.parse::<Action>() {
            Err(e) => OcppFrame::error_response(unique_id.clone(), e.call_error_code(), e.description()),
            Ok(action) if !action.is_charge_point_initiated() => OcppFrame::error_response(
                unique_id.clone(),
                "SecurityError",
                format!("'{action}' may not be sent by a charge point"),
            ),
            Ok(action) => match crate::codec::validate_inbound_payload(action, &payload) {
                Err(e) => {
                    let _ = self
                        .store
                        .record_event(
                            charger_id,
                            None,
                            EventKind::ValidationFailure,
                            serde_json::json!({"action": action.as_str(), "error": e.description()}),
                        )
                        .await;
                    OcppFrame::error_response(unique_id.clone(), e.call_error_code(), e.description())
                }
                Ok(()) => {
                    let session = self.session_for(charger_id);
                    match session.handle_call(action, payload).await {
                        Ok(resp) => OcppFrame::CallResult { unique_id: unique_id.clone(), payload: resp },
                        Err(e) => {
                            // A handler error here means the response itself couldn't be
                            // produced (serialization) or the store rejected the write; both
                            // surface through `CsmsError` without a dedicated variant per kind.
                            let kind = match &e {
                                CsmsError::Decode(_) | CsmsError::Validation(_) => EventKind::EncodeFailure,
                                _ => EventKind::StoreFailure,
                            };
                            let _ = self
                                .store
                                .record_event(charger_id, None, kind, serde_json::json!({"action": action.as_str(), "error": e.to_string()}))
                                .await;
                            OcppFrame::error_response(unique_id.clone(), e.call_error_code(), e.to_string())
                        }
                    }
                }
            },
        };

        self.dedup.insert(
            key,
            DedupEntry { frame: response.clone(), expires_at: Instant::now() + Duration::from_secs(self.config.dedup_window_seconds) },
        );
        Some(response)
    }

    async fn resolve_waiter(&self, charger_id: &str, unique_id: &str, outcome: WaiterOutcome) {
        let key = (charger_id.to_string(), unique_id.to_string());
        match self.waiters.remove(&key) {
            Some((_, tx)) => {
                let _ = tx.send(outcome);
            }
            None => {
                warn!(charge_point_id = charger_id, unique_id, "response with no matching pending call (late or duplicate)");
            }
        }
    }

    /// Sends `action`/`payload` as a server-initiated CALL and awaits its CALLRESULT,
    /// failing with `ChargerOffline`/`ChargerBusy`/`Timeout` per §4.7's rejection rules.
    pub async fn dispatch(&self, charger_id: &str, action: Action, payload: Value) -> CsmsResult<Value> {
        let session = self.session(charger_id).ok_or_else(|| CsmsError::UnknownCharger(charger_id.to_string()))?;
        if !session.is_online().await {
            return Err(CsmsError::ChargerOffline(charger_id.to_string()));
        }

        let unique_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.waiters.insert((charger_id.to_string(), unique_id.clone()), tx);

        let frame = OcppFrame::Call { unique_id: unique_id.clone(), action: action.as_str().to_string(), payload };
        if let Err(e) = session.enqueue_outbound(unique_id.clone(), frame).await {
            self.waiters.remove(&(charger_id.to_string(), unique_id));
            return Err(e);
        }

        let timeout = Duration::from_secs(self.config.call_timeout_seconds);
        self.cache.track_pending_call(charger_id, &unique_id, Instant::now() + timeout);
        self.pump(charger_id, &session).await;

        let awaited = tokio::time::timeout(timeout, rx).await;

        self.waiters.remove(&(charger_id.to_string(), unique_id.clone()));
        self.cache.clear_pending_call(charger_id, &unique_id);
        session.complete_in_flight(&unique_id).await;
        self.pump(charger_id, &session).await;

        match awaited {
            Ok(Ok(WaiterOutcome::Result(v))) => Ok(v),
            Ok(Ok(WaiterOutcome::Error { code, description })) => Err(CsmsError::Transport(format!("{code}: {description}"))),
            Ok(Err(_)) => Err(CsmsError::ChargerDisconnected(charger_id.to_string())),
            Err(_) => {
                let _ = self.store.record_event(charger_id, None, EventKind::CallTimeout, serde_json::json!({"action": action.as_str()})).await;
                Err(CsmsError::Timeout)
            }
        }
    }

    /// Drains a session's outbound queue while a transport is attached and nothing else
    /// is in flight (§5: strict FIFO, at-most-one-in-flight per charger).
    async fn pump(&self, charger_id: &str, session: &Arc<Session>) {
        while let Some((call, channel)) = session.try_dispatch_next().await {
            if let Err(e) = channel.send(&call.frame).await {
                warn!(charge_point_id = charger_id, error = %e, "failed to send queued call");
                session.complete_in_flight(&call.unique_id).await;
                self.resolve_waiter(
                    charger_id,
                    &call.unique_id,
                    WaiterOutcome::Error { code: "InternalError".to_string(), description: e.to_string() },
                )
                .await;
                break;
            }
        }
    }

    /// One tick of the background watchdog: expires sessions past their heartbeat
    /// deadline, sweeps stale active charging sessions to `Interrupted`, and clears
    /// expired cache/dedup entries. Grounded on the teacher's `HeartbeatMonitor`
    /// check-interval loop, generalized over both transports.
    pub async fn watchdog_tick(&self) {
        let now = Instant::now();
        // Collect before awaiting anything — holding a DashMap shard guard across an
        // await point risks deadlocking a concurrent `session_for` insert on that shard.
        let snapshot: Vec<(String, Arc<Session>)> =
            self.sessions.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
        for (charger_id, session) in snapshot {
            if now >= session.watchdog_deadline().await && session.on_watchdog_expired().await {
                warn!(charge_point_id = charger_id.as_str(), "heartbeat watchdog expired");
                let _ = self.store.record_event(&charger_id, None, EventKind::HeartbeatWatchdogExpired, serde_json::json!({})).await;
            }
        }

        let stale_before = chrono::Utc::now() - chrono::Duration::hours(self.config.session_stale_timeout_hours as i64);
        match self.store.interrupt_stale_sessions(stale_before).await {
            Ok(sessions) if sessions.is_empty() => {}
            Ok(sessions) => {
                info!(count = sessions.len(), "interrupted stale charging sessions");
                for session in sessions {
                    let _ = self
                        .store
                        .record_event(
                            &session.charge_point_id,
                            Some(session.evse_id),
                            EventKind::SessionStale,
                            serde_json::json!({"transactionId": session.transaction_id}),
                        )
                        .await;
                }
            }
            Err(e) => warn!(error = %e, "failed to sweep stale charging sessions"),
        }

        self.cache.sweep_expired();
        self.dedup.retain(|_, entry| entry.expires_at > Instant::now());
    }

    /// Spawns the periodic watchdog task. Returns its join handle so callers can await it
    /// on shutdown.
    pub fn spawn_watchdog(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                router.watchdog_tick().await;
            }
        })
    }

    /// Rebuilds the advisory cache from persisted state after a cold start (§4.6): last
    /// known status and last-seen time per charge point, since the cache itself carries
    /// nothing across restarts.
    pub async fn rebuild_cache(&self) -> CsmsResult<()> {
        let charge_points = self.store.list_charge_points(&Default::default()).await?;
        for cp in charge_points {
            self.cache.set_status(&cp.id, cp.physical_status);
            if let Some(last_seen) = cp.last_seen {
                self.cache.set_last_seen(&cp.id, last_seen);
            }
        }
        Ok(())
    }
}
