//! REST control plane (§6) over the [`ControlApi`](crate::control_api::ControlApi).
//!
//! Grounded on the teacher's `api/` module: a flat `ApiResponse<T>` envelope, one `AppState`
//! shared across handlers via axum's `State`, errors mapped to a `(StatusCode, Json<..>)`
//! pair. Trimmed of the teacher's JWT/API-key auth and Swagger UI layers — out of scope here
//! — while keeping its `tower-http` trace/CORS layering.

mod dto;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::control_api::ControlApi;

#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlApi>,
}

pub fn router(control: Arc<ControlApi>) -> Router {
    let state = AppState { control };

    Router::new()
        .route("/api/v1/chargers", get(handlers::list_chargers).post(handlers::create_charger))
        .route("/api/v1/chargers/{id}", get(handlers::get_charger))
        .route("/api/v1/chargers/pending", get(handlers::list_pending_chargers))
        .route(
            "/api/v1/statistics/charger/{id}/heartbeat-history",
            get(handlers::heartbeat_history),
        )
        .route(
            "/api/v1/statistics/charger/{id}/status-timeline",
            get(handlers::status_timeline),
        )
        .route("/api/remoteStart", post(handlers::remote_start))
        .route("/api/remoteStop", post(handlers::remote_stop))
        .route("/api/changeAvailability", post(handlers::change_availability))
        .route("/api/reset", post(handlers::reset))
        .route("/api/triggerMessage", post(handlers::trigger_message))
        .route("/api/getDiagnostics", post(handlers::get_diagnostics))
        .route("/api/unlockConnector", post(handlers::unlock_connector))
        .route("/api/updateFirmware", post(handlers::update_firmware))
        .route("/api/updateLocation", post(handlers::update_location))
        .route("/api/updatePrice", post(handlers::update_pricing))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
