//! HTTP handlers: thin translation between axum extractors and [`ControlApi`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::dto::*;
use crate::api::AppState;
use crate::control_api::{Availability, ResetKind, TriggerTarget};
use crate::store::{ChargePointFilter, Window};
use crate::support::errors::CsmsError;

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

fn status_for(err: &CsmsError) -> StatusCode {
    match err {
        CsmsError::UnknownCharger(_) => StatusCode::NOT_FOUND,
        CsmsError::ChargerOffline(_) | CsmsError::ChargerDisconnected(_) => StatusCode::CONFLICT,
        CsmsError::ChargerBusy(_) => StatusCode::TOO_MANY_REQUESTS,
        CsmsError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        CsmsError::State(_) | CsmsError::Validation(_) | CsmsError::Decode(_) => StatusCode::BAD_REQUEST,
        CsmsError::Store(_) | CsmsError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail<T>(err: CsmsError) -> (StatusCode, Json<ApiResponse<T>>) {
    (status_for(&err), Json(ApiResponse::error(err.to_string())))
}

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

pub async fn list_chargers(State(state): State<AppState>) -> ApiResult<Vec<ChargePointDto>> {
    let chargers = state
        .control
        .list_charge_points(&ChargePointFilter::default())
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(chargers.into_iter().map(ChargePointDto::from).collect())))
}

pub async fn list_pending_chargers(State(state): State<AppState>) -> ApiResult<Vec<ChargePointDto>> {
    let chargers = state.control.list_pending_charge_points().await.map_err(fail)?;
    Ok(Json(ApiResponse::success(chargers.into_iter().map(ChargePointDto::from).collect())))
}

pub async fn get_charger(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ChargePointDto> {
    match state.control.get_charge_point(&id).await {
        Ok(Some(cp)) => Ok(Json(ApiResponse::success(ChargePointDto::from(cp)))),
        Ok(None) => Err((StatusCode::NOT_FOUND, Json(ApiResponse::error(format!("charger '{id}' not found"))))),
        Err(e) => Err(fail(e)),
    }
}

/// Provisions a charge point's location/pricing ahead of its first BootNotification, or
/// updates an already-connected one. There's no separate "create" step in the Store beyond
/// these fields — the charge point row itself is upserted lazily on boot.
pub async fn create_charger(State(state): State<AppState>, Json(req): Json<CreateChargerRequest>) -> ApiResult<()> {
    if let (Some(lat), Some(lng)) = (req.latitude, req.longitude) {
        state
            .control
            .update_location(&req.id, lat, lng, req.address.as_deref())
            .await
            .map_err(fail)?;
    }
    if let Some(price) = req.price_per_kwh {
        state
            .control
            .update_pricing(&req.id, price, req.nominal_rate_kw)
            .await
            .map_err(fail)?;
    }
    Ok(Json(ApiResponse::success(())))
}

pub async fn heartbeat_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Vec<DeviceEventDto>> {
    let events = state
        .control
        .get_heartbeat_timeline(&id, Window { from: window.from, to: window.to })
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(events.into_iter().map(DeviceEventDto::from).collect())))
}

pub async fn status_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Vec<DeviceEventDto>> {
    let events = state
        .control
        .get_status_timeline(&id, Window { from: window.from, to: window.to })
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(events.into_iter().map(DeviceEventDto::from).collect())))
}

pub async fn remote_start(State(state): State<AppState>, Json(req): Json<RemoteStartRequest>) -> ApiResult<String> {
    let resp = state
        .control
        .remote_start_transaction(&req.charge_point_id, &req.id_tag, req.connector_id)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(format!("{:?}", resp.status))))
}

pub async fn remote_stop(State(state): State<AppState>, Json(req): Json<RemoteStopRequest>) -> ApiResult<String> {
    let resp = state
        .control
        .remote_stop_transaction(&req.charge_point_id, req.transaction_id)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(format!("{:?}", resp.status))))
}

pub async fn change_availability(
    State(state): State<AppState>,
    Json(req): Json<ChangeAvailabilityRequest>,
) -> ApiResult<String> {
    let availability = if req.operative { Availability::Operative } else { Availability::Inoperative };
    let resp = state
        .control
        .change_availability(&req.charge_point_id, req.connector_id, availability)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(format!("{:?}", resp.status))))
}

pub async fn reset(State(state): State<AppState>, Json(req): Json<ResetRequest>) -> ApiResult<String> {
    let kind = if req.hard { ResetKind::Hard } else { ResetKind::Soft };
    let resp = state.control.reset(&req.charge_point_id, kind).await.map_err(fail)?;
    Ok(Json(ApiResponse::success(format!("{:?}", resp.status))))
}

fn parse_trigger(name: &str) -> Result<TriggerTarget, CsmsError> {
    match name {
        "BootNotification" => Ok(TriggerTarget::BootNotification),
        "DiagnosticsStatusNotification" => Ok(TriggerTarget::DiagnosticsStatusNotification),
        "FirmwareStatusNotification" => Ok(TriggerTarget::FirmwareStatusNotification),
        "Heartbeat" => Ok(TriggerTarget::Heartbeat),
        "MeterValues" => Ok(TriggerTarget::MeterValues),
        "StatusNotification" => Ok(TriggerTarget::StatusNotification),
        other => Err(CsmsError::State(format!("unsupported trigger target '{other}'"))),
    }
}

pub async fn trigger_message(
    State(state): State<AppState>,
    Json(req): Json<TriggerMessageRequest>,
) -> ApiResult<String> {
    let target = parse_trigger(&req.requested_message).map_err(fail)?;
    let resp = state
        .control
        .trigger_message(&req.charge_point_id, target, req.connector_id)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(format!("{:?}", resp.status))))
}

pub async fn get_diagnostics(
    State(state): State<AppState>,
    Json(req): Json<GetDiagnosticsRequest>,
) -> ApiResult<Option<String>> {
    let resp = state
        .control
        .get_diagnostics(
            &req.charge_point_id,
            &req.location,
            req.retries,
            req.retry_interval,
            req.start_time,
            req.stop_time,
        )
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(resp.file_name)))
}

pub async fn unlock_connector(
    State(state): State<AppState>,
    Json(req): Json<UnlockConnectorRequest>,
) -> ApiResult<String> {
    let resp = state
        .control
        .unlock_connector(&req.charge_point_id, req.connector_id)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(format!("{:?}", resp.status))))
}

pub async fn update_firmware(State(state): State<AppState>, Json(req): Json<UpdateFirmwareRequest>) -> ApiResult<()> {
    state
        .control
        .update_firmware(&req.charge_point_id, &req.location, req.retrieve_date, req.retries, req.retry_interval)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn update_location(State(state): State<AppState>, Json(req): Json<UpdateLocationRequest>) -> ApiResult<()> {
    state
        .control
        .update_location(&req.charge_point_id, req.latitude, req.longitude, req.address.as_deref())
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn update_pricing(State(state): State<AppState>, Json(req): Json<UpdatePriceRequest>) -> ApiResult<()> {
    state
        .control
        .update_pricing(&req.charge_point_id, req.price_per_kwh, req.nominal_rate_kw)
        .await
        .map_err(fail)?;
    Ok(Json(ApiResponse::success(())))
}
