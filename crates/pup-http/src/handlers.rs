//! Request handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use pup_core::{Device, TransitionRequest};
use serde::Serialize;
use std::sync::Arc;

use crate::response::{json_respond, ApiError, MessageBody};
use crate::state::AppState;

/// Liveness acknowledgement returned by `GET /`
pub const OHAI: &str = "🐕♻™";

#[derive(Serialize)]
pub struct MetaResponse {
    pub message: String,
    pub uptime: f64,
    pub version: String,
}

#[derive(Serialize)]
pub struct DeviceList {
    pub data: Vec<Device>,
}

/// GET|HEAD / - liveness probe
pub async fn ohai() -> Response {
    json_respond(
        StatusCode::OK,
        &MessageBody {
            message: OHAI.to_string(),
        },
    )
}

/// GET /__meta__ - uptime and version
pub async fn meta(State(state): State<Arc<AppState>>) -> Response {
    json_respond(
        StatusCode::OK,
        &MetaResponse {
            message: "hello, human".to_string(),
            uptime: state.uptime_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}

/// GET /metrics - prometheus exposition
pub async fn metrics() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        pup_store::metrics::gather_metrics(),
    )
        .into_response()
}

/// PUT /devices/:id/state - compare-and-swap transition
pub async fn update_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let msg: TransitionRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let device = state
        .transitioner
        .transition(&id, &msg.cur, &msg.new)
        .await
        .map_err(|e| {
            ApiError::from_core("failed to update device state", &e, state.conflict_status)
        })?;

    Ok(json_respond(StatusCode::OK, &device))
}

/// GET /devices/:id/state - one record, `""` state for unknown ids
pub async fn device_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let device = state
        .transitioner
        .device(&id)
        .await
        .map_err(|e| ApiError::from_core("failed to fetch device state", &e, false))?;

    Ok(json_respond(StatusCode::OK, &device))
}

/// GET /devices - every stored record
pub async fn list_devices(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let devices = state
        .transitioner
        .devices()
        .await
        .map_err(|e| ApiError::from_core("failed to fetch devices", &e, false))?;

    Ok(json_respond(StatusCode::OK, &DeviceList { data: devices }))
}
