//! Route table
//!
//! Probes are open; everything under `/devices` sits behind token auth.

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::auth::require_auth;
use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let devices = Router::new()
        .route("/devices", get(handlers::list_devices))
        .route(
            "/devices/:id/state",
            put(handlers::update_state).get(handlers::device_state),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // get() also answers HEAD
        .route("/", get(handlers::ohai))
        .route("/__meta__", get(handlers::meta))
        .route("/metrics", get(handlers::metrics))
        .merge(devices)
        .with_state(state)
}
