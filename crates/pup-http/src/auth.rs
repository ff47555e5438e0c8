use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pup_core::AuthError;
use pup_store::metrics::record_auth_rejection;
use std::sync::Arc;
use tracing::debug;

use crate::response::ApiError;
use crate::state::AppState;

/// Reject requests without a configured `Authorization: token <tok>` header
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    // Non-UTF-8 values still count as a presented (and wrong) credential.
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    match state.authenticator.authenticate(header.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            let reason = match err {
                AuthError::Unauthorized => "unauthorized",
                AuthError::Forbidden => "forbidden",
            };
            record_auth_rejection(reason);
            debug!(uri = %request.uri(), reason, "request rejected");
            ApiError::from(err).into_response()
        }
    }
}
