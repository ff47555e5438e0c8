//! Shared Middleware Stack
//!
//! Applied once around the whole router so every endpoint gets the same
//! panic recovery, tracing, timeout and response headers.

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    BoxError, Router,
};
use std::any::Any;
use std::time::{Duration, Instant};
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::response::ApiError;

/// Middleware configuration
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }
}

/// Middleware stack that can be applied to a router
pub struct MiddlewareStack {
    config: MiddlewareConfig,
}

impl MiddlewareStack {
    pub fn new(config: MiddlewareConfig) -> Self {
        Self { config }
    }

    /// Apply the middleware stack to a router
    pub fn apply(self, router: Router) -> Router {
        router
            // Security headers (innermost - runs first on response)
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(request_logging_middleware))
            // An elapsed deadline becomes a JSON 500 like any other failure
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(deadline_exceeded))
                    .layer(TimeoutLayer::new(self.config.timeout)),
            )
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            )
            // Panic recovery (outermost - sees panics from every layer above)
            .layer(CatchPanicLayer::custom(panic_response))
    }
}

async fn deadline_exceeded(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::error!("request exceeded its deadline");
        ApiError::internal("request deadline exceeded")
    } else {
        tracing::error!(err = %err, "request failed in middleware");
        ApiError::internal("internal server error")
    }
}

/// Turn a handler panic into a generic 500 without leaking the payload
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "request handler panicked");
    ApiError::internal("internal server error").into_response()
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));

    response
}

async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!("{} {} {} - {}ms", method, uri, status, duration.as_millis());
    } else if response.status().is_client_error() {
        tracing::warn!("{} {} {} - {}ms", method, uri, status, duration.as_millis());
    } else {
        tracing::info!("{} {} {} - {}ms", method, uri, status, duration.as_millis());
    }

    response
}

/// Convenience function to apply middleware with config
pub fn apply_middleware(router: Router, config: MiddlewareConfig) -> Router {
    MiddlewareStack::new(config).apply(router)
}
