//! pup-http: HTTP surface for pupcycler
//!
//! Architecture:
//! ```text
//! pupcycler binary
//!     └── pup-http (this crate)
//!         ├── Middleware stack (panic recovery, tracing, timeout, headers)
//!         └── Router
//!             ├── GET|HEAD /                  → liveness probe
//!             ├── GET /__meta__               → uptime and version
//!             ├── GET /metrics                → prometheus
//!             └── token auth
//!                 ├── GET /devices            → all records
//!                 ├── GET /devices/:id/state  → one record
//!                 └── PUT /devices/:id/state  → compare-and-swap transition
//! ```

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

// Re-export main types
pub use middleware::{MiddlewareConfig, MiddlewareStack};
pub use response::ApiError;
pub use router::create_router;
pub use server::{HttpServer, HttpServerBuilder};
pub use state::AppState;

// Re-export axum for convenience
pub use axum;

/// Error types for the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server binding error: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Invalid server configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
