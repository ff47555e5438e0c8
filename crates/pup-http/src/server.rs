//! HTTP Server
//!
//! Binds the configured address and serves the router until SIGINT/SIGTERM.

use crate::middleware::{apply_middleware, MiddlewareConfig};
use crate::router::create_router;
use crate::state::AppState;
use crate::{Result, ServerError};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

/// Default listen port
pub const DEFAULT_PORT: u16 = 9983;

pub struct HttpServer {
    bind_addr: String,
    router: Router,
}

impl HttpServer {
    /// Create a new server builder
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder::new()
    }

    /// Address passed to the listener, e.g. `0.0.0.0:9983`
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// The fully layered router, for driving requests without a socket
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until a shutdown signal arrives
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Builder for HttpServer
pub struct HttpServerBuilder {
    bind_addr: String,
    state: Option<Arc<AppState>>,
    middleware_config: MiddlewareConfig,
}

impl HttpServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            state: None,
            middleware_config: MiddlewareConfig::default(),
        }
    }

    /// Set bind address: a bare port (`9983`), `:9983`, or `host:port`
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = normalize_bind_addr(&addr.into());
        self
    }

    pub fn state(mut self, state: Arc<AppState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn middleware(mut self, config: MiddlewareConfig) -> Self {
        self.middleware_config = config;
        self
    }

    /// Build the server. Refuses to run without state or without auth tokens.
    pub fn build(self) -> Result<HttpServer> {
        let state = self
            .state
            .ok_or_else(|| ServerError::Config("no application state present".to_string()))?;

        if state.authenticator.is_empty() {
            return Err(ServerError::Config("no auth tokens present".to_string()));
        }

        let router = apply_middleware(create_router(state), self.middleware_config);

        Ok(HttpServer {
            bind_addr: self.bind_addr,
            router,
        })
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_bind_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.parse::<u16>().is_ok() {
        format!("0.0.0.0:{addr}")
    } else if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        addr.to_string()
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pup_core::{AuthTokens, Authenticator};
    use pup_store::{MemoryStore, Transitioner};

    fn state(tokens: &[&str]) -> Arc<AppState> {
        Arc::new(AppState::new(
            Transitioner::new(Arc::new(MemoryStore::new())),
            Authenticator::new(AuthTokens::new(tokens.iter().copied())),
        ))
    }

    #[test]
    fn test_bind_addr_forms() {
        assert_eq!(normalize_bind_addr("9983"), "0.0.0.0:9983");
        assert_eq!(normalize_bind_addr(":9983"), "0.0.0.0:9983");
        assert_eq!(normalize_bind_addr("127.0.0.1:8080"), "127.0.0.1:8080");
        assert_eq!(normalize_bind_addr("localhost:8080"), "localhost:8080");
    }

    #[test]
    fn test_build_requires_tokens() {
        let err = HttpServer::builder().state(state(&[])).build().err().unwrap();
        assert!(matches!(err, ServerError::Config(_)));

        let err = HttpServer::builder().build().err().unwrap();
        assert!(matches!(err, ServerError::Config(_)));

        let server = HttpServer::builder()
            .bind("9999")
            .state(state(&["abc"]))
            .build()
            .unwrap();
        assert_eq!(server.bind_addr(), "0.0.0.0:9999");
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = HttpServer::builder()
            .bind("127.0.0.1:0")
            .state(state(&["abc"]))
            .build()
            .unwrap();
        server.serve_with_shutdown(async {}).await.unwrap();
    }
}
