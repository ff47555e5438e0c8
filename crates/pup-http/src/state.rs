//! Shared application state

use pup_core::Authenticator;
use pup_store::Transitioner;
use std::time::Instant;

/// State shared by every request handler
pub struct AppState {
    pub transitioner: Transitioner,
    pub authenticator: Authenticator,
    /// Report state-machine rejections as 409 instead of 500
    pub conflict_status: bool,
    started_at: Instant,
}

impl AppState {
    pub fn new(transitioner: Transitioner, authenticator: Authenticator) -> Self {
        pup_store::metrics::register_metrics();
        Self {
            transitioner,
            authenticator,
            conflict_status: false,
            started_at: Instant::now(),
        }
    }

    pub fn with_conflict_status(mut self, enabled: bool) -> Self {
        self.conflict_status = enabled;
        self
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
