//! Prometheus metrics for device transitions and store operations
//!
//! Provides observability into:
//! - Transition outcomes
//! - Store operation latencies and errors
//! - Authentication rejections

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Once;
use tracing::{info, warn};

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Transition requests by outcome
    pub static ref TRANSITIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pupcycler_transitions_total", "Device state transitions by outcome"),
        &["outcome"]
    ).expect("valid transitions metric");

    /// Store operation latency
    pub static ref STORE_OP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("pupcycler_store_operation_seconds", "Store operation duration")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["operation", "store_type"]
    ).expect("valid store duration metric");

    /// Store operation errors
    pub static ref STORE_OP_ERRORS: CounterVec = CounterVec::new(
        Opts::new("pupcycler_store_errors_total", "Store operation errors"),
        &["operation", "store_type", "error_type"]
    ).expect("valid store error metric");

    /// Rejected requests by reason
    pub static ref AUTH_REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("pupcycler_auth_rejections_total", "Requests rejected by authentication"),
        &["reason"]
    ).expect("valid auth metric");
}

static INIT: Once = Once::new();

/// Register all metrics with the global registry
pub fn register_metrics() {
    INIT.call_once(|| {
        REGISTRY.register(Box::new(TRANSITIONS_TOTAL.clone())).ok();
        REGISTRY.register(Box::new(STORE_OP_DURATION.clone())).ok();
        REGISTRY.register(Box::new(STORE_OP_ERRORS.clone())).ok();
        REGISTRY.register(Box::new(AUTH_REJECTIONS.clone())).ok();
        info!("Registered pupcycler metrics");
    });
}

/// Times a store operation until dropped
pub struct OperationTimer {
    operation: &'static str,
    store_type: &'static str,
    start: std::time::Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str, store_type: &'static str) -> Self {
        Self {
            operation,
            store_type,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        STORE_OP_DURATION
            .with_label_values(&[self.operation, self.store_type])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

pub fn record_transition(outcome: &str) {
    TRANSITIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_store_error(operation: &str, store_type: &str, error_type: &str) {
    STORE_OP_ERRORS
        .with_label_values(&[operation, store_type, error_type])
        .inc();
}

pub fn record_auth_rejection(reason: &str) {
    AUTH_REJECTIONS.with_label_values(&[reason]).inc();
}

/// Get metrics as text for Prometheus scraping
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_recorded_values_are_exported() {
        register_metrics();

        record_transition("ok");
        record_store_error("get", "memory", "timeout");
        record_auth_rejection("forbidden");
        {
            let _timer = OperationTimer::new("save_if", "memory");
        }

        let text = gather_metrics();
        assert!(text.contains("pupcycler_transitions_total"));
        assert!(text.contains("pupcycler_store_errors_total"));
        assert!(text.contains("pupcycler_auth_rejections_total"));
        assert!(text.contains("pupcycler_store_operation_seconds"));
    }
}
