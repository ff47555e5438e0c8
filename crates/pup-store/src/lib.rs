//! pup-store - Device Record Storage
//!
//! Persists one record per device and runs the compare-and-swap transition
//! pipeline on top of it:
//! Router → Transitioner → DeviceStore (memory | redis | sqlite)
//!
//! Features:
//! - Pluggable backends selected by URL
//! - Atomic conditional writes (`save_if`) in every backend
//! - Per-device in-process serialization
//! - Prometheus metrics

pub mod error;
pub mod locks;
pub mod memory_store;
pub mod metrics;
pub mod redis_store;
pub mod sqlite_store;
pub mod store;
pub mod transition;

pub use error::StoreError;
pub use locks::KeyedLocks;
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use sqlite_store::SqliteStore;
pub use store::{open_store, DeviceStore};
pub use transition::{Transitioner, DEFAULT_STORE_TIMEOUT};
