//! Device state transition pipeline
//!
//! ```text
//! lock(id) → get → Device::transition → save_if(prior) → record
//! ```
//!
//! The per-id lock closes the lost-update race between requests handled by
//! this process; `save_if` closes it between processes sharing a backend.
//! The lock wait and every store call are each bounded by a deadline.

use crate::locks::KeyedLocks;
use crate::metrics::{record_store_error, record_transition, OperationTimer};
use crate::store::DeviceStore;
use pup_core::{Device, Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default deadline for a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Transitioner {
    store: Arc<dyn DeviceStore>,
    locks: KeyedLocks,
    deadline: Duration,
}

impl Transitioner {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            deadline: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Override the per-call store deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Move device `id` from `cur` to `new`, returning the persisted record
    pub async fn transition(&self, id: &str, cur: &str, new: &str) -> Result<Device> {
        let result = self.try_transition(id, cur, new).await;
        match &result {
            Ok(device) => {
                record_transition("ok");
                info!(device = %id, state = %device.state, "device state updated");
            }
            Err(err) if err.is_conflict() => {
                record_transition(err.kind());
                warn!(device = %id, kind = err.kind(), "transition rejected: {}", err);
            }
            Err(err) => {
                record_transition(err.kind());
                error!(device = %id, kind = err.kind(), "transition failed: {}", err);
            }
        }
        result
    }

    async fn try_transition(&self, id: &str, cur: &str, new: &str) -> Result<Device> {
        let _guard = match tokio::time::timeout(self.deadline, self.locks.lock(id)).await {
            Ok(guard) => guard,
            Err(_) => {
                return Err(Error::timeout(format!(
                    "waiting on device {} exceeded {:?}",
                    id, self.deadline
                )))
            }
        };

        let mut device = self.device(id).await?;
        let prior = device.state.clone();
        device.transition(cur, new)?;

        let written = self
            .bounded("save_if", self.store.save_if(&device, &prior))
            .await?;
        if !written {
            // Another writer changed the record between our get and save.
            let actual = self.device(id).await?.state.to_string();
            debug!(device = %id, %actual, "conditional save lost");
            return Err(Error::StateMismatch {
                expected: cur.to_string(),
                actual,
            });
        }

        Ok(device)
    }

    /// Current record for `id`; ids never written read as `Unset`
    pub async fn device(&self, id: &str) -> Result<Device> {
        Ok(self
            .bounded("get", self.store.get(id))
            .await?
            .unwrap_or_else(|| Device::new(id)))
    }

    /// Every stored record
    pub async fn devices(&self) -> Result<Vec<Device>> {
        self.bounded("list", self.store.list()).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = crate::error::Result<T>>,
    {
        let backend = self.store.backend();
        let _timer = OperationTimer::new(operation, backend);

        match tokio::time::timeout(self.deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                record_store_error(operation, backend, "backend");
                error!(operation, backend, "store call failed: {}", e);
                Err(e.into())
            }
            Err(_) => {
                record_store_error(operation, backend, "timeout");
                error!(operation, backend, "store call exceeded {:?}", self.deadline);
                Err(Error::timeout(format!(
                    "{} on {} store exceeded {:?}",
                    operation, backend, self.deadline
                )))
            }
        }
    }
}
