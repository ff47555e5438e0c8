use crate::error::{Result, StoreError};
use crate::memory_store::MemoryStore;
use crate::redis_store::RedisStore;
use crate::sqlite_store::SqliteStore;
use async_trait::async_trait;
use pup_core::{Device, DeviceState};
use std::sync::Arc;
use tracing::info;

/// Durable lookup and storage of device records keyed by device id
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Current record, or `None` if the id has never been written
    async fn get(&self, id: &str) -> Result<Option<Device>>;

    /// Persist the full record, overwriting any prior value
    async fn save(&self, device: &Device) -> Result<()>;

    /// Persist the record only if the stored state still equals `expected`.
    /// A missing record counts as `Unset`. Returns whether the write happened.
    async fn save_if(&self, device: &Device, expected: &DeviceState) -> Result<bool>;

    /// Every stored record, ordered by id
    async fn list(&self) -> Result<Vec<Device>>;

    /// Backend label for logs and metrics
    fn backend(&self) -> &'static str;
}

/// Open a backend from a URL: `memory://`, `redis://`, `rediss://` or `sqlite:`
pub async fn open_store(url: &str) -> Result<Arc<dyn DeviceStore>> {
    let store: Arc<dyn DeviceStore> = match url.split_once(':').map(|(scheme, _)| scheme) {
        Some("memory") => Arc::new(MemoryStore::new()),
        Some("redis") | Some("rediss") => Arc::new(RedisStore::new(url).await?),
        Some("sqlite") => Arc::new(SqliteStore::new(url).await?),
        _ => return Err(StoreError::UnsupportedUrl(url.to_string())),
    };
    info!("Opened {} device store", store.backend());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store("memory://").await.unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_open_sqlite_store() {
        let store = open_store("sqlite::memory:").await.unwrap();
        assert_eq!(store.backend(), "sqlite");
    }

    #[tokio::test]
    async fn test_unknown_scheme_rejected() {
        for url in ["postgres://localhost/db", "nonsense"] {
            let err = open_store(url).await.err().unwrap();
            assert!(matches!(err, StoreError::UnsupportedUrl(_)), "{url}");
        }
    }
}
