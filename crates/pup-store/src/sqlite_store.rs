//! SQLite-based device store
//!
//! One row per device. Uses SQLx for async database operations.

use crate::error::Result;
use crate::store::DeviceStore;
use async_trait::async_trait;
use pup_core::{Device, DeviceState};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite-backed device store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given database URL
    ///
    /// URL format: `sqlite:///path/to/db.sqlite?mode=rwc` or `sqlite::memory:`
    pub async fn new(url: &str) -> Result<Self> {
        info!("Initializing SQLite device store: {}", url);

        let mut options = SqlitePoolOptions::new().max_connections(5);
        if url.contains(":memory:") {
            // Every connection to `:memory:` opens its own database, so keep exactly one alive.
            options = options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = options.connect(url).await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn initialize_schema(&self) -> Result<()> {
        debug!("Initializing devices table");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DeviceStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Device>> {
        let row = sqlx::query("SELECT id, state FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let id: String = row.get("id");
            let state: String = row.get("state");
            Device::with_state(id, state)
        }))
    }

    async fn save(&self, device: &Device) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO devices (id, state) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET state = excluded.state
            "#,
        )
        .bind(&device.id)
        .bind(device.state.as_str())
        .execute(&self.pool)
        .await?;

        debug!(device = %device.id, state = %device.state, "saved device");
        Ok(())
    }

    async fn save_if(&self, device: &Device, expected: &DeviceState) -> Result<bool> {
        let result = match expected {
            // No row yet, or a row still holding the empty state.
            DeviceState::Unset => {
                sqlx::query(
                    r#"
                    INSERT INTO devices (id, state) VALUES (?, ?)
                    ON CONFLICT(id) DO UPDATE SET state = excluded.state
                    WHERE devices.state = ''
                    "#,
                )
                .bind(&device.id)
                .bind(device.state.as_str())
                .execute(&self.pool)
                .await?
            }
            DeviceState::Set(prior) => {
                sqlx::query("UPDATE devices SET state = ? WHERE id = ? AND state = ?")
                    .bind(device.state.as_str())
                    .bind(&device.id)
                    .bind(prior)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> Result<Vec<Device>> {
        let rows = sqlx::query("SELECT id, state FROM devices ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let state: String = row.get("state");
                Device::with_state(id, state)
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_get_and_save() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.get("rex").await.unwrap().is_none());

        store.save(&Device::with_state("rex", "awake")).await.unwrap();
        store.save(&Device::with_state("rex", "asleep")).await.unwrap();
        assert_eq!(
            store.get("rex").await.unwrap(),
            Some(Device::with_state("rex", "asleep"))
        );
    }

    #[tokio::test]
    async fn test_sqlite_save_if_from_unset() {
        let store = SqliteStore::in_memory().await.unwrap();
        let awake = Device::with_state("rex", "awake");

        assert!(store.save_if(&awake, &DeviceState::Unset).await.unwrap());
        assert!(!store
            .save_if(&Device::with_state("rex", "asleep"), &DeviceState::Unset)
            .await
            .unwrap());
        assert_eq!(store.get("rex").await.unwrap(), Some(awake));
    }

    #[tokio::test]
    async fn test_sqlite_save_if_over_empty_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.save(&Device::new("rex")).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![Device::new("rex")]);

        let awake = Device::with_state("rex", "awake");
        assert!(store.save_if(&awake, &DeviceState::Unset).await.unwrap());
        assert_eq!(store.get("rex").await.unwrap(), Some(awake));
    }

    #[tokio::test]
    async fn test_sqlite_save_if_from_set() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.save(&Device::with_state("rex", "awake")).await.unwrap();

        let asleep = Device::with_state("rex", "asleep");
        assert!(!store
            .save_if(&asleep, &DeviceState::from("down"))
            .await
            .unwrap());
        assert!(store
            .save_if(&asleep, &DeviceState::from("awake"))
            .await
            .unwrap());
        assert_eq!(store.get("rex").await.unwrap(), Some(asleep));
    }

    #[tokio::test]
    async fn test_sqlite_save_if_set_requires_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        let written = store
            .save_if(&Device::with_state("ghost", "up"), &DeviceState::from("down"))
            .await
            .unwrap();
        assert!(!written);
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_list() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.save(&Device::with_state("b", "up")).await.unwrap();
        store.save(&Device::with_state("a", "down")).await.unwrap();
        assert_eq!(
            store.list().await.unwrap(),
            vec![
                Device::with_state("a", "down"),
                Device::with_state("b", "up")
            ]
        );
    }
}
