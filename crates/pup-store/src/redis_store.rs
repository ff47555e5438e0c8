//! Redis-backed device store
//!
//! All device states live in one hash: field = device id, value = state.
//! The conditional write runs as a Lua script so the compare and the `HSET`
//! happen atomically on the server.

use crate::error::Result;
use crate::store::DeviceStore;
use async_trait::async_trait;
use pup_core::{Device, DeviceState};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default hash holding device states
pub const STATES_KEY: &str = "device:states";

const SAVE_IF_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], ARGV[1]) or ''
if current ~= ARGV[2] then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
return 1
"#;

pub struct RedisStore {
    conn: ConnectionManager,
    key: String,
    save_if: Script,
}

impl RedisStore {
    /// Connect to `redis://host:port/db`
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_key(url, STATES_KEY).await
    }

    /// Connect and keep states under a custom hash key
    pub async fn with_key(url: &str, key: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let key = key.into();
        info!("Connected to redis device store (hash {})", key);
        Ok(Self {
            conn,
            key,
            save_if: Script::new(SAVE_IF_SCRIPT),
        })
    }
}

#[async_trait]
impl DeviceStore for RedisStore {
    async fn get(&self, id: &str) -> Result<Option<Device>> {
        let mut conn = self.conn.clone();
        let state: Option<String> = conn.hget(&self.key, id).await?;
        Ok(state.map(|state| Device::with_state(id, state)))
    }

    async fn save(&self, device: &Device) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(&self.key, &device.id, device.state.as_str())
            .await?;
        debug!(device = %device.id, state = %device.state, "saved device");
        Ok(())
    }

    async fn save_if(&self, device: &Device, expected: &DeviceState) -> Result<bool> {
        let mut conn = self.conn.clone();
        let written: i64 = self
            .save_if
            .key(&self.key)
            .arg(&device.id)
            .arg(expected.as_str())
            .arg(device.state.as_str())
            .invoke_async(&mut conn)
            .await?;
        debug!(device = %device.id, written, "conditional save");
        Ok(written == 1)
    }

    async fn list(&self) -> Result<Vec<Device>> {
        let mut conn = self.conn.clone();
        let entries: BTreeMap<String, String> = conn.hgetall(&self.key).await?;
        Ok(entries
            .into_iter()
            .map(|(id, state)| Device::with_state(id, state))
            .collect())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
