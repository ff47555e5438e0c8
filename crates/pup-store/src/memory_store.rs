//! In-process device store
//!
//! Backs tests and single-instance deployments using `memory://`. Records are
//! lost on restart.

use crate::error::Result;
use crate::store::DeviceStore;
use async_trait::async_trait;
use pup_core::{Device, DeviceState};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<BTreeMap<String, DeviceState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Device>> {
        let states = self.states.read().await;
        Ok(states
            .get(id)
            .map(|state| Device::with_state(id, state.clone())))
    }

    async fn save(&self, device: &Device) -> Result<()> {
        self.states
            .write()
            .await
            .insert(device.id.clone(), device.state.clone());
        Ok(())
    }

    async fn save_if(&self, device: &Device, expected: &DeviceState) -> Result<bool> {
        let mut states = self.states.write().await;
        let current = states.get(&device.id).cloned().unwrap_or_default();
        if &current != expected {
            return Ok(false);
        }
        states.insert(device.id.clone(), device.state.clone());
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Device>> {
        let states = self.states.read().await;
        Ok(states
            .iter()
            .map(|(id, state)| Device::with_state(id.as_str(), state.clone()))
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("rex").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = MemoryStore::new();
        store.save(&Device::with_state("rex", "awake")).await.unwrap();
        store.save(&Device::with_state("rex", "asleep")).await.unwrap();
        assert_eq!(
            store.get("rex").await.unwrap(),
            Some(Device::with_state("rex", "asleep"))
        );
    }

    #[tokio::test]
    async fn test_save_if_checks_prior_state() {
        let store = MemoryStore::new();
        let awake = Device::with_state("rex", "awake");

        assert!(store.save_if(&awake, &DeviceState::Unset).await.unwrap());
        assert!(!store
            .save_if(&Device::with_state("rex", "asleep"), &DeviceState::Unset)
            .await
            .unwrap());
        assert_eq!(store.get("rex").await.unwrap(), Some(awake));
    }

    #[tokio::test]
    async fn test_list_sorted_by_id() {
        let store = MemoryStore::new();
        store.save(&Device::with_state("zed", "up")).await.unwrap();
        store.save(&Device::with_state("abe", "down")).await.unwrap();
        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["abe", "zed"]);
    }
}
