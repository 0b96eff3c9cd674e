//! In-memory device directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::DeviceDirectory;

#[derive(Debug, Clone, Default)]
pub struct InMemoryDeviceDirectory {
    devices: Arc<RwLock<HashMap<String, UserId>>>,
}

impl InMemoryDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, device_id: impl Into<String>, owner: UserId) {
        self.devices.write().await.insert(device_id.into(), owner);
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryDeviceDirectory {
    async fn owner_of(&self, device_id: &str) -> Result<Option<UserId>, DomainError> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_registered_devices_only() {
        let directory = InMemoryDeviceDirectory::new();
        let owner = UserId::new("u-7").unwrap();
        directory.register("dev-1", owner.clone()).await;

        assert_eq!(directory.owner_of("dev-1").await.unwrap(), Some(owner));
        assert_eq!(directory.owner_of("dev-2").await.unwrap(), None);
    }
}
