//! In-memory implementation of [`DeviceRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::device::{Device, DeviceInfo, TrustLevel};
use sentra_core::repository::DeviceRepository;

/// Devices are tracked per user: trust in a fingerprint is a statement
/// about one user's relationship with it.
#[derive(Default)]
pub struct MemoryDeviceRepository {
    devices: RwLock<HashMap<(Uuid, String), Device>>,
}

impl MemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceRepository for MemoryDeviceRepository {
    async fn get(&self, user_id: Uuid, device_id: &str) -> SentraResult<Option<Device>> {
        Ok(self
            .devices
            .read()
            .get(&(user_id, device_id.to_string()))
            .cloned())
    }

    async fn upsert_seen(
        &self,
        user_id: Uuid,
        info: &DeviceInfo,
        at: DateTime<Utc>,
    ) -> SentraResult<Device> {
        let mut devices = self.devices.write();
        let key = (user_id, info.fingerprint.clone());
        let device = devices
            .entry(key)
            .and_modify(|d| {
                d.last_seen_at = at;
                d.platform = info.platform;
                d.capabilities = info.capabilities.clone();
            })
            .or_insert_with(|| Device {
                device_id: info.fingerprint.clone(),
                platform: info.platform,
                capabilities: info.capabilities.clone(),
                trust_level: TrustLevel::Basic,
                first_seen_at: at,
                last_seen_at: at,
            });
        Ok(device.clone())
    }

    async fn set_trust(
        &self,
        user_id: Uuid,
        device_id: &str,
        level: TrustLevel,
    ) -> SentraResult<()> {
        let mut devices = self.devices.write();
        let device = devices
            .get_mut(&(user_id, device_id.to_string()))
            .ok_or_else(|| SentraError::NotFound {
                entity: "device".into(),
                id: device_id.to_string(),
            })?;
        device.trust_level = level;
        Ok(())
    }
}
