//! Device trust registry.
//!
//! Trust in a device fingerprint moves only through the explicit
//! grant/revoke operations here. Logging in repeatedly from a device
//! changes nothing; an attacker cannot become trusted by persistence.

use std::sync::Arc;

use uuid::Uuid;

use sentra_core::clock::Clock;
use sentra_core::error::SentraResult;
use sentra_core::models::device::{
    CAP_HARDWARE_ATTESTATION, Device, DeviceInfo, TrustLevel,
};
use sentra_core::models::risk::RiskFactor;
use sentra_core::repository::DeviceRepository;

/// Outcome of evaluating a device at authentication time.
#[derive(Debug, Clone)]
pub struct DeviceEvaluation {
    pub device: Device,
    /// Trust after applying attestation signals for this request; a
    /// jailbroken or emulated device is untrusted for the request even
    /// if its stored level is higher.
    pub effective_trust: TrustLevel,
    pub risk_factors: Vec<RiskFactor>,
    pub first_seen: bool,
}

pub struct DeviceTrustRegistry<D: DeviceRepository> {
    devices: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<D: DeviceRepository> DeviceTrustRegistry<D> {
    pub fn new(devices: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self { devices, clock }
    }

    /// Look up or register the device and flag its risk factors.
    ///
    /// The jailbreak/emulator signals arrive from the caller (an
    /// external attestation collaborator produces them).
    pub async fn evaluate(
        &self,
        user_id: Uuid,
        info: &DeviceInfo,
    ) -> SentraResult<DeviceEvaluation> {
        let first_seen = self.devices.get(user_id, &info.fingerprint).await?.is_none();
        let device = self
            .devices
            .upsert_seen(user_id, info, self.clock.now())
            .await?;

        let mut risk_factors = Vec::new();
        if first_seen {
            risk_factors.push(RiskFactor::NewDevice);
        }
        if info.jailbroken {
            risk_factors.push(RiskFactor::JailbrokenDevice);
        }
        if info.emulator {
            risk_factors.push(RiskFactor::EmulatorDevice);
        }
        if device.trust_level == TrustLevel::Untrusted {
            risk_factors.push(RiskFactor::UntrustedDevice);
        }

        let effective_trust = if info.jailbroken || info.emulator {
            TrustLevel::Untrusted
        } else {
            device.trust_level
        };

        Ok(DeviceEvaluation {
            device,
            effective_trust,
            risk_factors,
            first_seen,
        })
    }

    /// Stored record for a device, if it has been seen before.
    pub async fn stored(&self, user_id: Uuid, device_id: &str) -> SentraResult<Option<Device>> {
        self.devices.get(user_id, device_id).await
    }

    /// Stored trust level; a device with no record is untrusted.
    pub async fn stored_trust(&self, user_id: Uuid, device_id: &str) -> SentraResult<TrustLevel> {
        Ok(self
            .devices
            .get(user_id, device_id)
            .await?
            .map(|d| d.trust_level)
            .unwrap_or(TrustLevel::Untrusted))
    }

    /// Explicit trust grant, user- or admin-initiated only.
    ///
    /// Reaches `HighlyTrusted` only when the device advertises a
    /// hardware attestation capability.
    pub async fn grant_trust(&self, user_id: Uuid, device_id: &str) -> SentraResult<TrustLevel> {
        let device = self
            .devices
            .get(user_id, device_id)
            .await?
            .ok_or_else(|| sentra_core::SentraError::NotFound {
                entity: "device".into(),
                id: device_id.to_string(),
            })?;

        let level = if device
            .capabilities
            .iter()
            .any(|c| c == CAP_HARDWARE_ATTESTATION)
        {
            TrustLevel::HighlyTrusted
        } else {
            TrustLevel::Trusted
        };
        self.devices.set_trust(user_id, device_id, level).await?;
        tracing::info!(%user_id, device_id, ?level, "device trust granted");
        Ok(level)
    }

    pub async fn revoke_trust(&self, user_id: Uuid, device_id: &str) -> SentraResult<()> {
        self.devices
            .set_trust(user_id, device_id, TrustLevel::Untrusted)
            .await?;
        tracing::info!(%user_id, device_id, "device trust revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sentra_core::models::device::Platform;
    use sentra_store::{FrozenClock, MemoryDeviceRepository};

    fn registry() -> DeviceTrustRegistry<MemoryDeviceRepository> {
        let clock = Arc::new(FrozenClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        DeviceTrustRegistry::new(Arc::new(MemoryDeviceRepository::new()), clock)
    }

    fn phone() -> DeviceInfo {
        DeviceInfo {
            fingerprint: "fp-phone-1".into(),
            platform: Platform::Ios,
            capabilities: vec![CAP_HARDWARE_ATTESTATION.into()],
            jailbroken: false,
            emulator: false,
        }
    }

    #[tokio::test]
    async fn first_sight_registers_at_basic() {
        let registry = registry();
        let user = Uuid::new_v4();

        let eval = registry.evaluate(user, &phone()).await.unwrap();
        assert!(eval.first_seen);
        assert_eq!(eval.device.trust_level, TrustLevel::Basic);
        assert!(eval.risk_factors.contains(&RiskFactor::NewDevice));
    }

    #[tokio::test]
    async fn repeated_logins_never_escalate_trust() {
        let registry = registry();
        let user = Uuid::new_v4();

        for _ in 0..20 {
            registry.evaluate(user, &phone()).await.unwrap();
        }
        let eval = registry.evaluate(user, &phone()).await.unwrap();
        assert_eq!(eval.device.trust_level, TrustLevel::Basic);
        assert!(!eval.first_seen);
    }

    #[tokio::test]
    async fn explicit_grant_raises_trust() {
        let registry = registry();
        let user = Uuid::new_v4();
        registry.evaluate(user, &phone()).await.unwrap();

        let level = registry.grant_trust(user, "fp-phone-1").await.unwrap();
        // Hardware attestation capability present.
        assert_eq!(level, TrustLevel::HighlyTrusted);

        registry.revoke_trust(user, "fp-phone-1").await.unwrap();
        let eval = registry.evaluate(user, &phone()).await.unwrap();
        assert_eq!(eval.device.trust_level, TrustLevel::Untrusted);
        assert!(eval.risk_factors.contains(&RiskFactor::UntrustedDevice));
    }

    #[tokio::test]
    async fn jailbreak_signal_caps_effective_trust() {
        let registry = registry();
        let user = Uuid::new_v4();
        registry.evaluate(user, &phone()).await.unwrap();
        registry.grant_trust(user, "fp-phone-1").await.unwrap();

        let mut info = phone();
        info.jailbroken = true;
        let eval = registry.evaluate(user, &info).await.unwrap();
        assert_eq!(eval.effective_trust, TrustLevel::Untrusted);
        assert!(eval.risk_factors.contains(&RiskFactor::JailbrokenDevice));
        // Stored trust is untouched by a single bad attestation.
        assert_eq!(eval.device.trust_level, TrustLevel::HighlyTrusted);
    }

    #[tokio::test]
    async fn grant_for_unknown_device_fails() {
        let registry = registry();
        let err = registry
            .grant_trust(Uuid::new_v4(), "never-seen")
            .await
            .unwrap_err();
        assert!(matches!(err, sentra_core::SentraError::NotFound { .. }));
    }
}
