//! Sentra Risk — Device trust, anomaly scoring, tenant gating, and
//! policy enforcement.
//!
//! Everything in this crate is a decision layer: it reads state through
//! the core traits and returns typed verdicts. Mutations triggered by
//! those verdicts happen in the session store.

pub mod anomaly;
pub mod device;
pub mod policy;
pub mod tenant;

pub use anomaly::{AnomalyDetector, RiskBand};
pub use device::{DeviceEvaluation, DeviceTrustRegistry};
pub use policy::{EnforcementDecision, PolicyContext, PolicyEngine, PolicyTrigger};
pub use tenant::TenantAccessGuard;
