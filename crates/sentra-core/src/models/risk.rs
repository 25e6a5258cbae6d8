//! Risk assessment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single contributing suspicion factor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RiskFactor {
    /// Movement between two observed locations implies a speed no
    /// traveler reaches.
    ImpossibleTravel { kmh: f64 },
    /// Country never seen before in this session's history.
    UnknownLocation,
    NewDevice,
    UntrustedDevice,
    RepeatedFailures { count: u32 },
    AnonymizingNetwork,
    OffHoursAccess,
    JailbrokenDevice,
    EmulatorDevice,
}

/// Computed suspicion score plus the factors behind it.
///
/// Transient: recomputed per evaluation, never persisted as an entity.
/// Only the triggering events and resulting enforcement are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// In `[0, 1]`.
    pub score: f64,
    pub factors: Vec<RiskFactor>,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn none(at: DateTime<Utc>) -> Self {
        Self {
            score: 0.0,
            factors: Vec::new(),
            assessed_at: at,
        }
    }
}
