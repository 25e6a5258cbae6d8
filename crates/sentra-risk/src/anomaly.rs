//! Anomaly detection over session activity.
//!
//! Scoring is a weighted sum of independent factors and is fully
//! deterministic: the same ordered event history with the same policy
//! thresholds always produces the same assessment. The geolocation
//! lookup is consulted before scoring, never during it.

use std::sync::Arc;

use chrono::Timelike;

use sentra_core::error::SentraResult;
use sentra_core::models::activity::{ActivityEvent, ActivityKind, GeoIntel, GeoPoint};
use sentra_core::models::policy::TenantPolicy;
use sentra_core::models::risk::{RiskAssessment, RiskFactor};
use sentra_core::repository::GeoLookup;

/// Faster than any commercial traveler moves.
pub const MAX_PLAUSIBLE_SPEED_KMH: f64 = 900.0;

/// Location jumps under this distance never count as travel.
const MIN_TRAVEL_DISTANCE_KM: f64 = 50.0;

/// Window for counting rapid validation failures.
const FAILURE_WINDOW_SECS: i64 = 300;
const FAILURE_COUNT_THRESHOLD: u32 = 3;

/// History size below which no off-hours baseline exists.
const MIN_EVENTS_FOR_HOUR_BASELINE: usize = 8;

const W_IMPOSSIBLE_TRAVEL: f64 = 0.9;
const W_UNKNOWN_LOCATION: f64 = 0.35;
const W_NEW_DEVICE: f64 = 0.3;
const W_UNTRUSTED_DEVICE: f64 = 0.2;
const W_REPEATED_FAILURES: f64 = 0.4;
const W_ANONYMIZING_NETWORK: f64 = 0.25;
const W_OFF_HOURS: f64 = 0.15;
const W_JAILBROKEN: f64 = 0.5;
const W_EMULATOR: f64 = 0.4;

/// Which response a score demands, per the tenant's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Allow,
    Flag,
    StepUp,
    Quarantine,
}

impl RiskBand {
    pub fn for_score(score: f64, policy: &TenantPolicy) -> Self {
        if score >= policy.risk_quarantine_threshold {
            RiskBand::Quarantine
        } else if score >= policy.risk_step_up_threshold {
            RiskBand::StepUp
        } else if score >= policy.risk_flag_threshold {
            RiskBand::Flag
        } else {
            RiskBand::Allow
        }
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6_371.0;
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

fn weight_of(factor: &RiskFactor) -> f64 {
    match factor {
        RiskFactor::ImpossibleTravel { .. } => W_IMPOSSIBLE_TRAVEL,
        RiskFactor::UnknownLocation => W_UNKNOWN_LOCATION,
        RiskFactor::NewDevice => W_NEW_DEVICE,
        RiskFactor::UntrustedDevice => W_UNTRUSTED_DEVICE,
        RiskFactor::RepeatedFailures { .. } => W_REPEATED_FAILURES,
        RiskFactor::AnonymizingNetwork => W_ANONYMIZING_NETWORK,
        RiskFactor::OffHoursAccess => W_OFF_HOURS,
        RiskFactor::JailbrokenDevice => W_JAILBROKEN,
        RiskFactor::EmulatorDevice => W_EMULATOR,
    }
}

/// Scores session activity for compromise signals.
pub struct AnomalyDetector<G: GeoLookup> {
    geo: Arc<G>,
}

impl<G: GeoLookup> AnomalyDetector<G> {
    pub fn new(geo: Arc<G>) -> Self {
        Self { geo }
    }

    /// Resolve an IP through the injected lookup. `None` when the
    /// address is unknown; scoring then treats the location as absent.
    pub async fn resolve(&self, ip: &str) -> SentraResult<Option<GeoIntel>> {
        self.geo.locate(ip).await
    }

    /// Score one event against the session's ordered history.
    ///
    /// `seed` carries factors established outside the event stream
    /// (device evaluation results). No clock, no randomness.
    pub fn score(
        &self,
        history: &[ActivityEvent],
        event: &ActivityEvent,
        seed: &[RiskFactor],
    ) -> RiskAssessment {
        let mut factors: Vec<RiskFactor> = seed.to_vec();

        if let Some(location) = &event.location {
            match last_located(history) {
                Some(previous) => {
                    if let Some(kmh) = implausible_speed(previous, event, location) {
                        factors.push(RiskFactor::ImpossibleTravel { kmh });
                    } else if !country_seen(history, &location.country) {
                        factors.push(RiskFactor::UnknownLocation);
                    }
                }
                // No baseline yet; a first location is not an anomaly.
                None => {}
            }
        }

        let failures = recent_failures(history, event);
        if failures >= FAILURE_COUNT_THRESHOLD {
            factors.push(RiskFactor::RepeatedFailures { count: failures });
        }

        if event.anonymizing_network {
            factors.push(RiskFactor::AnonymizingNetwork);
        }

        if is_off_hours(history, event) {
            factors.push(RiskFactor::OffHoursAccess);
        }

        let score = factors.iter().map(weight_of).sum::<f64>() + event.risk_contribution;
        RiskAssessment {
            score: score.clamp(0.0, 1.0),
            factors,
            assessed_at: event.timestamp,
        }
    }
}

fn last_located(history: &[ActivityEvent]) -> Option<&ActivityEvent> {
    history.iter().rev().find(|e| e.location.is_some())
}

fn implausible_speed(
    previous: &ActivityEvent,
    event: &ActivityEvent,
    location: &GeoPoint,
) -> Option<f64> {
    let prev_location = previous.location.as_ref()?;
    let km = haversine_km(prev_location, location);
    if km < MIN_TRAVEL_DISTANCE_KM {
        return None;
    }
    let elapsed_secs = (event.timestamp - previous.timestamp).num_seconds().max(1) as f64;
    let kmh = km / (elapsed_secs / 3_600.0);
    (kmh > MAX_PLAUSIBLE_SPEED_KMH).then_some(kmh)
}

fn country_seen(history: &[ActivityEvent], country: &str) -> bool {
    history
        .iter()
        .filter_map(|e| e.location.as_ref())
        .any(|l| l.country == country)
}

fn recent_failures(history: &[ActivityEvent], event: &ActivityEvent) -> u32 {
    let window_start = event.timestamp - chrono::Duration::seconds(FAILURE_WINDOW_SECS);
    let mut count = history
        .iter()
        .filter(|e| e.kind == ActivityKind::ValidationFailure && e.timestamp >= window_start)
        .count() as u32;
    if event.kind == ActivityKind::ValidationFailure {
        count += 1;
    }
    count
}

/// True when the user has an established hourly pattern and this event
/// falls in an hour never seen before.
fn is_off_hours(history: &[ActivityEvent], event: &ActivityEvent) -> bool {
    if history.len() < MIN_EVENTS_FOR_HOUR_BASELINE {
        return false;
    }
    let hour = event.timestamp.hour();
    !history.iter().any(|e| e.timestamp.hour() == hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use sentra_store::StaticGeoLookup;
    use uuid::Uuid;

    fn detector() -> AnomalyDetector<StaticGeoLookup> {
        AnomalyDetector::new(Arc::new(StaticGeoLookup::new()))
    }

    fn event_at(
        session_id: Uuid,
        ts: chrono::DateTime<Utc>,
        kind: ActivityKind,
        location: Option<GeoPoint>,
    ) -> ActivityEvent {
        ActivityEvent {
            session_id,
            timestamp: ts,
            kind,
            location,
            ip_address: None,
            risk_contribution: 0.0,
            anonymizing_network: false,
        }
    }

    fn paris() -> GeoPoint {
        GeoPoint {
            latitude: 48.8566,
            longitude: 2.3522,
            country: "FR".into(),
        }
    }

    fn new_york() -> GeoPoint {
        GeoPoint {
            latitude: 40.7128,
            longitude: -74.0060,
            country: "US".into(),
        }
    }

    #[test]
    fn haversine_paris_new_york() {
        let km = haversine_km(&paris(), &new_york());
        assert!((5_800.0..6_000.0).contains(&km), "got {km}");
    }

    #[test]
    fn benign_event_scores_zero() {
        let d = detector();
        let policy = TenantPolicy::default();
        let sid = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let history = vec![event_at(sid, t0, ActivityKind::Login, Some(paris()))];
        let event = event_at(
            sid,
            t0 + Duration::minutes(10),
            ActivityKind::ApiRequest,
            Some(paris()),
        );

        let assessment = d.score(&history, &event, &[]);
        assert_eq!(assessment.score, 0.0);
        assert!(assessment.factors.is_empty());
        assert_eq!(RiskBand::for_score(assessment.score, &policy), RiskBand::Allow);
    }

    #[test]
    fn impossible_travel_quarantines() {
        let d = detector();
        let policy = TenantPolicy::default();
        let sid = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let history = vec![event_at(sid, t0, ActivityKind::Login, Some(paris()))];
        // 5 minutes later, ~5,800 km away.
        let event = event_at(
            sid,
            t0 + Duration::minutes(5),
            ActivityKind::ApiRequest,
            Some(new_york()),
        );

        let assessment = d.score(&history, &event, &[]);
        assert!(assessment.score > 0.85, "score {}", assessment.score);
        assert!(
            assessment
                .factors
                .iter()
                .any(|f| matches!(f, RiskFactor::ImpossibleTravel { kmh } if *kmh > MAX_PLAUSIBLE_SPEED_KMH))
        );
        assert_eq!(
            RiskBand::for_score(assessment.score, &policy),
            RiskBand::Quarantine
        );
    }

    #[test]
    fn slow_travel_is_new_country_only() {
        let d = detector();
        let policy = TenantPolicy::default();
        let sid = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let history = vec![event_at(sid, t0, ActivityKind::Login, Some(paris()))];
        // Nine hours: a normal transatlantic flight.
        let event = event_at(
            sid,
            t0 + Duration::hours(9),
            ActivityKind::ApiRequest,
            Some(new_york()),
        );

        let assessment = d.score(&history, &event, &[]);
        assert!(assessment.factors.contains(&RiskFactor::UnknownLocation));
        assert_eq!(RiskBand::for_score(assessment.score, &policy), RiskBand::Flag);
    }

    #[test]
    fn rapid_failures_flag() {
        let d = detector();
        let policy = TenantPolicy::default();
        let sid = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let history: Vec<ActivityEvent> = (0..3)
            .map(|i| {
                event_at(
                    sid,
                    t0 + Duration::seconds(i * 30),
                    ActivityKind::ValidationFailure,
                    None,
                )
            })
            .collect();
        let event = event_at(
            sid,
            t0 + Duration::seconds(120),
            ActivityKind::ValidationFailure,
            None,
        );

        let assessment = d.score(&history, &event, &[]);
        assert!(
            assessment
                .factors
                .iter()
                .any(|f| matches!(f, RiskFactor::RepeatedFailures { count } if *count >= 3))
        );
        assert!(assessment.score >= policy.risk_flag_threshold);
    }

    #[test]
    fn scoring_is_deterministic() {
        let d = detector();
        let sid = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let history = vec![event_at(sid, t0, ActivityKind::Login, Some(paris()))];
        let event = event_at(
            sid,
            t0 + Duration::minutes(5),
            ActivityKind::ApiRequest,
            Some(new_york()),
        );

        let a = d.score(&history, &event, &[RiskFactor::NewDevice]);
        let b = d.score(&history, &event, &[RiskFactor::NewDevice]);
        assert_eq!(a.score, b.score);
        assert_eq!(a.factors, b.factors);
    }

    #[test]
    fn off_hours_needs_a_baseline() {
        let d = detector();
        let sid = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

        // Eight business-hours events establish the pattern.
        let history: Vec<ActivityEvent> = (0..8)
            .map(|i| {
                event_at(
                    sid,
                    t0 + Duration::hours(i % 8),
                    ActivityKind::ApiRequest,
                    None,
                )
            })
            .collect();

        let night = event_at(
            sid,
            Utc.with_ymd_and_hms(2026, 3, 3, 3, 0, 0).unwrap(),
            ActivityKind::ApiRequest,
            None,
        );
        let assessment = d.score(&history, &night, &[]);
        assert!(assessment.factors.contains(&RiskFactor::OffHoursAccess));

        // Two events are not a pattern.
        let short = &history[..2];
        let assessment = d.score(short, &night, &[]);
        assert!(!assessment.factors.contains(&RiskFactor::OffHoursAccess));
    }

    #[test]
    fn tenant_thresholds_move_the_bands() {
        let mut policy = TenantPolicy::default();
        policy.risk_quarantine_threshold = 0.3;
        assert_eq!(RiskBand::for_score(0.35, &policy), RiskBand::Quarantine);

        let relaxed = TenantPolicy {
            risk_flag_threshold: 0.5,
            ..TenantPolicy::default()
        };
        assert_eq!(RiskBand::for_score(0.35, &relaxed), RiskBand::Allow);
    }
}
