//! Policy engine.
//!
//! A pure function of policy + session/device/risk state. Checks run
//! in a fixed order and the first failure decides; they are never
//! merged or averaged. Mutations happen elsewhere, driven by the
//! returned decision.

use sentra_core::models::device::TrustLevel;
use sentra_core::models::policy::TenantPolicy;

use crate::anomaly::RiskBand;

/// Which check fired.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyTrigger {
    CountryBlocked { country: String },
    CountryNotAllowed { country: Option<String> },
    DeviceTrustRequired,
    ConcurrentLimit { limit: u32 },
    RiskQuarantine { score: f64 },
    RiskStepUp { score: f64 },
    RiskFlag { score: f64 },
}

impl PolicyTrigger {
    pub fn reason(&self) -> String {
        match self {
            PolicyTrigger::CountryBlocked { country } => format!("country {country} is blocked"),
            PolicyTrigger::CountryNotAllowed { country: Some(c) } => {
                format!("country {c} is not in the allow list")
            }
            PolicyTrigger::CountryNotAllowed { country: None } => {
                "location unknown and an allow list is configured".into()
            }
            PolicyTrigger::DeviceTrustRequired => "policy requires a trusted device".into(),
            PolicyTrigger::ConcurrentLimit { limit } => {
                format!("concurrent session limit {limit} reached")
            }
            PolicyTrigger::RiskQuarantine { score } => {
                format!("risk score {score:.2} above quarantine threshold")
            }
            PolicyTrigger::RiskStepUp { score } => {
                format!("risk score {score:.2} requires step-up authentication")
            }
            PolicyTrigger::RiskFlag { score } => format!("risk score {score:.2} flagged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnforcementDecision {
    Allow,
    Warn(Vec<PolicyTrigger>),
    StepUpAuth(PolicyTrigger),
    Terminate(PolicyTrigger),
}

/// Everything the engine is allowed to look at.
#[derive(Debug, Clone)]
pub struct PolicyContext<'a> {
    pub policy: &'a TenantPolicy,
    /// Resolved country of the current request, if known.
    pub country: Option<&'a str>,
    pub device_trust: TrustLevel,
    /// Existing active sessions, not counting the candidate.
    pub active_sessions: u32,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Check order: country block/allow list, device trust, concurrent
    /// limit, risk band. Unknown location fails closed when a geofence
    /// is configured.
    pub fn evaluate(&self, ctx: &PolicyContext<'_>) -> EnforcementDecision {
        let policy = ctx.policy;

        if let Some(country) = ctx.country {
            if policy.blocked_countries.iter().any(|c| c == country) {
                return EnforcementDecision::Terminate(PolicyTrigger::CountryBlocked {
                    country: country.to_string(),
                });
            }
        }
        if !policy.allowed_countries.is_empty() {
            match ctx.country {
                Some(country) if policy.allowed_countries.iter().any(|c| c == country) => {}
                other => {
                    return EnforcementDecision::Terminate(PolicyTrigger::CountryNotAllowed {
                        country: other.map(str::to_string),
                    });
                }
            }
        }

        if policy.require_device_trust && ctx.device_trust < TrustLevel::Trusted {
            return EnforcementDecision::Terminate(PolicyTrigger::DeviceTrustRequired);
        }

        if ctx.active_sessions >= policy.max_concurrent_sessions {
            return EnforcementDecision::Terminate(PolicyTrigger::ConcurrentLimit {
                limit: policy.max_concurrent_sessions,
            });
        }

        match RiskBand::for_score(ctx.risk_score, policy) {
            RiskBand::Quarantine => EnforcementDecision::Terminate(PolicyTrigger::RiskQuarantine {
                score: ctx.risk_score,
            }),
            RiskBand::StepUp => EnforcementDecision::StepUpAuth(PolicyTrigger::RiskStepUp {
                score: ctx.risk_score,
            }),
            RiskBand::Flag => EnforcementDecision::Warn(vec![PolicyTrigger::RiskFlag {
                score: ctx.risk_score,
            }]),
            RiskBand::Allow => EnforcementDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(policy: &'a TenantPolicy) -> PolicyContext<'a> {
        PolicyContext {
            policy,
            country: Some("FR"),
            device_trust: TrustLevel::Basic,
            active_sessions: 0,
            risk_score: 0.0,
        }
    }

    #[test]
    fn clean_context_allows() {
        let policy = TenantPolicy::default();
        assert_eq!(PolicyEngine::new().evaluate(&ctx(&policy)), EnforcementDecision::Allow);
    }

    #[test]
    fn blocked_country_decides_before_risk() {
        let policy = TenantPolicy {
            blocked_countries: vec!["FR".into()],
            ..TenantPolicy::default()
        };
        let mut c = ctx(&policy);
        c.risk_score = 0.95;

        // Country check fires first; the risk band never gets a say.
        match PolicyEngine::new().evaluate(&c) {
            EnforcementDecision::Terminate(PolicyTrigger::CountryBlocked { country }) => {
                assert_eq!(country, "FR");
            }
            other => panic!("expected CountryBlocked, got {other:?}"),
        }
    }

    #[test]
    fn unknown_country_fails_closed_with_allow_list() {
        let policy = TenantPolicy {
            allowed_countries: vec!["US".into()],
            ..TenantPolicy::default()
        };
        let mut c = ctx(&policy);
        c.country = None;

        assert!(matches!(
            PolicyEngine::new().evaluate(&c),
            EnforcementDecision::Terminate(PolicyTrigger::CountryNotAllowed { country: None })
        ));
    }

    #[test]
    fn device_trust_checked_before_concurrency() {
        let policy = TenantPolicy {
            require_device_trust: true,
            max_concurrent_sessions: 1,
            ..TenantPolicy::default()
        };
        let mut c = ctx(&policy);
        c.active_sessions = 5;

        assert!(matches!(
            PolicyEngine::new().evaluate(&c),
            EnforcementDecision::Terminate(PolicyTrigger::DeviceTrustRequired)
        ));

        c.device_trust = TrustLevel::Trusted;
        assert!(matches!(
            PolicyEngine::new().evaluate(&c),
            EnforcementDecision::Terminate(PolicyTrigger::ConcurrentLimit { limit: 1 })
        ));
    }

    #[test]
    fn risk_bands_map_to_decisions() {
        let policy = TenantPolicy::default();
        let engine = PolicyEngine::new();

        let mut c = ctx(&policy);
        c.risk_score = 0.2;
        assert_eq!(engine.evaluate(&c), EnforcementDecision::Allow);

        c.risk_score = 0.4;
        assert!(matches!(engine.evaluate(&c), EnforcementDecision::Warn(_)));

        c.risk_score = 0.7;
        assert!(matches!(
            engine.evaluate(&c),
            EnforcementDecision::StepUpAuth(PolicyTrigger::RiskStepUp { .. })
        ));

        c.risk_score = 0.9;
        assert!(matches!(
            engine.evaluate(&c),
            EnforcementDecision::Terminate(PolicyTrigger::RiskQuarantine { .. })
        ));
    }
}
