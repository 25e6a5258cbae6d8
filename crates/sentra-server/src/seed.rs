//! Optional startup seeding of memberships, tenant policies, and the
//! geo table from a JSON file.
//!
//! Membership and policy lifecycles belong to the host application;
//! the in-memory deployment takes them as provisioned input.

use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use sentra_core::models::membership::TenantMembership;
use sentra_core::models::policy::TenantPolicy;
use sentra_store::{MemoryMembershipRepository, MemoryPolicyRepository, StaticGeoLookup};

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub memberships: Vec<TenantMembership>,
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
    #[serde(default)]
    pub geo: Vec<GeoEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PolicyEntry {
    pub tenant_id: Uuid,
    pub policy: TenantPolicy,
}

#[derive(Debug, Deserialize)]
pub struct GeoEntry {
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    #[serde(default)]
    pub anonymizing_network: bool,
}

pub fn apply(
    path: &Path,
    memberships: &MemoryMembershipRepository,
    policies: &MemoryPolicyRepository,
    geo: &StaticGeoLookup,
) -> Result<(), String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read seed file {}: {e}", path.display()))?;
    let seed: SeedFile =
        serde_json::from_str(&raw).map_err(|e| format!("invalid seed file: {e}"))?;

    let counts = (seed.memberships.len(), seed.policies.len(), seed.geo.len());
    for membership in seed.memberships {
        memberships.insert(membership);
    }
    for entry in seed.policies {
        policies.set(entry.tenant_id, entry.policy);
    }
    for entry in seed.geo {
        geo.insert(
            entry.ip.clone(),
            sentra_core::models::activity::GeoIntel {
                point: sentra_core::models::activity::GeoPoint {
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                    country: entry.country,
                },
                anonymizing_network: entry.anonymizing_network,
            },
        );
    }

    tracing::info!(
        memberships = counts.0,
        policies = counts.1,
        geo_entries = counts.2,
        "seed file applied"
    );
    Ok(())
}
