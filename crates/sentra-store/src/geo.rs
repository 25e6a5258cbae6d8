//! Fixed-table geolocation lookup.
//!
//! Stands in for the injected geolocation / IP-reputation service in
//! tests and local development.

use std::collections::HashMap;

use parking_lot::RwLock;

use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::activity::{GeoIntel, GeoPoint};
use sentra_core::repository::GeoLookup;

#[derive(Default)]
pub struct StaticGeoLookup {
    table: RwLock<HashMap<String, GeoIntel>>,
    unavailable: RwLock<bool>,
}

impl StaticGeoLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ip: impl Into<String>, intel: GeoIntel) {
        self.table.write().insert(ip.into(), intel);
    }

    pub fn insert_point(
        &self,
        ip: impl Into<String>,
        latitude: f64,
        longitude: f64,
        country: impl Into<String>,
    ) {
        self.insert(
            ip,
            GeoIntel {
                point: GeoPoint {
                    latitude,
                    longitude,
                    country: country.into(),
                },
                anonymizing_network: false,
            },
        );
    }

    /// Simulate an outage of the external service.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }
}

impl GeoLookup for StaticGeoLookup {
    async fn locate(&self, ip: &str) -> SentraResult<Option<GeoIntel>> {
        if *self.unavailable.read() {
            return Err(SentraError::ExternalDependencyUnavailable {
                dependency: "geolocation".into(),
            });
        }
        Ok(self.table.read().get(ip).cloned())
    }
}
