use std::time::Duration;

use serde::Deserialize;

use crate::geocache::{GeoCache, GeoPoint};
use crate::manifest::MediaRecord;

/// External lookup-by-IP service.
pub trait GeoProvider {
    fn lookup(&self, ip: &str) -> anyhow::Result<GeoPoint>;
}

const DB_IP_BASE_URL: &str = "https://api.db-ip.com/v2/free";

/// DB-IP free API client: one blocking request per lookup, no retries.
pub struct DbIpProvider {
    agent: ureq::Agent,
}

impl DbIpProvider {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(10))
            .build();
        Self { agent }
    }
}

impl Default for DbIpProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct DbIpResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Set instead of coordinates for reserved or malformed addresses.
    error: Option<String>,
}

impl GeoProvider for DbIpProvider {
    fn lookup(&self, ip: &str) -> anyhow::Result<GeoPoint> {
        let url = format!("{DB_IP_BASE_URL}/{ip}");
        let response: DbIpResponse = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()?
            .into_json()?;

        if let Some(error) = response.error {
            anyhow::bail!("lookup rejected for {ip}: {error}");
        }
        match (response.latitude, response.longitude) {
            (Some(latitude), Some(longitude)) => Ok(GeoPoint {
                latitude,
                longitude,
            }),
            _ => anyhow::bail!("no coordinates returned for {ip}"),
        }
    }
}

/// Resolves a media record's upload IP to coordinates through the cache,
/// hitting the external provider at most once per address across runs.
pub struct LocationResolver<'a> {
    cache: GeoCache,
    provider: &'a dyn GeoProvider,
}

impl<'a> LocationResolver<'a> {
    pub fn new(cache: GeoCache, provider: &'a dyn GeoProvider) -> Self {
        Self { cache, provider }
    }

    /// Coordinates for a record, or `None` when no IP is present or the
    /// address is (or becomes) unresolvable. A failed lookup is cached as
    /// the sentinel so later runs never retry it.
    pub fn resolve(&mut self, record: &MediaRecord) -> Option<GeoPoint> {
        let ip = record.upload_ip()?;

        if let Some(cached) = self.cache.get(ip) {
            return cached;
        }

        match self.provider.lookup(ip) {
            Ok(point) => {
                log::debug!("resolved {ip} to ({}, {})", point.latitude, point.longitude);
                self.cache.put(ip, Some(point));
                Some(point)
            }
            Err(err) => {
                log::error!("error getting location data for {ip}: {err}");
                self.cache.put(ip, None);
                None
            }
        }
    }
}
