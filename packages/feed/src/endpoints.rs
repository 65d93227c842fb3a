//! Compile-time registry of feed API paths.
//!
//! The paths live in `endpoints.toml` at the package root and are embedded
//! at compile time, so a deployment behind a different prefix only needs
//! a different `api_base_url`.

use polaris_feed_models::FeedKind;
use serde::Deserialize;

const ENDPOINTS_TOML: &str = include_str!("../endpoints.toml");

/// Paths of every feed operation, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoints {
    /// Latest decision.
    pub decision: String,
    /// Latest alert page.
    pub alerts: String,
    /// Live risk points.
    pub live_risk: String,
    /// Safe zone registry.
    pub safe_zones: String,
    /// Historical event log.
    pub historical_events: String,
    /// Override apply.
    pub override_set: String,
    /// Override clear.
    pub override_clear: String,
}

impl Endpoints {
    /// Returns the embedded endpoint registry.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    #[must_use]
    pub fn embedded() -> Self {
        toml::de::from_str(ENDPOINTS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded endpoints.toml: {e}"))
    }

    /// Returns the read path for the given feed.
    #[must_use]
    pub fn read_path(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::Decision => &self.decision,
            FeedKind::Alerts => &self.alerts,
            FeedKind::LiveRisk => &self.live_risk,
            FeedKind::SafeZones => &self.safe_zones,
            FeedKind::HistoricalEvents => &self.historical_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_parses() {
        let endpoints = Endpoints::embedded();
        assert_eq!(endpoints.decision, "decision/latest");
        assert_eq!(endpoints.override_clear, "override/clear");
    }

    #[test]
    fn every_feed_has_a_distinct_path() {
        let endpoints = Endpoints::embedded();
        let mut paths: Vec<&str> = FeedKind::all()
            .iter()
            .map(|k| endpoints.read_path(*k))
            .collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), FeedKind::all().len());
        assert_eq!(endpoints.read_path(FeedKind::LiveRisk), "map/live-risk");
    }
}
