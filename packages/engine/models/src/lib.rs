#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot, priority target and dashboard view types.
//!
//! A [`Snapshot`] is the immutable result of one refresh cycle. Everything
//! else here is derived from it and handed to presentation as a
//! [`DashboardView`]. These types serialize to the camelCase JSON served by
//! the dashboard API; the embedded feed records keep their upstream field
//! names.

use chrono::{DateTime, Utc};
use polaris_feed_models::{
    Alert, Decision, DecisionState, Eta, FeedKind, HistoricalEvent, RiskPoint, SafeZone,
};
use serde::Serialize;

/// One atomically assembled set of the five feed results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Last successfully fetched decision. Never cleared by a failed fetch.
    pub decision: Option<Decision>,
    /// Latest alert page, most recent first.
    pub alerts: Vec<Alert>,
    /// Live risk points.
    pub risk_points: Vec<RiskPoint>,
    /// Safe zone registry.
    pub safe_zones: Vec<SafeZone>,
    /// Historical reference events.
    pub historical_events: Vec<HistoricalEvent>,
    /// Sequence number of the cycle that produced this snapshot (0 before
    /// the first cycle completes).
    pub cycle: u64,
    /// When the producing cycle completed.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Returns the decision mode, if a decision has ever been observed.
    #[must_use]
    pub fn decision_state(&self) -> Option<DecisionState> {
        self.decision.as_ref().map(|d| d.decision_state)
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
}

impl Coordinates {
    /// Formats the pair as `"Lat 19.0700, Lng 72.8800"`.
    #[must_use]
    pub fn format_location(&self) -> String {
        format!("Lat {:.4}, Lng {:.4}", self.lat, self.lng)
    }
}

impl From<&RiskPoint> for Coordinates {
    fn from(point: &RiskPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}

/// A safe zone paired with its distance to the priority point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSafeZone {
    /// The registry record, passed through unchanged.
    #[serde(flatten)]
    pub zone: SafeZone,
    /// Squared distance in degree space (see `polaris_engine::priority`).
    pub distance: f64,
}

/// Where attention is most needed right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityTarget {
    /// Formatted coordinates of the top risk point.
    pub location: String,
    /// Raw coordinates of the top risk point.
    pub coordinates: Coordinates,
    /// Risk score of the top risk point.
    pub risk_score: f64,
    /// Passed through from [`Decision::final_risk_level`].
    pub risk_level: String,
    /// Passed through from [`Decision::final_alert_severity`].
    pub alert_severity: String,
    /// Passed through from [`Decision::final_eta`].
    pub eta: Option<Eta>,
    /// Passed through from [`Decision::final_eta_confidence`].
    pub eta_confidence: Option<String>,
    /// Closest safe zones, ascending by distance.
    pub nearest_safe_zones: Vec<RankedSafeZone>,
}

/// The point the map should center on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTarget {
    /// Coordinates to focus.
    pub coordinates: Coordinates,
    /// Risk score at the focused point.
    pub risk_score: f64,
    /// Increments every time the focus moves to a new point, so a client
    /// can tell a new fly-to apart from a repeat of the current one.
    pub generation: u64,
}

/// Health of one feed across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    /// Which feed.
    pub feed: FeedKind,
    /// When the feed last answered successfully.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Error text of the most recent failure, cleared on success.
    pub last_error: Option<String>,
    /// Failures since the last success.
    pub consecutive_failures: u32,
}

impl FeedStatus {
    /// A status for a feed that has not been polled yet.
    #[must_use]
    pub const fn new(feed: FeedKind) -> Self {
        Self {
            feed,
            last_success_at: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

/// Overall connectivity to the feed API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Connectivity {
    /// No cycle has completed yet.
    #[default]
    Connecting,
    /// Every feed answered in the last cycle.
    Online,
    /// Some feeds failed in the last cycle; their fields are degraded.
    Degraded {
        /// Feeds that failed.
        failed: Vec<FeedKind>,
    },
    /// Every feed failed; the dashboard is showing stale data.
    Offline {
        /// When the first of the consecutive full failures happened.
        since: DateTime<Utc>,
    },
}

/// Everything presentation needs to draw the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Current snapshot.
    pub snapshot: Snapshot,
    /// Current priority target, if any point qualifies.
    pub priority: Option<PriorityTarget>,
    /// Current map focus, if any point qualifies.
    pub focus: Option<FocusTarget>,
    /// Connectivity indicator.
    pub connectivity: Connectivity,
    /// Per-feed health, in [`FeedKind::all`] order.
    pub feeds: Vec<FeedStatus>,
}

impl DashboardView {
    /// Returns `true` when the override banner should be shown.
    #[must_use]
    pub fn override_active(&self) -> bool {
        self.snapshot.decision_state() == Some(DecisionState::ManualOverride)
    }

    /// Label for the decision mode line of the status panel.
    #[must_use]
    pub fn decision_mode_label(&self) -> Option<&'static str> {
        self.snapshot.decision_state().map(|state| match state {
            DecisionState::Automated => "Automated",
            DecisionState::ManualOverride => "MANUAL OVERRIDE",
        })
    }
}
