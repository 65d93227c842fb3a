#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Wire data model for the Polaris early-warning feeds.
//!
//! These are the records returned by the five read endpoints of the feed
//! API (decision, alerts, live risk, safe zones, historical events) plus
//! the typed override command sent to the write endpoints. Field names
//! follow the upstream JSON exactly.

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A live risk reading at a single coordinate.
///
/// Points carry no identity across refreshes: two points at the same
/// coordinates on different cycles are unrelated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPoint {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Modeled hazard likelihood in `[0, 1]`, if the model produced one.
    #[serde(default)]
    pub risk_score: Option<f64>,
}

impl RiskPoint {
    /// Returns the risk score, treating a missing score as `0.0`.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.risk_score.unwrap_or(0.0)
    }
}

/// A registered shelter or evacuation point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeZone {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Display name (e.g., "Andheri Sports Complex"). Empty for
    /// detector-generated zones.
    #[serde(default)]
    pub name: String,
    /// Identifier of a detector-generated zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// Kind of facility (school, stadium, community hall, ...).
    #[serde(rename = "type", default)]
    pub zone_type: String,
    /// Number of people the zone can hold, if known.
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl SafeZone {
    /// Name to show for this zone, falling back to its `zone_id`.
    #[must_use]
    pub fn label(&self) -> &str {
        match &self.zone_id {
            Some(id) if self.name.is_empty() => id,
            _ => &self.name,
        }
    }
}

/// A past cloudburst or flash-flood record shown for reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Place name.
    #[serde(default)]
    pub location: String,
    /// Date of the event as reported upstream.
    #[serde(default)]
    pub date: String,
    /// Severity label as reported upstream.
    #[serde(default)]
    pub severity: String,
    /// Where the record came from (news archive, IMD bulletin, ...).
    #[serde(default)]
    pub source: String,
}

/// Whether the live decision was produced by the automated pipeline or
/// authored by an operator.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionState {
    /// The automated risk pipeline is in control.
    #[default]
    Automated,
    /// An authority has replaced the automated assessment.
    ManualOverride,
}

/// Upstream also reports pipeline stages (`MONITOR`, `ACTIONABLE`, ...) in
/// this field. Anything other than `MANUAL_OVERRIDE`, including `null`,
/// reads as [`DecisionState::Automated`].
impl<'de> Deserialize<'de> for DecisionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some(state) if state.eq_ignore_ascii_case("MANUAL_OVERRIDE") => Self::ManualOverride,
            _ => Self::Automated,
        })
    }
}

/// Estimated time until impact.
///
/// Upstream sends either a number of minutes or a label such as
/// `"UNKNOWN"`; both are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Eta {
    /// Minutes until expected impact.
    Minutes(f64),
    /// Free-form label.
    Label(String),
}

impl std::fmt::Display for Eta {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minutes(m) if m.is_finite() && m.fract().abs() < f64::EPSILON => {
                write!(f, "{}", *m as i64)
            }
            Self::Minutes(m) => write!(f, "{m}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// The authoritative system-wide decision.
///
/// Exactly one is live at a time and it is replaced wholesale on every
/// successful fetch. Risk and severity fields are kept as the upstream
/// strings; the dashboard never re-validates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Final risk level (e.g., `"WARNING"`).
    #[serde(default)]
    pub final_risk_level: String,
    /// Final alert severity (e.g., `"ALERT"`).
    #[serde(default)]
    pub final_alert_severity: String,
    /// Estimated time to impact.
    #[serde(default)]
    pub final_eta: Option<Eta>,
    /// Confidence label for the ETA (e.g., `"HIGH"`).
    #[serde(default)]
    pub final_eta_confidence: Option<String>,
    /// Overall system confidence in `[0, 1]`.
    #[serde(default)]
    pub final_confidence: Option<f64>,
    /// Human-readable reasoning behind the decision.
    #[serde(default)]
    pub justification: Option<String>,
    /// Who is in control of the decision.
    #[serde(default)]
    pub decision_state: DecisionState,
}

impl Decision {
    /// Returns `true` when an operator override is in effect.
    #[must_use]
    pub fn is_manual_override(&self) -> bool {
        self.decision_state == DecisionState::ManualOverride
    }
}

/// One entry from the alert dispatch log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// When the alert was dispatched (ISO 8601, as sent upstream).
    pub timestamp: String,
    /// Delivery channel (`PUSH_SMS`, `SMS_SIREN`, ...). `None` for
    /// informational entries that were not dispatched.
    #[serde(default)]
    pub channel: Option<String>,
    /// Severity label.
    #[serde(default)]
    pub severity: String,
    /// Message body sent to recipients.
    #[serde(default)]
    pub message: String,
}

/// Risk level an operator may assign through an override.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RiskLevel {
    /// No hazard expected.
    Safe,
    /// Conditions worth monitoring.
    Watch,
    /// Hazard likely.
    Warning,
    /// Hazard expected shortly.
    Imminent,
}

impl RiskLevel {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Safe, Self::Watch, Self::Warning, Self::Imminent]
    }
}

/// Alert severity an operator may assign through an override.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AlertSeverity {
    /// Informational only, nothing is dispatched.
    Info,
    /// In-app advisory.
    Advisory,
    /// SMS and siren.
    Alert,
    /// Every channel.
    Emergency,
}

impl AlertSeverity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Info, Self::Advisory, Self::Alert, Self::Emergency]
    }
}

/// Body of an override-set request.
///
/// Built by the presentation layer and handed to the engine as a value;
/// the engine never reads form widgets itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideCommand {
    /// Risk level the operator is asserting.
    pub risk_level: RiskLevel,
    /// Alert severity the operator is asserting.
    pub alert_severity: AlertSeverity,
    /// Free-text reason recorded with the override.
    pub reason: String,
    /// Who issued the override.
    pub author: String,
}

impl OverrideCommand {
    /// Builds a command, trimming the reason and author.
    ///
    /// A blank `author` falls back to `default_author`.
    #[must_use]
    pub fn new(
        risk_level: RiskLevel,
        alert_severity: AlertSeverity,
        reason: &str,
        author: Option<&str>,
        default_author: &str,
    ) -> Self {
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(default_author);

        Self {
            risk_level,
            alert_severity,
            reason: reason.trim().to_string(),
            author: author.to_string(),
        }
    }
}

/// The five read feeds polled each cycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedKind {
    /// `GET decision/latest`
    Decision,
    /// `GET alerts/latest`
    Alerts,
    /// `GET map/live-risk`
    LiveRisk,
    /// `GET map/safe-zones`
    SafeZones,
    /// `GET map/historical-events`
    HistoricalEvents,
}

impl FeedKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Decision,
            Self::Alerts,
            Self::LiveRisk,
            Self::SafeZones,
            Self::HistoricalEvents,
        ]
    }
}
