//! Priority targeting: which point needs attention first, and where the
//! nearest shelters are.
//!
//! Selection is a stable left fold over the points keeping the highest
//! score (a missing score counts as zero, ties keep the earlier point).
//! The winner only becomes a target if its score reaches the threshold.
//!
//! Safe zones are ranked by *squared Euclidean distance in raw lat/lng
//! degrees*, not by geodesic distance. For a search radius of a few
//! kilometres the ordering matches haversine closely enough, and switching
//! metrics would change tie-break behaviour, so it stays this way unless
//! the ranking contract changes.

use polaris_engine_models::{Coordinates, PriorityTarget, RankedSafeZone};
use polaris_feed_models::{Decision, RiskPoint, SafeZone};
use serde::Deserialize;

/// Default minimum score (inclusive) for a target.
pub const PRIORITY_THRESHOLD: f64 = 0.45;

/// Default number of safe zones listed with a target.
pub const NEAREST_SAFE_ZONE_COUNT: usize = 2;

/// Whether automated targeting runs while an operator override is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicy {
    /// No target during `MANUAL_OVERRIDE`, so automated "priority
    /// attention" never contradicts the operator.
    #[default]
    Suppress,
    /// Compute targets regardless of the decision state.
    ComputeAlways,
}

/// Tunables for [`compute_priority`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityRules {
    /// Minimum score (inclusive).
    pub threshold: f64,
    /// Maximum number of nearest safe zones.
    pub nearest_count: usize,
    /// Behaviour during manual override.
    pub override_policy: OverridePolicy,
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self {
            threshold: PRIORITY_THRESHOLD,
            nearest_count: NEAREST_SAFE_ZONE_COUNT,
            override_policy: OverridePolicy::Suppress,
        }
    }
}

/// Returns the highest-scoring point, first one wins on ties.
#[must_use]
pub fn select_top(points: &[RiskPoint]) -> Option<&RiskPoint> {
    points
        .iter()
        .reduce(|best, p| if p.score() > best.score() { p } else { best })
}

/// Returns the top point if it reaches `threshold`.
#[must_use]
pub fn qualifying_top(points: &[RiskPoint], threshold: f64) -> Option<&RiskPoint> {
    select_top(points).filter(|top| top.score() >= threshold)
}

/// Squared distance in degree space.
#[must_use]
pub fn squared_distance(zone: &SafeZone, point: &RiskPoint) -> f64 {
    (zone.lat - point.lat).powi(2) + (zone.lng - point.lng).powi(2)
}

/// The `count` safe zones closest to `point`, ascending.
///
/// Equal distances keep registry order.
#[must_use]
pub fn nearest_safe_zones(
    safe_zones: &[SafeZone],
    point: &RiskPoint,
    count: usize,
) -> Vec<RankedSafeZone> {
    let mut ranked: Vec<RankedSafeZone> = safe_zones
        .iter()
        .map(|zone| RankedSafeZone {
            zone: zone.clone(),
            distance: squared_distance(zone, point),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked.truncate(count);
    ranked
}

/// Computes the current priority target.
///
/// Returns `None` when there is no decision, no points, the top point is
/// below the threshold, or (under [`OverridePolicy::Suppress`]) the
/// decision is a manual override. An empty safe-zone registry only leaves
/// [`PriorityTarget::nearest_safe_zones`] empty.
#[must_use]
pub fn compute_priority(
    points: &[RiskPoint],
    decision: Option<&Decision>,
    safe_zones: &[SafeZone],
    rules: &PriorityRules,
) -> Option<PriorityTarget> {
    let decision = decision?;

    if rules.override_policy == OverridePolicy::Suppress && decision.is_manual_override() {
        return None;
    }

    let top = qualifying_top(points, rules.threshold)?;
    let coordinates = Coordinates::from(top);

    Some(PriorityTarget {
        location: coordinates.format_location(),
        coordinates,
        risk_score: top.score(),
        risk_level: decision.final_risk_level.clone(),
        alert_severity: decision.final_alert_severity.clone(),
        eta: decision.final_eta.clone(),
        eta_confidence: decision.final_eta_confidence.clone(),
        nearest_safe_zones: nearest_safe_zones(safe_zones, top, rules.nearest_count),
    })
}
