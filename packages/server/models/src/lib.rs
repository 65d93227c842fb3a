#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the Polaris dashboard server.
//!
//! These wrap the engine's view types with the few fields the browser
//! dashboard needs precomputed, and define the override command payloads.

use polaris_engine_models::DashboardView;
use polaris_feed_models::{AlertSeverity, DecisionState, OverrideCommand, RiskLevel};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Whether the refresh loop is running.
    pub polling: bool,
}

/// The full dashboard state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDashboard {
    /// Engine view, flattened into the top level.
    #[serde(flatten)]
    pub view: DashboardView,
    /// Whether the manual override banner is shown.
    pub override_active: bool,
    /// `"Automated"` or `"MANUAL OVERRIDE"`, absent before the first
    /// decision arrives.
    pub decision_mode: Option<String>,
}

impl From<DashboardView> for ApiDashboard {
    fn from(view: DashboardView) -> Self {
        Self {
            override_active: view.override_active(),
            decision_mode: view.decision_mode_label().map(str::to_string),
            view,
        }
    }
}

/// Body of `POST /api/override`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOverrideRequest {
    /// Risk level to assert.
    pub risk_level: RiskLevel,
    /// Alert severity to assert.
    pub alert_severity: AlertSeverity,
    /// Operator's reason.
    #[serde(default)]
    pub reason: String,
    /// Operator name. Falls back to the configured default when absent.
    pub author: Option<String>,
}

impl ApiOverrideRequest {
    /// Converts the request into an engine command.
    #[must_use]
    pub fn into_command(self, default_author: &str) -> OverrideCommand {
        OverrideCommand::new(
            self.risk_level,
            self.alert_severity,
            &self.reason,
            self.author.as_deref(),
            default_author,
        )
    }
}

/// Result of an override command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommandResult {
    /// Always `true`; failures use [`ApiError`].
    pub accepted: bool,
    /// Decision mode observed after the follow-up refresh.
    pub decision_state: DecisionState,
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps any displayable error.
    #[must_use]
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
