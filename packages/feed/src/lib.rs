#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feed source trait and HTTP client for the Polaris early-warning API.
//!
//! The dashboard engine talks to upstream only through [`FeedSource`]:
//! five read operations polled every cycle and two write operations for
//! operator overrides. [`HttpFeedSource`] binds the trait to the REST API
//! using the paths in the embedded [`endpoints`] registry.

pub mod endpoints;
pub mod http;
pub mod retry;

use async_trait::async_trait;
use polaris_feed_models::{Alert, Decision, HistoricalEvent, OverrideCommand, RiskPoint, SafeZone};

pub use http::HttpFeedSource;
pub use retry::RetryPolicy;

/// Errors that can occur while talking to the feed API.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// The configured base URL could not be parsed.
    #[error("Invalid feed URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser error text.
        message: String,
    },
}

/// The upstream feed API as seen by the dashboard engine.
///
/// Failure modes are opaque to callers: a timeout, an error status and a
/// malformed payload all surface as [`FeedError`]. Sequence feeds that
/// answer with an absent body yield an empty `Vec`.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// `GET decision/latest`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request or decoding fails.
    async fn latest_decision(&self) -> Result<Decision, FeedError>;

    /// `GET alerts/latest`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request or decoding fails.
    async fn latest_alerts(&self) -> Result<Vec<Alert>, FeedError>;

    /// `GET map/live-risk`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request or decoding fails.
    async fn live_risk(&self) -> Result<Vec<RiskPoint>, FeedError>;

    /// `GET map/safe-zones`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request or decoding fails.
    async fn safe_zones(&self) -> Result<Vec<SafeZone>, FeedError>;

    /// `GET map/historical-events`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request or decoding fails.
    async fn historical_events(&self) -> Result<Vec<HistoricalEvent>, FeedError>;

    /// `POST override/set`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if upstream did not acknowledge the override.
    async fn set_override(&self, command: &OverrideCommand) -> Result<(), FeedError>;

    /// `POST override/clear`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if upstream did not acknowledge the clear.
    async fn clear_override(&self) -> Result<(), FeedError>;
}
