//! REST binding of [`FeedSource`].

use std::time::Duration;

use async_trait::async_trait;
use polaris_feed_models::{
    Alert, Decision, FeedKind, HistoricalEvent, OverrideCommand, RiskPoint, SafeZone,
};
use serde::de::DeserializeOwned;

use crate::endpoints::Endpoints;
use crate::retry::{self, RetryPolicy};
use crate::{FeedError, FeedSource};

/// Feed source backed by the Polaris REST API.
///
/// The underlying [`reqwest::Client`] is reused across all polls to keep
/// connections pooled.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

impl HttpFeedSource {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] if `base_url` is not an absolute
    /// URL, or [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, FeedError> {
        reqwest::Url::parse(base_url).map_err(|e| FeedError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("polaris/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints: Endpoints::embedded(),
            retry,
        })
    }

    /// API root, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL for a registry path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_one<T: DeserializeOwned>(&self, kind: FeedKind) -> Result<T, FeedError> {
        let url = self.url_for(self.endpoints.read_path(kind));
        let body = retry::send_json(|| self.client.get(&url), self.retry).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetches a sequence feed. A `null` or empty body is an empty page.
    async fn get_many<T: DeserializeOwned>(&self, kind: FeedKind) -> Result<Vec<T>, FeedError> {
        let url = self.url_for(self.endpoints.read_path(kind));
        let body = retry::send_json(|| self.client.get(&url), self.retry).await?;
        let items: Option<Vec<T>> = serde_json::from_value(body)?;
        Ok(items.unwrap_or_default())
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn latest_decision(&self) -> Result<Decision, FeedError> {
        self.get_one(FeedKind::Decision).await
    }

    async fn latest_alerts(&self) -> Result<Vec<Alert>, FeedError> {
        self.get_many(FeedKind::Alerts).await
    }

    async fn live_risk(&self) -> Result<Vec<RiskPoint>, FeedError> {
        self.get_many(FeedKind::LiveRisk).await
    }

    async fn safe_zones(&self) -> Result<Vec<SafeZone>, FeedError> {
        self.get_many(FeedKind::SafeZones).await
    }

    async fn historical_events(&self) -> Result<Vec<HistoricalEvent>, FeedError> {
        self.get_many(FeedKind::HistoricalEvents).await
    }

    // Upstream records a new override on every `override/set`, so writes
    // are sent exactly once and a failure goes back to the operator.
    async fn set_override(&self, command: &OverrideCommand) -> Result<(), FeedError> {
        let url = self.url_for(&self.endpoints.override_set);
        retry::send_ack(|| self.client.post(&url).json(command), RetryPolicy::NONE).await
    }

    async fn clear_override(&self) -> Result<(), FeedError> {
        let url = self.url_for(&self.endpoints.override_clear);
        retry::send_ack(|| self.client.post(&url), RetryPolicy::NONE).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use polaris_feed_models::{AlertSeverity, RiskLevel};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves `503` to every request and counts them.
    async fn unavailable_upstream() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 503 Service Unavailable\r\n\
                          content-length: 0\r\n\
                          connection: close\r\n\r\n",
                    )
                    .await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    fn retrying() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn override_writes_are_sent_once() {
        let (base_url, hits) = unavailable_upstream().await;
        let source = HttpFeedSource::new(&base_url, Duration::from_secs(5), retrying()).unwrap();
        let command = OverrideCommand::new(
            RiskLevel::Imminent,
            AlertSeverity::Emergency,
            "Levee breach",
            None,
            "Authority Dashboard",
        );

        let err = source.set_override(&command).await.unwrap_err();
        assert!(matches!(err, FeedError::Status { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let err = source.clear_override().await.unwrap_err();
        assert!(matches!(err, FeedError::Status { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reads_are_retried_on_server_errors() {
        let (base_url, hits) = unavailable_upstream().await;
        let source = HttpFeedSource::new(&base_url, Duration::from_secs(5), retrying()).unwrap();

        let err = source.safe_zones().await.unwrap_err();

        assert!(matches!(err, FeedError::Status { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn joins_base_url_and_paths() {
        let source = HttpFeedSource::new(
            "http://127.0.0.1:8000/api/",
            Duration::from_secs(5),
            RetryPolicy::NONE,
        )
        .unwrap();

        assert_eq!(
            source.url_for("decision/latest"),
            "http://127.0.0.1:8000/api/decision/latest"
        );
        assert_eq!(
            source.url_for("/map/safe-zones"),
            "http://127.0.0.1:8000/api/map/safe-zones"
        );
    }

    #[test]
    fn rejects_relative_base_url() {
        let err = HttpFeedSource::new("api/v1", Duration::from_secs(5), RetryPolicy::NONE)
            .unwrap_err();
        assert!(matches!(err, FeedError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn unreachable_upstream_surfaces_as_http_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let source = HttpFeedSource::new(
            "http://127.0.0.1:9",
            Duration::from_millis(500),
            RetryPolicy::NONE,
        )
        .unwrap();

        let err = source.live_risk().await.unwrap_err();
        assert!(matches!(err, FeedError::Http(_)));
    }
}
