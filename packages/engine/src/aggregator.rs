//! One refresh cycle: fan out to the five feeds, merge into the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use polaris_engine_models::Snapshot;
use polaris_feed::FeedSource;
use tokio::time::Instant;

use crate::EngineError;
use crate::store::{CycleFetch, SnapshotStore};

/// Fetches all five feeds concurrently.
///
/// The returned future resolves once every request has either answered or
/// failed, so a cycle takes as long as its slowest feed.
pub async fn fetch_all(source: &dyn FeedSource) -> CycleFetch {
    let (decision, alerts, risk_points, safe_zones, historical_events) = tokio::join!(
        source.latest_decision(),
        source.latest_alerts(),
        source.live_risk(),
        source.safe_zones(),
        source.historical_events(),
    );

    CycleFetch {
        decision,
        alerts,
        risk_points,
        safe_zones,
        historical_events,
    }
}

/// Runs refresh cycles against a [`FeedSource`] and applies them to a
/// [`SnapshotStore`].
///
/// Cycles may overlap (a periodic tick and an operator-triggered refresh);
/// each is numbered on start and applied whole when it completes.
pub struct SnapshotAggregator {
    source: Arc<dyn FeedSource>,
    store: Arc<SnapshotStore>,
    next_cycle: AtomicU64,
}

impl SnapshotAggregator {
    #[must_use]
    pub const fn new(source: Arc<dyn FeedSource>, store: Arc<SnapshotStore>) -> Self {
        Self {
            source,
            store,
            next_cycle: AtomicU64::new(1),
        }
    }

    /// The store this aggregator writes to.
    #[must_use]
    pub const fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// The feed source this aggregator reads from.
    #[must_use]
    pub const fn source(&self) -> &Arc<dyn FeedSource> {
        &self.source
    }

    /// Runs one full cycle and returns the snapshot it produced.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FullCycleFailure`] when every feed failed. The
    /// previously active snapshot stays in place in that case.
    pub async fn refresh(&self) -> Result<Snapshot, EngineError> {
        let cycle = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        log::debug!("Refresh cycle {cycle} started");

        let fetch = fetch_all(self.source.as_ref()).await;
        let result = self.store.apply(cycle, fetch, Utc::now());

        log::debug!(
            "Refresh cycle {cycle} finished in {:.2?}",
            start.elapsed()
        );
        result
    }
}
