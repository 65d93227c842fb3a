//! The single owner of dashboard state.
//!
//! Each completed refresh cycle is merged here under one lock: feed fields
//! are replaced, the priority target and map focus are recomputed from the
//! merged values before the lock is released, and the resulting
//! [`DashboardView`] is published on a watch channel. Overlapping cycles
//! therefore resolve last-writer-wins per field, in completion order, and
//! no reader ever sees a snapshot paired with a stale target.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use polaris_engine_models::{
    Connectivity, DashboardView, FeedStatus, PriorityTarget, Snapshot,
};
use polaris_feed::FeedError;
use polaris_feed_models::{Alert, Decision, FeedKind, HistoricalEvent, RiskPoint, SafeZone};
use tokio::sync::watch;

use crate::EngineError;
use crate::focus::FocusTracker;
use crate::priority::{PriorityRules, compute_priority};

/// Raw results of one fan-out over the five feeds.
#[derive(Debug)]
pub struct CycleFetch {
    /// `decision/latest`
    pub decision: Result<Decision, FeedError>,
    /// `alerts/latest`
    pub alerts: Result<Vec<Alert>, FeedError>,
    /// `map/live-risk`
    pub risk_points: Result<Vec<RiskPoint>, FeedError>,
    /// `map/safe-zones`
    pub safe_zones: Result<Vec<SafeZone>, FeedError>,
    /// `map/historical-events`
    pub historical_events: Result<Vec<HistoricalEvent>, FeedError>,
}

struct StoreInner {
    snapshot: Snapshot,
    priority: Option<PriorityTarget>,
    focus: FocusTracker,
    connectivity: Connectivity,
    feeds: Vec<FeedStatus>,
}

impl StoreInner {
    fn view(&self) -> DashboardView {
        DashboardView {
            snapshot: self.snapshot.clone(),
            priority: self.priority.clone(),
            focus: self.focus.current(),
            connectivity: self.connectivity.clone(),
            feeds: self.feeds.clone(),
        }
    }

    fn feed_mut(&mut self, kind: FeedKind) -> Option<&mut FeedStatus> {
        self.feeds.iter_mut().find(|f| f.feed == kind)
    }

    fn recompute_priority(&mut self, rules: &PriorityRules) {
        self.priority = compute_priority(
            &self.snapshot.risk_points,
            self.snapshot.decision.as_ref(),
            &self.snapshot.safe_zones,
            rules,
        );
    }
}

/// Shared dashboard state, updated by refresh cycles and read by
/// presentation.
pub struct SnapshotStore {
    rules: PriorityRules,
    inner: Mutex<StoreInner>,
    view_tx: watch::Sender<Arc<DashboardView>>,
}

impl SnapshotStore {
    /// Creates an empty store using the given targeting rules.
    #[must_use]
    pub fn new(rules: PriorityRules) -> Self {
        let inner = StoreInner {
            snapshot: Snapshot::default(),
            priority: None,
            focus: FocusTracker::new(),
            connectivity: Connectivity::Connecting,
            feeds: FeedKind::all().iter().copied().map(FeedStatus::new).collect(),
        };
        let (view_tx, _) = watch::channel(Arc::new(inner.view()));

        Self {
            rules,
            inner: Mutex::new(inner),
            view_tx,
        }
    }

    /// Targeting rules in effect.
    #[must_use]
    pub const fn rules(&self) -> &PriorityRules {
        &self.rules
    }

    /// Latest published view.
    #[must_use]
    pub fn view(&self) -> Arc<DashboardView> {
        self.view_tx.borrow().clone()
    }

    /// Subscribes to every future view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.view_tx.subscribe()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    /// Current priority target.
    #[must_use]
    pub fn priority(&self) -> Option<PriorityTarget> {
        self.lock().priority.clone()
    }

    /// Merges one cycle's results.
    ///
    /// A failed decision fetch keeps the previous decision; any other
    /// failed feed becomes an empty sequence. If every feed failed the
    /// previous snapshot stays active untouched and only the connectivity
    /// indicator changes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FullCycleFailure`] when all five feeds
    /// failed. Partial failures are logged and recorded per feed but are
    /// not errors.
    pub fn apply(
        &self,
        cycle: u64,
        fetch: CycleFetch,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, EngineError> {
        let mut failures = Vec::new();
        let mut inner = self.lock();
        let mut next = inner.snapshot.clone();

        match fetch.decision {
            Ok(decision) => next.decision = Some(decision),
            Err(source) => failures.push(EngineError::FeedFetch {
                feed: FeedKind::Decision,
                source,
            }),
        }
        next.alerts = sequence(FeedKind::Alerts, fetch.alerts, &mut failures);
        next.risk_points = sequence(FeedKind::LiveRisk, fetch.risk_points, &mut failures);
        next.safe_zones = sequence(FeedKind::SafeZones, fetch.safe_zones, &mut failures);
        next.historical_events = sequence(
            FeedKind::HistoricalEvents,
            fetch.historical_events,
            &mut failures,
        );

        let failed: Vec<FeedKind> = failures.iter().filter_map(EngineError::feed).collect();
        for kind in FeedKind::all() {
            let Some(status) = inner.feed_mut(*kind) else {
                continue;
            };
            if let Some(err) = failures.iter().find(|e| e.feed() == Some(*kind)) {
                log::warn!("Cycle {cycle}: {err}");
                status.last_error = Some(err.to_string());
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            } else {
                status.last_success_at = Some(now);
                status.last_error = None;
                status.consecutive_failures = 0;
            }
        }

        if failed.len() == FeedKind::all().len() {
            let since = match inner.connectivity {
                Connectivity::Offline { since } => since,
                _ => now,
            };
            inner.connectivity = Connectivity::Offline { since };
            self.publish(&inner);
            drop(inner);

            log::error!("Cycle {cycle}: every feed failed, keeping previous snapshot");
            return Err(EngineError::FullCycleFailure { cycle, failures });
        }

        next.cycle = cycle;
        next.refreshed_at = Some(now);
        let state = &mut *inner;
        state.snapshot = next;
        state.recompute_priority(&self.rules);
        state
            .focus
            .observe(&state.snapshot.risk_points, self.rules.threshold);
        state.connectivity = if failed.is_empty() {
            Connectivity::Online
        } else {
            Connectivity::Degraded { failed }
        };

        self.publish(&inner);
        Ok(inner.snapshot.clone())
    }

    fn publish(&self, inner: &StoreInner) {
        self.view_tx.send_replace(Arc::new(inner.view()));
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unwraps a sequence feed result, substituting an empty page on failure.
fn sequence<T>(
    feed: FeedKind,
    result: Result<Vec<T>, FeedError>,
    failures: &mut Vec<EngineError>,
) -> Vec<T> {
    result.unwrap_or_else(|source| {
        failures.push(EngineError::FeedFetch { feed, source });
        Vec::new()
    })
}
