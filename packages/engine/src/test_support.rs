//! A scripted in-memory [`FeedSource`] for engine tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use polaris_feed::{FeedError, FeedSource};
use polaris_feed_models::{
    Alert, Decision, DecisionState, Eta, HistoricalEvent, OverrideCommand, RiskPoint, SafeZone,
};

pub fn point(lat: f64, lng: f64, score: Option<f64>) -> RiskPoint {
    RiskPoint {
        lat,
        lng,
        risk_score: score,
    }
}

pub fn zone(name: &str, lat: f64, lng: f64) -> SafeZone {
    SafeZone {
        lat,
        lng,
        name: name.to_string(),
        zone_id: None,
        zone_type: "school".to_string(),
        capacity: Some(250),
    }
}

pub fn decision(state: DecisionState) -> Decision {
    Decision {
        final_risk_level: "WARNING".to_string(),
        final_alert_severity: "ALERT".to_string(),
        final_eta: Some(Eta::Minutes(20.0)),
        final_eta_confidence: Some("MEDIUM".to_string()),
        final_confidence: Some(0.72),
        justification: Some("Rapid escalation".to_string()),
        decision_state: state,
    }
}

pub fn failure() -> FeedError {
    FeedError::Status {
        status: 503,
        url: "http://feeds.test/".to_string(),
    }
}

/// What each feed answers. `None` fails the feed.
#[derive(Debug, Clone)]
pub struct Script {
    pub decision: Option<Decision>,
    pub alerts: Option<Vec<Alert>>,
    pub risk_points: Option<Vec<RiskPoint>>,
    pub safe_zones: Option<Vec<SafeZone>>,
    pub historical_events: Option<Vec<HistoricalEvent>>,
}

impl Script {
    pub fn healthy() -> Self {
        Self {
            decision: Some(decision(DecisionState::Automated)),
            alerts: Some(Vec::new()),
            risk_points: Some(vec![point(19.07, 72.88, Some(0.9))]),
            safe_zones: Some(vec![zone("Zone1", 19.08, 72.89), zone("Zone2", 19.20, 73.00)]),
            historical_events: Some(Vec::new()),
        }
    }

    pub const fn offline() -> Self {
        Self {
            decision: None,
            alerts: None,
            risk_points: None,
            safe_zones: None,
            historical_events: None,
        }
    }
}

pub struct ScriptedFeed {
    script: Mutex<Script>,
    latency_ms: AtomicU64,
    reject_writes: bool,
    cycles: AtomicUsize,
    writes: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            latency_ms: AtomicU64::new(0),
            reject_writes: false,
            cycles: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Script::healthy())
    }

    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Latency applied to reads that start from now on.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    #[must_use]
    pub const fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    pub fn set_script(&self, script: Script) {
        *self.lock() = script;
    }

    /// Number of decision fetches, one per refresh cycle.
    pub fn cycles(&self) -> usize {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Number of write attempts, accepted or not.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers with the script as it was when the request started.
    async fn answer<T>(&self, pick: impl FnOnce(&Script) -> Option<T>) -> Result<T, FeedError> {
        let answer = pick(&self.lock());
        let latency = Duration::from_millis(self.latency_ms.load(Ordering::SeqCst));
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        answer.ok_or_else(failure)
    }

    fn write(&self, state: DecisionState) -> Result<(), FeedError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes {
            return Err(failure());
        }
        let mut script = self.lock();
        let current = script
            .decision
            .get_or_insert_with(|| decision(DecisionState::Automated));
        current.decision_state = state;
        drop(script);
        Ok(())
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn latest_decision(&self) -> Result<Decision, FeedError> {
        self.cycles.fetch_add(1, Ordering::SeqCst);
        self.answer(|s| s.decision.clone()).await
    }

    async fn latest_alerts(&self) -> Result<Vec<Alert>, FeedError> {
        self.answer(|s| s.alerts.clone()).await
    }

    async fn live_risk(&self) -> Result<Vec<RiskPoint>, FeedError> {
        self.answer(|s| s.risk_points.clone()).await
    }

    async fn safe_zones(&self) -> Result<Vec<SafeZone>, FeedError> {
        self.answer(|s| s.safe_zones.clone()).await
    }

    async fn historical_events(&self) -> Result<Vec<HistoricalEvent>, FeedError> {
        self.answer(|s| s.historical_events.clone()).await
    }

    async fn set_override(&self, _command: &OverrideCommand) -> Result<(), FeedError> {
        self.write(DecisionState::ManualOverride)
    }

    async fn clear_override(&self) -> Result<(), FeedError> {
        self.write(DecisionState::Automated)
    }
}
