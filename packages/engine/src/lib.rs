#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Decision and priority reconciliation engine for the Polaris dashboard.
//!
//! Polls the five upstream feeds on a fixed interval, merges each cycle
//! into a single [`Snapshot`], derives the priority target and map focus
//! from it, and relays operator override commands upstream. Presentation
//! reads the result as a [`DashboardView`], either on demand or by
//! subscribing to updates.
//!
//! ```no_run
//! # async fn demo() -> Result<(), polaris_engine::EngineError> {
//! use polaris_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::from_config(EngineConfig::default())?;
//! engine.start();
//! let mut updates = engine.subscribe();
//! updates.changed().await.ok();
//! println!("{:?}", updates.borrow().priority);
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod decision;
pub mod focus;
pub mod priority;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod test_support;

use std::sync::{Arc, Mutex, PoisonError};

use polaris_engine_models::{DashboardView, PriorityTarget, Snapshot};
use polaris_feed::{FeedError, FeedSource, HttpFeedSource};
use polaris_feed_models::{DecisionState, FeedKind, OverrideCommand};
use tokio::sync::watch;

pub use aggregator::SnapshotAggregator;
pub use config::EngineConfig;
pub use decision::{DecisionStateMachine, OverrideAction};
pub use priority::{OverridePolicy, PriorityRules, compute_priority};
pub use scheduler::RefreshController;
pub use store::SnapshotStore;

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A single feed failed within a cycle. Recorded and logged, never
    /// returned on its own.
    #[error("{feed} feed failed: {source}")]
    FeedFetch {
        /// Which feed.
        feed: FeedKind,
        /// Underlying client error.
        #[source]
        source: FeedError,
    },

    /// Every feed failed; the previous snapshot is still active.
    #[error("all {} feeds failed in cycle {cycle}", failures.len())]
    FullCycleFailure {
        /// Sequence number of the failed cycle.
        cycle: u64,
        /// One [`EngineError::FeedFetch`] per feed.
        failures: Vec<Self>,
    },

    /// Upstream did not acknowledge an override command.
    #[error("override {action} rejected: {source}")]
    OverrideRejected {
        /// The command that was rejected.
        action: OverrideAction,
        /// Underlying client error.
        #[source]
        source: FeedError,
    },

    /// The feed client could not be constructed.
    #[error("feed client error: {0}")]
    Client(#[source] FeedError),

    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// The config file is not valid TOML or has the wrong shape.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A config value is out of range.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },
}

impl EngineError {
    /// The feed a [`EngineError::FeedFetch`] refers to.
    #[must_use]
    pub const fn feed(&self) -> Option<FeedKind> {
        match self {
            Self::FeedFetch { feed, .. } => Some(*feed),
            _ => None,
        }
    }
}

/// The assembled engine: store, aggregator, decision state machine and
/// refresh loop behind one handle.
pub struct Engine {
    config: EngineConfig,
    aggregator: Arc<SnapshotAggregator>,
    decisions: DecisionStateMachine,
    controller: Mutex<Option<RefreshController>>,
}

impl Engine {
    /// Builds an engine over an arbitrary feed source.
    #[must_use]
    pub fn new(config: EngineConfig, source: Arc<dyn FeedSource>) -> Self {
        let store = Arc::new(SnapshotStore::new(config.priority_rules()));
        let aggregator = Arc::new(SnapshotAggregator::new(source, store));
        let decisions = DecisionStateMachine::new(aggregator.clone());

        Self {
            config,
            aggregator,
            decisions,
            controller: Mutex::new(None),
        }
    }

    /// Builds an engine over the HTTP feed API named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Client`] if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let source = HttpFeedSource::new(
            &config.api_base_url,
            config.request_timeout(),
            config.retry_policy(),
        )
        .map_err(EngineError::Client)?;
        log::info!("Polling feeds at {}", source.base_url());

        Ok(Self::new(config, Arc::new(source)))
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts the periodic refresh loop. Does nothing if it is already
    /// running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) {
        let mut controller = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if controller.is_none() {
            *controller = Some(RefreshController::start(
                self.aggregator.clone(),
                self.config.poll_interval(),
            ));
        }
    }

    /// Returns `true` while the refresh loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RefreshController::is_running)
    }

    /// Stops the refresh loop and waits for it to exit. Safe to call more
    /// than once.
    pub async fn shutdown(&self) {
        let controller = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(controller) = controller {
            controller.stop().await;
        }
    }

    /// Latest dashboard view.
    #[must_use]
    pub fn view(&self) -> Arc<DashboardView> {
        self.aggregator.store().view()
    }

    /// Subscribes to view updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.aggregator.store().subscribe()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.aggregator.store().snapshot()
    }

    /// Current priority target.
    #[must_use]
    pub fn priority(&self) -> Option<PriorityTarget> {
        self.aggregator.store().priority()
    }

    /// Current decision mode.
    #[must_use]
    pub fn decision_state(&self) -> DecisionState {
        self.decisions.state()
    }

    /// Runs one refresh cycle now, independent of the periodic loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FullCycleFailure`] if every feed failed.
    pub async fn refresh(&self) -> Result<Snapshot, EngineError> {
        self.aggregator.refresh().await
    }

    /// Sends an override and refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OverrideRejected`] if upstream refused it.
    pub async fn apply_override(&self, command: OverrideCommand) -> Result<(), EngineError> {
        self.decisions.apply_override(command).await
    }

    /// Clears the override and refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OverrideRejected`] if upstream refused it.
    pub async fn clear_override(&self) -> Result<(), EngineError> {
        self.decisions.clear_override().await
    }
}
