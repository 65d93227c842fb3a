//! The periodic refresh task.
//!
//! One spawned task owns the interval timer and a [`CancellationToken`].
//! The first tick fires immediately. Each cycle runs to completion before
//! the next tick is awaited, so periodic cycles never overlap one another;
//! a slow cycle delays the following tick instead of bunching them up.
//! Cancellation is checked between cycles only: an in-flight cycle is
//! allowed to finish and apply its results.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::aggregator::SnapshotAggregator;

/// Handle to a running periodic refresh task.
///
/// Dropping the handle cancels the task; [`Self::stop`] additionally waits
/// for it to exit.
pub struct RefreshController {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshController {
    /// Spawns the refresh loop on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start(aggregator: Arc<SnapshotAggregator>, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(aggregator, interval, token.clone()));
        log::info!("Refresh loop started, every {interval:?}");

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Returns `true` until the loop has been cancelled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancels the loop and waits for the task to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::error!("Refresh loop task failed: {e}");
            }
        }
        log::info!("Refresh loop stopped");
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(aggregator: Arc<SnapshotAggregator>, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = aggregator.refresh().await {
            log::warn!("Periodic refresh failed: {e}");
        }
    }

    log::debug!("Refresh loop exiting");
}
