//! Operator override commands.
//!
//! The engine never flips the decision mode locally. An override is a
//! write to upstream followed by an out-of-band refresh, and the mode the
//! dashboard shows is whatever the next `decision/latest` reports. A
//! rejected write therefore leaves every piece of local state untouched.

use std::fmt;
use std::sync::Arc;

use polaris_feed_models::{DecisionState, OverrideCommand};

use crate::EngineError;
use crate::aggregator::SnapshotAggregator;

/// Which override command was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    /// `override/set`
    Set,
    /// `override/clear`
    Clear,
}

impl fmt::Display for OverrideAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Set => "set",
            Self::Clear => "clear",
        })
    }
}

/// Issues override commands and reports the observed decision mode.
pub struct DecisionStateMachine {
    aggregator: Arc<SnapshotAggregator>,
}

impl DecisionStateMachine {
    #[must_use]
    pub const fn new(aggregator: Arc<SnapshotAggregator>) -> Self {
        Self { aggregator }
    }

    /// Decision mode of the current snapshot. `Automated` until a decision
    /// has been observed.
    #[must_use]
    pub fn state(&self) -> DecisionState {
        self.aggregator
            .store()
            .snapshot()
            .decision_state()
            .unwrap_or_default()
    }

    /// Asks upstream to pin the decision to the operator's values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OverrideRejected`] if upstream does not
    /// acknowledge the write. No refresh is triggered in that case.
    pub async fn apply_override(&self, command: OverrideCommand) -> Result<(), EngineError> {
        log::info!(
            "Override requested by {}: {} / {} ({})",
            command.author,
            command.risk_level,
            command.alert_severity,
            command.reason
        );

        self.aggregator
            .source()
            .set_override(&command)
            .await
            .map_err(|source| EngineError::OverrideRejected {
                action: OverrideAction::Set,
                source,
            })?;

        self.refresh_after(OverrideAction::Set).await;
        Ok(())
    }

    /// Asks upstream to resume automated decisions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OverrideRejected`] if upstream does not
    /// acknowledge the write. No refresh is triggered in that case.
    pub async fn clear_override(&self) -> Result<(), EngineError> {
        log::info!("Override clear requested");

        self.aggregator
            .source()
            .clear_override()
            .await
            .map_err(|source| EngineError::OverrideRejected {
                action: OverrideAction::Clear,
                source,
            })?;

        self.refresh_after(OverrideAction::Clear).await;
        Ok(())
    }

    async fn refresh_after(&self, action: OverrideAction) {
        match self.aggregator.refresh().await {
            Ok(snapshot) => log::info!(
                "Override {action} acknowledged, decision mode now {:?}",
                snapshot.decision_state()
            ),
            Err(e) => log::warn!("Refresh after override {action} failed: {e}"),
        }
    }
}
