//! Map auto-focus tracking.
//!
//! The map flies to the top qualifying risk point, but only when that
//! point moves: re-observing the same coordinates on a later cycle keeps
//! the current focus (and its generation) so the client does not restart
//! its fly-to. Focus is display-only and is tracked regardless of the
//! decision state.

use polaris_engine_models::{Coordinates, FocusTarget};
use polaris_feed_models::RiskPoint;

use crate::priority::qualifying_top;

/// Remembers the last focused point between cycles.
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    current: Option<FocusTarget>,
    generation: u64,
}

impl FocusTracker {
    /// Creates a tracker with no focus.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            generation: 0,
        }
    }

    /// Returns the current focus.
    #[must_use]
    pub const fn current(&self) -> Option<FocusTarget> {
        self.current
    }

    /// Feeds a new set of live points and returns the resulting focus.
    ///
    /// An empty set leaves the focus untouched. A set whose top point is
    /// below `threshold` clears it.
    pub fn observe(&mut self, points: &[RiskPoint], threshold: f64) -> Option<FocusTarget> {
        if points.is_empty() {
            return self.current;
        }

        let Some(top) = qualifying_top(points, threshold) else {
            if self.current.take().is_some() {
                log::debug!("Map focus cleared: no point at or above {threshold}");
            }
            return None;
        };

        let coordinates = Coordinates::from(top);
        let generation = match self.current {
            Some(current) if same_spot(current.coordinates, coordinates) => current.generation,
            _ => {
                self.generation += 1;
                log::info!(
                    "Map focus moved to {} (score {:.2})",
                    coordinates.format_location(),
                    top.score()
                );
                self.generation
            }
        };

        self.current = Some(FocusTarget {
            coordinates,
            risk_score: top.score(),
            generation,
        });
        self.current
    }
}

#[allow(clippy::float_cmp)]
fn same_spot(a: Coordinates, b: Coordinates) -> bool {
    a.lat == b.lat && a.lng == b.lng
}
