//! Bounded retention for a [`SeriesState`].

use tracing::debug;

use super::series::SeriesState;
use crate::error::EngineError;

/// Default number of points kept per series.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Keeps a series at or under a fixed number of entries by dropping the
/// oldest ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    capacity: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RetentionPolicy {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check that the capacity can hold a full moving-average window.
    ///
    /// Evicting samples that are still inside the window changes the next
    /// point's value, so the capacity must exceed twice the number of samples
    /// a window can hold at `expected_rate_hz`.
    pub fn validate(&self, window_secs: f64, expected_rate_hz: f64) -> Result<(), EngineError> {
        let per_window = (window_secs * expected_rate_hz).ceil();
        if !per_window.is_finite() || per_window < 0.0 {
            return Err(EngineError::Config(format!(
                "cannot size retention for a {window_secs}s window at {expected_rate_hz} samples/s"
            )));
        }
        let required = (per_window as usize).max(1).saturating_mul(2);
        if self.capacity <= required {
            return Err(EngineError::Config(format!(
                "capacity {} is too small: a {}s window at {} samples/s needs more than {}",
                self.capacity, window_secs, expected_rate_hz, required
            )));
        }
        Ok(())
    }

    /// Evict the oldest entries of `series` beyond the capacity.
    ///
    /// Returns the number of entries evicted from each sequence.
    pub fn enforce(&self, series: &mut SeriesState) -> usize {
        let excess = series.len().saturating_sub(self.capacity);
        if excess == 0 {
            return 0;
        }
        let evicted = series.evict_front(excess);
        debug!(evicted, retained = series.len(), "retention eviction");
        evicted
    }
}
