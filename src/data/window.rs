//! Trailing time-window moving average.
//!
//! Samples arrive in non-decreasing arrival order, so the set of samples
//! inside `[t - width, t]` only ever loses entries at its oldest end. The
//! window keeps a left index into the raw sample sequence plus a running sum:
//! each new sample adds itself, then the left edge walks forward past
//! anything that fell out. Every sample is added once and removed at most
//! once, so the cost per sample is amortized O(1).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::record::Sample;

/// Default moving-average window, in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 30.0;

/// One smoothed point of the latency series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAveragePoint {
    /// Arrival time of the sample that produced this point.
    pub time: f64,
    /// Mean latency (ms) of the retained samples in `[time - width, time]`.
    pub value: f64,
}

/// Incremental moving average over a sequence of samples owned elsewhere.
///
/// The window does not store samples. It is driven by
/// [`SeriesState`](super::series::SeriesState), which hands it the sample
/// sequence on every append and before every eviction.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    width: f64,
    /// Index of the oldest in-window sample.
    left: usize,
    sum: f64,
}

impl SlidingWindow {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            left: 0,
            sum: 0.0,
        }
    }

    /// Window width in seconds.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Number of samples currently inside the window.
    pub fn len(&self, samples: &VecDeque<Sample>) -> usize {
        samples.len().saturating_sub(self.left)
    }

    /// Account for the sample just pushed onto the back of `samples` and
    /// return its moving-average point.
    pub fn admit(&mut self, samples: &VecDeque<Sample>, newest: Sample) -> MovingAveragePoint {
        self.sum += newest.latency_ms;

        let cutoff = newest.arrival_time - self.width;
        let last = samples.len().saturating_sub(1);
        while self.left < last && samples[self.left].arrival_time < cutoff {
            self.sum -= samples[self.left].latency_ms;
            self.left += 1;
        }

        let count = samples.len() - self.left.min(last);
        if count <= 1 {
            // Re-seed so rounding error from earlier removals cannot linger.
            self.sum = newest.latency_ms;
        }

        MovingAveragePoint {
            time: newest.arrival_time,
            value: self.sum / count.max(1) as f64,
        }
    }

    /// Account for the `n` oldest samples about to be dropped from `samples`.
    ///
    /// Returns how many of them were still inside the window. Those leave the
    /// running sum, so later points average only what is retained.
    pub fn evict(&mut self, samples: &VecDeque<Sample>, n: usize) -> usize {
        let n = n.min(samples.len());
        let mut in_window = 0;
        for sample in samples.range(self.left.min(n)..n) {
            self.sum -= sample.latency_ms;
            in_window += 1;
        }

        self.left = self.left.saturating_sub(n);
        if n == samples.len() {
            self.sum = 0.0;
        }
        in_window
    }
}

/// Mean latency of the samples in `[time - width, time]`, by full rescan.
///
/// Reference for the incremental window; `None` when nothing is in range.
pub fn window_mean<'a, I>(samples: I, time: f64, width: f64) -> Option<f64>
where
    I: IntoIterator<Item = &'a Sample>,
{
    let cutoff = time - width;
    let (sum, count) = samples
        .into_iter()
        .filter(|s| s.arrival_time >= cutoff && s.arrival_time <= time)
        .fold((0.0, 0usize), |(sum, count), s| (sum + s.latency_ms, count + 1));
    (count > 0).then(|| sum / count as f64)
}
