//! Min/max/average over the moving-average series.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Statistics over the retained moving-average values.
///
/// An empty series reports all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl StatsSnapshot {
    /// Compute statistics by scanning every value.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            min,
            max,
            avg: sum / count as f64,
        }
    }
}

/// Incremental statistics over a FIFO series.
///
/// Values enter at the back and leave from the front, in the same order as
/// the series they mirror. Min and max come from monotonic deques of
/// `(value, index)` pairs, so they are exact; the average comes from a
/// running sum.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    /// Sequence number of the next pushed value.
    next: u64,
    /// Sequence number of the oldest retained value.
    front: u64,
    sum: f64,
    minq: VecDeque<(f64, u64)>, // increasing values
    maxq: VecDeque<(f64, u64)>, // decreasing values
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained values.
    pub fn len(&self) -> usize {
        (self.next - self.front) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next == self.front
    }

    /// Add a value at the back.
    pub fn push(&mut self, value: f64) {
        let idx = self.next;
        self.next += 1;
        self.sum += value;

        while self.minq.back().is_some_and(|&(v, _)| v > value) {
            self.minq.pop_back();
        }
        self.minq.push_back((value, idx));

        while self.maxq.back().is_some_and(|&(v, _)| v < value) {
            self.maxq.pop_back();
        }
        self.maxq.push_back((value, idx));
    }

    /// Remove the oldest values, which must be passed in series order.
    pub fn evict_front<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            if self.is_empty() {
                break;
            }
            self.sum -= value;
            self.front += 1;
        }

        let front = self.front;
        while self.minq.front().is_some_and(|&(_, i)| i < front) {
            self.minq.pop_front();
        }
        while self.maxq.front().is_some_and(|&(_, i)| i < front) {
            self.maxq.pop_front();
        }
        if self.is_empty() {
            self.sum = 0.0;
        }
    }

    /// Current statistics; all zeros when empty.
    pub fn snapshot(&self) -> StatsSnapshot {
        match (self.minq.front(), self.maxq.front()) {
            (Some(&(min, _)), Some(&(max, _))) => StatsSnapshot {
                min,
                max,
                avg: self.sum / self.len() as f64,
            },
            _ => StatsSnapshot::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: StatsSnapshot, b: StatsSnapshot) {
        assert_eq!(a.min, b.min);
        assert_eq!(a.max, b.max);
        assert!((a.avg - b.avg).abs() < 1e-6, "avg {} vs {}", a.avg, b.avg);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(StatsSnapshot::from_values([]), StatsSnapshot::default());
        assert_eq!(RunningStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_from_values() {
        let stats = StatsSnapshot::from_values([-5000.0, -2500.0, 0.0]);
        assert_eq!(stats.min, -5000.0);
        assert_eq!(stats.max, 0.0);
        assert_eq!(stats.avg, -2500.0);
    }

    #[test]
    fn test_running_tracks_pushes() {
        let mut stats = RunningStats::new();
        for v in [3.0, 1.0, 4.0, 1.0, 5.0] {
            stats.push(v);
        }
        assert_eq!(stats.len(), 5);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                min: 1.0,
                max: 5.0,
                avg: 2.8
            }
        );
    }

    #[test]
    fn test_eviction_forgets_extremes() {
        let mut stats = RunningStats::new();
        let values = [100.0, -50.0, 7.0, 8.0, 9.0];
        for v in values {
            stats.push(v);
        }
        stats.evict_front(values[..2].iter().copied());
        assert_eq!(stats.len(), 3);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                min: 7.0,
                max: 9.0,
                avg: 8.0
            }
        );
    }

    #[test]
    fn test_evict_all_then_reuse() {
        let mut stats = RunningStats::new();
        stats.push(1.0);
        stats.push(2.0);
        stats.evict_front([1.0, 2.0]);
        assert!(stats.is_empty());
        assert_eq!(stats.snapshot(), StatsSnapshot::default());

        stats.push(6.0);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                min: 6.0,
                max: 6.0,
                avg: 6.0
            }
        );
    }

    #[test]
    fn test_running_matches_rescan_under_eviction() {
        let mut stats = RunningStats::new();
        let mut retained: VecDeque<f64> = VecDeque::new();
        for i in 0..5_000u32 {
            let v = f64::from((i * 7919) % 613) * 0.37 - 40.0;
            stats.push(v);
            retained.push_back(v);
            if retained.len() > 250 {
                let excess = retained.len() - 250;
                let gone: Vec<f64> = retained.drain(..excess).collect();
                stats.evict_front(gone);
            }
            assert_close(
                stats.snapshot(),
                StatsSnapshot::from_values(retained.iter().copied()),
            );
        }
    }
}
