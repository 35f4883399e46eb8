//! Raw and smoothed latency series for one stream.

use std::collections::VecDeque;

use super::record::Sample;
use super::stats::{RunningStats, StatsSnapshot};
use super::window::{MovingAveragePoint, SlidingWindow};

/// The raw samples of a stream and the moving-average point derived from
/// each, kept index-aligned.
///
/// Conceptually this is four parallel sequences (`arrival_times`,
/// `latencies`, `ma_times`, `ma_values`). They are stored as two deques of
/// pairs and only ever grow together ([`push`](Self::push)) and shrink
/// together ([`evict_front`](Self::evict_front)), so their lengths cannot
/// drift apart.
#[derive(Debug, Clone)]
pub struct SeriesState {
    samples: VecDeque<Sample>,
    points: VecDeque<MovingAveragePoint>,
    window: SlidingWindow,
    stats: RunningStats,
}

impl SeriesState {
    /// Create an empty series smoothed over `window_secs`.
    pub fn new(window_secs: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            points: VecDeque::new(),
            window: SlidingWindow::new(window_secs),
            stats: RunningStats::new(),
        }
    }

    /// Append a sample and its moving-average point.
    pub fn push(&mut self, sample: Sample) -> MovingAveragePoint {
        self.samples.push_back(sample);
        let point = self.window.admit(&self.samples, sample);
        self.points.push_back(point);
        self.stats.push(point.value);
        point
    }

    /// Drop the `n` oldest entries from every sequence.
    ///
    /// Returns the number of entries removed.
    pub fn evict_front(&mut self, n: usize) -> usize {
        let n = n.min(self.samples.len());
        if n == 0 {
            return 0;
        }
        self.window.evict(&self.samples, n);
        self.samples.drain(..n);
        self.stats.evict_front(self.points.drain(..n).map(|p| p.value));
        n
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Moving-average window in seconds.
    pub fn window_secs(&self) -> f64 {
        self.window.width()
    }

    /// Number of raw samples inside the current window.
    pub fn window_len(&self) -> usize {
        self.window.len(&self.samples)
    }

    pub fn samples(&self) -> &VecDeque<Sample> {
        &self.samples
    }

    pub fn points(&self) -> &VecDeque<MovingAveragePoint> {
        &self.points
    }

    pub fn arrival_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.arrival_time)
    }

    pub fn latencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.latency_ms)
    }

    pub fn ma_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.time)
    }

    pub fn ma_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Most recent raw sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Statistics over the retained moving-average values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::window::window_mean;

    fn sample(arrival_time: f64, latency_ms: f64) -> Sample {
        Sample {
            arrival_time,
            latency_ms,
        }
    }

    fn assert_aligned(series: &SeriesState) {
        let n = series.len();
        assert_eq!(series.arrival_times().count(), n);
        assert_eq!(series.latencies().count(), n);
        assert_eq!(series.ma_times().count(), n);
        assert_eq!(series.ma_values().count(), n);
        for (t, ma_t) in series.arrival_times().zip(series.ma_times()) {
            assert_eq!(t, ma_t);
        }
    }

    #[test]
    fn test_one_point_per_sample() {
        let mut series = SeriesState::new(30.0);
        for i in 0..50 {
            series.push(sample(f64::from(i), f64::from(i)));
        }
        assert_eq!(series.len(), 50);
        assert_eq!(series.points().len(), 50);
        assert_aligned(&series);
    }

    #[test]
    fn test_scenario_three_rows() {
        let mut series = SeriesState::new(30.0);
        series.push(sample(0.0, -5000.0));
        series.push(sample(10.0, 0.0));
        series.push(sample(20.0, 5000.0));

        let values: Vec<f64> = series.ma_values().collect();
        assert_eq!(values, vec![-5000.0, -2500.0, 0.0]);
        assert_eq!(
            series.stats(),
            StatsSnapshot {
                min: -5000.0,
                max: 0.0,
                avg: -2500.0
            }
        );
        assert_eq!(series.latest(), Some(&sample(20.0, 5000.0)));
    }

    #[test]
    fn test_evict_front_keeps_alignment_and_suffix() {
        let mut series = SeriesState::new(30.0);
        for i in 0..20 {
            series.push(sample(f64::from(i) * 10.0, f64::from(i)));
        }
        let tail: Vec<f64> = series.ma_values().skip(5).collect();

        assert_eq!(series.evict_front(5), 5);
        assert_eq!(series.len(), 15);
        assert_aligned(&series);
        assert_eq!(series.ma_values().collect::<Vec<_>>(), tail);
        assert_eq!(series.arrival_times().next(), Some(50.0));
        assert_eq!(series.stats(), StatsSnapshot::from_values(tail));
    }

    #[test]
    fn test_evict_more_than_len() {
        let mut series = SeriesState::new(30.0);
        series.push(sample(1.0, 1.0));
        assert_eq!(series.evict_front(10), 1);
        assert!(series.is_empty());
        assert_eq!(series.evict_front(1), 0);
        assert_eq!(series.stats(), StatsSnapshot::default());
    }

    #[test]
    fn test_points_after_eviction_average_retained_samples() {
        let mut series = SeriesState::new(30.0);
        for i in 0..10 {
            series.push(sample(f64::from(i), 100.0 * f64::from(i)));
        }
        series.evict_front(4);
        let point = series.push(sample(10.0, 1000.0));
        let expected = window_mean(series.samples(), 10.0, 30.0).unwrap();
        assert_eq!(point.value, expected);
        assert_eq!(series.window_len(), 7);
    }
}
