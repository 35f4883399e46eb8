//! The ingestion pipeline for one stream.
//!
//! A [`LatencyEngine`] owns a [`LineSource`], the stream's [`SeriesState`]
//! and its [`RetentionPolicy`]. Each call to [`LatencyEngine::drain`] pulls
//! every complete row that is available, runs each batch through
//! parse → window → stats → retention, and publishes one fresh immutable
//! [`SeriesSnapshot`] on a watch channel.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::data::record::{self, RecordFormat, Sample, MIN_FIELDS};
use crate::data::retention::RetentionPolicy;
use crate::data::series::SeriesState;
use crate::data::stats::StatsSnapshot;
use crate::data::window::MovingAveragePoint;
use crate::error::EngineError;
use crate::source::{LineSource, TailReader};

/// Whether a drain is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// Pulling rows through the pipeline.
    Draining,
}

/// The most recent raw sample, for "latest" displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatestSample {
    pub arrival_time: f64,
    pub latency_ms: f64,
}

impl From<&Sample> for LatestSample {
    fn from(s: &Sample) -> Self {
        Self {
            arrival_time: s.arrival_time,
            latency_ms: s.latency_ms,
        }
    }
}

/// Published state of a stream after a completed drain.
///
/// Snapshots are immutable and shared behind an [`Arc`]; a consumer can hold
/// one for as long as it likes without seeing a partial update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesSnapshot {
    pub source: String,
    pub ma_times: Vec<f64>,
    pub ma_values: Vec<f64>,
    pub stats: StatsSnapshot,
    pub latest: Option<LatestSample>,
    pub window_secs: f64,
    pub samples_total: u64,
    pub malformed_total: u64,
    pub evicted_total: u64,
    pub read_errors: u64,
    pub last_error: Option<String>,
    /// Incremented on every publish.
    pub generation: u64,
    #[serde(skip)]
    pub updated_at: Option<Instant>,
}

impl SeriesSnapshot {
    pub fn len(&self) -> usize {
        self.ma_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ma_times.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<MovingAveragePoint> {
        Some(MovingAveragePoint {
            time: *self.ma_times.get(index)?,
            value: *self.ma_values.get(index)?,
        })
    }

    /// Index of the moving-average point closest in time to `time`.
    pub fn nearest_index(&self, time: f64) -> Option<usize> {
        if self.ma_times.is_empty() {
            return None;
        }
        let after = self.ma_times.partition_point(|&t| t < time);
        if after == 0 {
            return Some(0);
        }
        if after == self.ma_times.len() {
            return Some(after - 1);
        }
        let before = after - 1;
        if time - self.ma_times[before] <= self.ma_times[after] - time {
            Some(before)
        } else {
            Some(after)
        }
    }
}

/// What one drain did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Non-empty batches pulled from the source.
    pub batches: usize,
    /// Rows seen.
    pub lines: usize,
    /// Rows that became samples.
    pub samples: usize,
    /// Rows rejected by the parser.
    pub malformed: usize,
    /// Entries dropped by retention.
    pub evicted: usize,
}

#[derive(Debug, Default)]
struct Counters {
    samples: u64,
    malformed: u64,
    evicted: u64,
    read_errors: u64,
    generation: u64,
}

/// Streaming latency analytics for one stream.
#[derive(Debug)]
pub struct LatencyEngine<S: LineSource = TailReader> {
    source: S,
    format: RecordFormat,
    series: SeriesState,
    retention: RetentionPolicy,
    state: DriverState,
    counters: Counters,
    last_error: Option<String>,
    publisher: watch::Sender<Arc<SeriesSnapshot>>,
}

impl LatencyEngine<TailReader> {
    /// Validate `config` and open its backing file.
    ///
    /// Fails with [`EngineError::NotFound`] if the file does not exist; the
    /// engine does not start in that case.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let reader = TailReader::open(&config.path)?;
        Self::new(reader, config)
    }
}

impl<S: LineSource> LatencyEngine<S> {
    /// Build an engine over an already-open source.
    pub fn new(source: S, config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let initial = SeriesSnapshot {
            source: source.description().to_string(),
            window_secs: config.window_secs,
            ..SeriesSnapshot::default()
        };
        let (publisher, _) = watch::channel(Arc::new(initial));
        info!(
            source = source.description(),
            window_secs = config.window_secs,
            capacity = config.capacity,
            receive_unit = ?config.receive_unit,
            "latency engine ready"
        );
        Ok(Self {
            source,
            format: config.record_format(),
            series: SeriesState::new(config.window_secs),
            retention: config.retention(),
            state: DriverState::Idle,
            counters: Counters::default(),
            last_error: None,
            publisher,
        })
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SeriesSnapshot>> {
        self.publisher.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<SeriesSnapshot> {
        self.publisher.borrow().clone()
    }

    pub fn series(&self) -> &SeriesState {
        &self.series
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn format(&self) -> &RecordFormat {
        &self.format
    }

    /// Pull every available row through the pipeline and publish the result.
    ///
    /// Rows are applied one whole batch at a time, with retention enforced
    /// after each batch so a large backlog never outgrows the capacity by
    /// more than one batch. A read error aborts the drain: batches already
    /// applied stay applied (and are published), the error is counted,
    /// published, and returned.
    ///
    /// A drain that finds no rows publishes nothing, so an earlier error
    /// stays visible until rows arrive again.
    pub fn drain(&mut self) -> Result<DrainReport, EngineError> {
        self.state = DriverState::Draining;
        let result = self.drain_batches();
        self.state = DriverState::Idle;
        result
    }

    fn drain_batches(&mut self) -> Result<DrainReport, EngineError> {
        let mut report = DrainReport::default();
        loop {
            let lines = match self.source.poll_lines() {
                Ok(lines) => lines,
                Err(err) => {
                    self.counters.read_errors += 1;
                    self.last_error = Some(err.to_string());
                    self.finish(&report);
                    return Err(err);
                }
            };
            if lines.is_empty() {
                break;
            }
            self.resolve_width();
            self.apply_batch(&lines, &mut report);
            self.enforce_retention(&mut report);
        }

        if report.lines > 0 {
            self.last_error = None;
            self.finish(&report);
        }
        Ok(report)
    }

    /// Learn the row width from the header once the source has one.
    fn resolve_width(&mut self) {
        if self.format.fields.is_some() {
            return;
        }
        if let Some(header) = self.source.header() {
            let fields = RecordFormat::fields_in_header(header);
            if fields < MIN_FIELDS {
                debug!(fields, header, "header too narrow to fix the row width");
                return;
            }
            info!(fields, header, "row width taken from header");
            self.format.fields = Some(fields);
        }
    }

    fn apply_batch(&mut self, lines: &[String], report: &mut DrainReport) {
        report.batches += 1;
        for line in lines {
            report.lines += 1;
            match record::parse(line, &self.format) {
                Ok(sample) => {
                    self.series.push(sample);
                    report.samples += 1;
                    self.counters.samples += 1;
                }
                Err(err) => {
                    report.malformed += 1;
                    self.counters.malformed += 1;
                    warn!(source = self.source.description(), line = %line, "{}", err);
                }
            }
        }
    }

    fn enforce_retention(&mut self, report: &mut DrainReport) {
        let evicted = self.retention.enforce(&mut self.series);
        report.evicted += evicted;
        self.counters.evicted += evicted as u64;
    }

    fn finish(&mut self, report: &DrainReport) {
        self.counters.generation += 1;

        let snapshot = SeriesSnapshot {
            source: self.source.description().to_string(),
            ma_times: self.series.ma_times().collect(),
            ma_values: self.series.ma_values().collect(),
            stats: self.series.stats(),
            latest: self.series.latest().map(LatestSample::from),
            window_secs: self.series.window_secs(),
            samples_total: self.counters.samples,
            malformed_total: self.counters.malformed,
            evicted_total: self.counters.evicted,
            read_errors: self.counters.read_errors,
            last_error: self.last_error.clone(),
            generation: self.counters.generation,
            updated_at: Some(Instant::now()),
        };
        debug!(
            generation = snapshot.generation,
            lines = report.lines,
            samples = report.samples,
            malformed = report.malformed,
            evicted = report.evicted,
            retained = self.series.len(),
            "published"
        );
        self.publisher.send_replace(Arc::new(snapshot));
    }
}
