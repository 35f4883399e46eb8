//! Engine settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `LATENCY_WATCH_*` environment variables. The CLI applies its own flags on
//! top of the loaded value.
//!
//! ```toml
//! path = "./candles/SPY.csv"
//! window_secs = 30.0
//! capacity = 10000
//! poll_interval = "1s"
//! bar_offset_secs = 5.0
//! receive_unit = "nanoseconds"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::duration::deserialize_duration;
use crate::data::record::{RecordFormat, TimestampUnit, DEFAULT_BAR_OFFSET_SECS, MIN_FIELDS};
use crate::data::retention::{RetentionPolicy, DEFAULT_CAPACITY};
use crate::data::window::DEFAULT_WINDOW_SECS;
use crate::error::EngineError;

/// Environment variable prefix (`LATENCY_WATCH_PATH`, `LATENCY_WATCH_CAPACITY`, ...).
pub const ENV_PREFIX: &str = "LATENCY_WATCH";

/// Default backing file.
pub const DEFAULT_PATH: &str = "./candles/SPY.csv";

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for one monitored stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backing file to tail.
    pub path: PathBuf,
    /// Moving-average window in seconds.
    pub window_secs: f64,
    /// Maximum points retained per series.
    pub capacity: usize,
    /// Time between drains.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_secs")]
    pub poll_interval: Duration,
    /// Bar-aggregation period added to the bar timestamp, in seconds.
    pub bar_offset_secs: f64,
    /// Unit of the receive timestamp column.
    pub receive_unit: TimestampUnit,
    /// Exact column count; taken from the header row when unset.
    pub fields: Option<usize>,
    /// Expected samples per second, used to size retention against the
    /// window. Defaults to one bar per `bar_offset_secs`.
    pub expected_rate_hz: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            window_secs: DEFAULT_WINDOW_SECS,
            capacity: DEFAULT_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            bar_offset_secs: DEFAULT_BAR_OFFSET_SECS,
            receive_unit: TimestampUnit::default(),
            fields: None,
            expected_rate_hz: None,
        }
    }
}

fn serialize_secs<S>(d: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(d.as_secs_f64())
}

impl EngineConfig {
    /// Load settings from an optional file plus the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parser settings for this stream.
    pub fn record_format(&self) -> RecordFormat {
        RecordFormat {
            receive_unit: self.receive_unit,
            bar_offset: self.bar_offset_secs,
            fields: self.fields,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.capacity)
    }

    /// Samples per second the retention check assumes.
    pub fn expected_rate(&self) -> f64 {
        match self.expected_rate_hz {
            Some(rate) => rate,
            None if self.bar_offset_secs > 0.0 => 1.0 / self.bar_offset_secs,
            None => 1.0,
        }
    }

    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.window_secs.is_finite() && self.window_secs > 0.0) {
            return Err(EngineError::Config(format!(
                "window must be a positive number of seconds, got {}",
                self.window_secs
            )));
        }
        if !self.bar_offset_secs.is_finite() {
            return Err(EngineError::Config(format!(
                "bar offset must be finite, got {}",
                self.bar_offset_secs
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(EngineError::Config("poll interval must be non-zero".to_string()));
        }
        if let Some(fields) = self.fields {
            if fields < MIN_FIELDS {
                return Err(EngineError::Config(format!(
                    "rows need at least {MIN_FIELDS} fields, got {fields}"
                )));
            }
        }
        self.retention().validate(self.window_secs, self.expected_rate())
    }
}
