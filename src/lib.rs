//! # latency-watch
//!
//! Streaming latency analytics for market-data bars, with a terminal
//! dashboard.
//!
//! A producer appends bar rows (`timestamp, ..., ts_recv`) to a CSV file.
//! This crate tails that file, turns each row into a latency sample, keeps a
//! trailing time-window moving average and running min/max/average over it,
//! bounds memory with oldest-first eviction, and publishes an immutable
//! snapshot after every drain.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ┌─────────┐    ┌──────────────────────────┐    ┌─────────┐  │
//! │  │ source  │───▶│         engine           │───▶│  watch  │  │
//! │  │ (lines) │    │ parse → window → stats   │    │ channel │  │
//! │  └─────────┘    │ → retention → publish    │    └────┬────┘  │
//! │       ▲         └────────────▲─────────────┘         │       │
//! │       │                      │ tick                  ▼       │
//! │  TailReader |           ┌────┴────┐            ┌─────────┐   │
//! │  ChannelLines           │ driver  │            │ app/ui  │   │
//! │                         └─────────┘            └─────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: The [`LineSource`] trait, with [`TailReader`] for growing
//!   files and [`ChannelLines`] for in-process producers
//! - **[`data`]**: Row parsing, the sliding-window moving average, running
//!   statistics and retention
//! - **[`engine`]**: [`LatencyEngine`], which drains a source through the
//!   pipeline and publishes [`SeriesSnapshot`]s
//! - **[`driver`]**: The tick loop that drains an engine on an interval
//! - **[`app`]** and **[`ui`]**: Dashboard state and ratatui rendering
//!
//! ## Usage
//!
//! ### Tailing a file
//!
//! ```no_run
//! use latency_watch::{EngineConfig, LatencyEngine};
//!
//! let config = EngineConfig::default();
//! let mut engine = LatencyEngine::open(&config)?;
//! engine.drain()?;
//! let snapshot = engine.snapshot();
//! println!("avg {:.2} ms over {} points", snapshot.stats.avg, snapshot.len());
//! # Ok::<(), latency_watch::EngineError>(())
//! ```
//!
//! ### Feeding rows from the same process
//!
//! ```
//! use latency_watch::{ChannelLines, EngineConfig, LatencyEngine, TimestampUnit};
//!
//! let (tx, source) = ChannelLines::create("example");
//! let config = EngineConfig {
//!     receive_unit: TimestampUnit::Seconds,
//!     fields: Some(2),
//!     ..EngineConfig::default()
//! };
//! let mut engine = LatencyEngine::new(source, &config).unwrap();
//!
//! tx.send("1700000000,1700000005.040".to_string()).unwrap();
//! engine.drain().unwrap();
//! assert_eq!(engine.snapshot().len(), 1);
//! ```
//!
//! ### Polling on an interval
//!
//! ```no_run
//! use std::time::Duration;
//! use latency_watch::{driver, EngineConfig, LatencyEngine};
//! use tokio::sync::watch;
//!
//! # tokio_test::block_on(async {
//! let engine = LatencyEngine::open(&EngineConfig::default()).unwrap();
//! let mut snapshots = engine.subscribe();
//! let (stop, shutdown) = watch::channel(false);
//! let handle = tokio::spawn(driver::run(engine, Duration::from_secs(1), shutdown));
//!
//! snapshots.changed().await.unwrap();
//! stop.send(true).unwrap();
//! handle.await.unwrap().unwrap();
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::EngineConfig;
pub use data::{
    MovingAveragePoint, ParseError, RecordFormat, RetentionPolicy, Sample, SeriesState,
    StatsSnapshot, TimestampUnit,
};
pub use driver::DriverSummary;
pub use engine::{DrainReport, DriverState, LatencyEngine, LatestSample, SeriesSnapshot};
pub use error::EngineError;
pub use source::{ChannelLines, LineSource, TailReader};
