//! Latency data model and the incremental analytics pipeline.
//!
//! ## Submodules
//!
//! - [`record`]: Parsing of bar rows into [`Sample`]s
//! - [`window`]: Trailing time-window moving average ([`SlidingWindow`])
//! - [`stats`]: Min/max/average over the smoothed series ([`RunningStats`])
//! - [`retention`]: Bounded memory via oldest-first eviction ([`RetentionPolicy`])
//! - [`series`]: The aligned raw + smoothed sequences of one stream ([`SeriesState`])
//! - [`duration`]: Interval parsing and time/latency formatting
//!
//! ## Data Flow
//!
//! ```text
//! raw line
//!    │
//!    ▼
//! record::parse() ──▶ ParseError (counted, skipped)
//!    │
//!    ▼
//! SeriesState::push()
//!    ├──▶ SlidingWindow::admit()   (one MovingAveragePoint per sample)
//!    └──▶ RunningStats::push()
//!    │
//!    ▼
//! RetentionPolicy::enforce()       (once per drain)
//! ```

pub mod duration;
pub mod record;
pub mod retention;
pub mod series;
pub mod stats;
pub mod window;

pub use record::{MalformedReason, ParseError, RecordFormat, Sample, TimestampUnit};
pub use retention::RetentionPolicy;
pub use series::SeriesState;
pub use stats::{RunningStats, StatsSnapshot};
pub use window::{MovingAveragePoint, SlidingWindow};
