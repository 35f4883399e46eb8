//! Line source abstraction for feeding the latency engine.
//!
//! The engine pulls raw rows from a [`LineSource`]. The production source is
//! [`TailReader`], which follows an append-only file written by another
//! process. [`ChannelLines`] carries rows produced in-process.

mod channel;
mod tail;

pub use channel::ChannelLines;
pub use tail::TailReader;

use std::fmt::Debug;

use crate::error::EngineError;

/// A stream of newline-delimited rows, polled once per tick.
///
/// # Example
///
/// ```no_run
/// use latency_watch::{LineSource, TailReader};
///
/// let mut source = TailReader::open("candles/SPY.csv")?;
/// for line in source.poll_lines()? {
///     println!("{line}");
/// }
/// # Ok::<(), latency_watch::EngineError>(())
/// ```
pub trait LineSource: Send + Debug {
    /// Return every complete row that became available since the last call.
    ///
    /// An empty batch means nothing new. This method must not block waiting
    /// for data.
    fn poll_lines(&mut self) -> Result<Vec<String>, EngineError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI and in log lines.
    fn description(&self) -> &str;

    /// The header row, once it has been read.
    fn header(&self) -> Option<&str> {
        None
    }
}
