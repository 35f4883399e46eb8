//! Periodic polling of a [`LatencyEngine`].
//!
//! One task owns the engine and drains it on every tick of a tokio interval.
//! A drain runs to completion before the next tick is awaited, so drains can
//! never overlap; ticks that fall due while a drain is still running are
//! skipped rather than queued.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::LatencyEngine;
use crate::error::EngineError;
use crate::source::LineSource;

/// Totals for one run of the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    /// Ticks that ran a drain.
    pub ticks: u64,
    /// Drains that found at least one row.
    pub drains_with_data: u64,
    /// Ticks skipped because the previous drain overran.
    pub missed_ticks: u64,
    /// Transient read errors that were retried.
    pub read_errors: u64,
}

/// Drain `engine` every `interval` until `shutdown` flips to `true`.
///
/// Returns when shutdown is requested, when every sender of `shutdown` is
/// dropped, or when the source reports that it is closed. A fatal error
/// (for example [`EngineError::StreamReset`]) stops the driver and is
/// returned; plain I/O errors are logged and retried on the next tick.
pub async fn run<S: LineSource>(
    mut engine: LatencyEngine<S>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<DriverSummary, EngineError> {
    let mut summary = DriverSummary::default();
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick: Option<Instant> = None;

    info!(
        source = engine.source().description(),
        interval_ms = interval.as_millis() as u64,
        "driver started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("shutdown sender dropped");
                    break;
                }
                continue;
            }
            now = ticker.tick() => {
                if let Some(prev) = last_tick {
                    summary.missed_ticks += missed_between(prev, now, interval);
                }
                last_tick = Some(now);
            }
        }

        summary.ticks += 1;
        match engine.drain() {
            Ok(report) => {
                if report.lines > 0 {
                    summary.drains_with_data += 1;
                }
            }
            Err(EngineError::Closed) => {
                info!(source = engine.source().description(), "source closed");
                break;
            }
            Err(err) if !err.is_fatal() => {
                summary.read_errors += 1;
                warn!(source = engine.source().description(), "{}; retrying next tick", err);
            }
            Err(err) => {
                warn!(source = engine.source().description(), "stopping: {}", err);
                return Err(err);
            }
        }
    }

    info!(
        ticks = summary.ticks,
        missed = summary.missed_ticks,
        read_errors = summary.read_errors,
        "driver stopped"
    );
    Ok(summary)
}

/// Whole periods that elapsed between two delivered ticks, minus the one
/// that was delivered.
fn missed_between(prev: Instant, now: Instant, period: Duration) -> u64 {
    let elapsed = now.saturating_duration_since(prev);
    let periods = (elapsed.as_nanos() / period.as_nanos().max(1)) as u64;
    periods.saturating_sub(1)
}
