//! Application state for the dashboard.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::watch;

use crate::data::window::MovingAveragePoint;
use crate::engine::SeriesSnapshot;
use crate::ui::Theme;

/// Latency drawn as a dashed reference line on the chart, in milliseconds.
pub const REFERENCE_LATENCY_MS: f64 = 50.0;

/// Default lower bound of the latency axis.
pub const Y_FLOOR_MS: f64 = -10.0;

/// Headroom above the highest moving average.
const Y_HEADROOM: f64 = 1.2;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    receiver: watch::Receiver<Arc<SeriesSnapshot>>,
    pub snapshot: Arc<SeriesSnapshot>,

    /// Time of the inspected moving-average point. Pinned by time rather than
    /// index so it stays on the same point as old entries are evicted.
    cursor: Option<f64>,
    /// Upper bound of the latency axis. Only ever grows.
    y_ceiling: Option<f64>,

    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading snapshots from `receiver`.
    pub fn new(receiver: watch::Receiver<Arc<SeriesSnapshot>>, theme: Theme) -> Self {
        let snapshot = receiver.borrow().clone();
        let mut app = Self {
            running: true,
            show_help: false,
            receiver,
            snapshot: Arc::new(SeriesSnapshot::default()),
            cursor: None,
            y_ceiling: None,
            theme,
            status_message: None,
        };
        app.apply(snapshot);
        app
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        &self.snapshot.source
    }

    /// Pick up the latest published snapshot, if there is a new one.
    ///
    /// Returns true if the displayed data changed.
    pub fn refresh(&mut self) -> bool {
        match self.receiver.has_changed() {
            Ok(true) => {
                let snapshot = self.receiver.borrow_and_update().clone();
                self.apply(snapshot);
                true
            }
            Ok(false) => false,
            Err(_) => {
                // Engine is gone; keep showing what we have.
                if self.snapshot.last_error.is_none() {
                    self.set_status_message("Engine stopped".to_string());
                }
                false
            }
        }
    }

    fn apply(&mut self, snapshot: Arc<SeriesSnapshot>) {
        if !snapshot.is_empty() {
            let cap = snapshot.stats.max * Y_HEADROOM;
            self.y_ceiling = Some(match self.y_ceiling {
                Some(current) if current >= cap => current,
                _ => cap,
            });
        }
        if let Some(time) = self.cursor {
            self.cursor = snapshot
                .nearest_index(time)
                .and_then(|i| snapshot.ma_times.get(i).copied());
        }
        self.snapshot = snapshot;
    }

    /// Latency axis bounds in milliseconds.
    ///
    /// The floor is [`Y_FLOOR_MS`] unless the minimum plus headroom dips
    /// below it. The
    /// ceiling tracks the highest moving average seen plus headroom and never
    /// shrinks; it is always high enough to show the reference line.
    pub fn y_bounds(&self) -> [f64; 2] {
        let stats = &self.snapshot.stats;
        let floor = if !self.snapshot.is_empty() && stats.min * Y_HEADROOM < Y_FLOOR_MS {
            stats.min * Y_HEADROOM
        } else {
            Y_FLOOR_MS
        };
        let ceiling = self
            .y_ceiling
            .unwrap_or(REFERENCE_LATENCY_MS * Y_HEADROOM)
            .max(REFERENCE_LATENCY_MS * Y_HEADROOM);
        [floor, ceiling]
    }

    /// Time axis bounds, in epoch seconds.
    pub fn x_bounds(&self) -> [f64; 2] {
        match (self.snapshot.ma_times.first(), self.snapshot.ma_times.last()) {
            (Some(&first), Some(&last)) if last > first => [first, last],
            (Some(&first), Some(_)) => [first - 1.0, first + 1.0],
            _ => [0.0, 1.0],
        }
    }

    /// The point under the inspection cursor.
    pub fn inspected(&self) -> Option<MovingAveragePoint> {
        let time = self.cursor?;
        let index = self.snapshot.nearest_index(time)?;
        self.snapshot.point(index)
    }

    fn cursor_index(&self) -> Option<usize> {
        self.snapshot.nearest_index(self.cursor?)
    }

    fn move_cursor_to(&mut self, index: usize) {
        self.cursor = self.snapshot.ma_times.get(index).copied();
    }

    /// Step the cursor back `n` points. Starts from the newest point.
    pub fn cursor_left(&mut self, n: usize) {
        match self.cursor_index() {
            Some(i) => self.move_cursor_to(i.saturating_sub(n)),
            None => self.cursor_last(),
        }
    }

    /// Step the cursor forward `n` points. Starts from the newest point.
    pub fn cursor_right(&mut self, n: usize) {
        match self.cursor_index() {
            Some(i) => {
                let last = self.snapshot.len().saturating_sub(1);
                self.move_cursor_to((i + n).min(last));
            }
            None => self.cursor_last(),
        }
    }

    pub fn cursor_first(&mut self) {
        self.move_cursor_to(0);
    }

    pub fn cursor_last(&mut self) {
        self.move_cursor_to(self.snapshot.len().saturating_sub(1));
    }

    /// Put the cursor on the point closest in time to `time`.
    pub fn inspect_at(&mut self, time: f64) {
        if let Some(index) = self.snapshot.nearest_index(time) {
            self.move_cursor_to(index);
        }
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export the displayed snapshot to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        if self.snapshot.is_empty() {
            anyhow::bail!("No data to export");
        }
        write_snapshot(&self.snapshot, path)
    }
}

/// Write `snapshot` to `path` as pretty-printed JSON.
pub fn write_snapshot(snapshot: &SeriesSnapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}
