use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::{Position, Rect};

use crate::app::App;

/// File written by the in-app export key.
pub const EXPORT_FILE: &str = "latency_export.json";

/// Points skipped by PgUp/PgDn.
const PAGE: usize = 10;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // Point inspection
        KeyCode::Left | KeyCode::Char('h') => app.cursor_left(1),
        KeyCode::Right | KeyCode::Char('l') => app.cursor_right(1),
        KeyCode::PageUp => app.cursor_left(PAGE),
        KeyCode::PageDown => app.cursor_right(PAGE),
        KeyCode::Home => app.cursor_first(),
        KeyCode::End => app.cursor_last(),
        KeyCode::Esc => app.clear_cursor(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle a mouse event over the chart whose plotting region is `plot`.
///
/// Hovering or clicking inside the plot inspects the nearest point; the
/// wheel steps through points and a right click releases the cursor.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, plot: Rect) {
    if app.show_help {
        return;
    }

    match mouse.kind {
        MouseEventKind::Moved
        | MouseEventKind::Down(MouseButton::Left)
        | MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(time) = time_at(app.x_bounds(), plot, mouse.column, mouse.row) {
                app.inspect_at(time);
            }
        }
        MouseEventKind::Down(MouseButton::Right) => app.clear_cursor(),
        MouseEventKind::ScrollUp => app.cursor_left(1),
        MouseEventKind::ScrollDown => app.cursor_right(1),
        _ => {}
    }
}

/// Time under a terminal cell, or `None` outside the plot.
fn time_at(bounds: [f64; 2], plot: Rect, column: u16, row: u16) -> Option<f64> {
    if !plot.contains(Position::new(column, row)) {
        return None;
    }
    let span = f64::from(plot.width.saturating_sub(1).max(1));
    let fraction = f64::from(column - plot.x) / span;
    Some(bounds[0] + fraction * (bounds[1] - bounds[0]))
}
