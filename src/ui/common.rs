//! Common UI components.
//!
//! This module contains the stats bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::{format_clock, format_latency};

/// Render the stats bar: min, max and average of the moving average.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let snapshot = &app.snapshot;
    let title = Span::styled(" LATENCY ", Style::default().add_modifier(Modifier::BOLD));

    if snapshot.is_empty() {
        let line = Line::from(vec![title, Span::raw("| Loading...")]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let stats = &snapshot.stats;
    let mut spans = vec![
        title,
        Span::raw("│ Min: "),
        Span::styled(format_latency(stats.min), app.theme.latency_style(stats.min)),
        Span::raw(" | Max: "),
        Span::styled(format_latency(stats.max), app.theme.latency_style(stats.max)),
        Span::raw(" | Avg: "),
        Span::styled(format_latency(stats.avg), app.theme.latency_style(stats.avg)),
        Span::raw(format!(" │ {} points", snapshot.len())),
    ];
    if snapshot.malformed_total > 0 {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format!("{} malformed", snapshot.malformed_total),
            Style::default().fg(app.theme.warning),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Text for the status bar, without styling.
///
/// Priority: temporary message, inspected point, read error, latest sample.
pub fn status_text(app: &App) -> String {
    if let Some(msg) = app.get_status_message() {
        return format!(" {} ", msg);
    }

    if let Some(point) = app.inspected() {
        return format!(
            " Time: {} | Latency: {} | ←/→:move Esc:release",
            format_clock(point.time),
            format_latency(point.value)
        );
    }

    let snapshot = &app.snapshot;
    if let Some(ref err) = snapshot.last_error {
        return format!(" Error: {} | q:quit", err);
    }

    match snapshot.latest {
        Some(latest) => {
            let age = snapshot
                .updated_at
                .map(|at| format!(" | Updated {:.1}s ago", at.elapsed().as_secs_f64()))
                .unwrap_or_default();
            format!(
                " Latest: {} | {}{} | ←/→:inspect ?:help q:quit",
                format_clock(latest.arrival_time),
                format_latency(latest.latency_ms),
                age
            )
        }
        None => " Waiting for data... | q:quit".to_string(),
    }
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let style = if app.get_status_message().is_some() || app.inspected().is_some() {
        Style::default().fg(app.theme.highlight)
    } else if app.snapshot.last_error.is_some() {
        Style::default().fg(app.theme.critical)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    frame.render_widget(Paragraph::new(status_text(app)).style(style), area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the chart.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Inspect",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ←/→ h/l     Previous/next point"),
        Line::from("  PgUp/PgDn   Jump 10 points"),
        Line::from("  Home/End    Oldest/newest point"),
        Line::from("  Esc         Release cursor"),
        Line::from("  Mouse       Hover/click to inspect"),
        Line::from("  Right-click Release cursor"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  e         Export to JSON"),
        Line::from("  ?         Toggle help"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 20u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
