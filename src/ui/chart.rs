//! Moving-average latency chart.
//!
//! Plots the published moving-average series against arrival time, with a
//! dashed-looking reference line at [`REFERENCE_LATENCY_MS`] and a marker on
//! the inspected point.

use ratatui::{
    layout::{Margin, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use crate::app::{App, REFERENCE_LATENCY_MS};
use crate::data::duration::format_clock;

/// Render the chart into `area`.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let snapshot = &app.snapshot;
    let x_bounds = app.x_bounds();
    let y_bounds = app.y_bounds();

    let points: Vec<(f64, f64)> = snapshot
        .ma_times
        .iter()
        .copied()
        .zip(snapshot.ma_values.iter().copied())
        .collect();
    let reference = reference_line(x_bounds, area.width);
    let cursor: Vec<(f64, f64)> = app.inspected().map(|p| vec![(p.time, p.value)]).unwrap_or_default();

    let mut datasets = vec![
        Dataset::default()
            .name(format!("{:.0} ms", REFERENCE_LATENCY_MS))
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(app.theme.reference))
            .data(&reference),
        Dataset::default()
            .name(format!("{:.0}s MA", snapshot.window_secs))
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(app.theme.series))
            .data(&points),
    ];
    if !cursor.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(app.theme.cursor).add_modifier(Modifier::BOLD))
                .data(&cursor),
        );
    }

    let block = Block::default()
        .title(format!(" Latency | {} ", app.source_description()))
        .title_style(app.theme.header)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let axis_style = Style::default().fg(app.theme.border);
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(axis_style)
                .bounds(x_bounds)
                .labels(time_labels(x_bounds).into_iter().map(Span::raw).collect::<Vec<_>>()),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .style(axis_style)
                .bounds(y_bounds)
                .labels(latency_labels(y_bounds).into_iter().map(Span::raw).collect::<Vec<_>>()),
        );

    frame.render_widget(chart, area);
}

/// The region of `area` where points are plotted, inside the border and
/// right of the latency labels. Mouse columns map to time across it.
pub fn plot_area(app: &App, area: Rect) -> Rect {
    let inner = area.inner(Margin::new(1, 1));
    let y_labels = latency_labels(app.y_bounds());
    let x_labels = time_labels(app.x_bounds());

    // Labels left of the y axis, as the chart widget lays them out, plus the
    // axis line itself.
    let widest_y = y_labels.iter().map(|l| l.len()).max().unwrap_or(0);
    let first_x = x_labels.first().map(|l| l.len().saturating_sub(1)).unwrap_or(0);
    let left = (widest_y.max(first_x) as u16).min(inner.width / 3) + 1;

    Rect {
        x: inner.x + left,
        width: inner.width.saturating_sub(left),
        // x axis line and its labels sit on the bottom two rows
        height: inner.height.saturating_sub(2),
        ..inner
    }
}

/// Evenly spaced points along the reference latency, every other column so it
/// reads as a dashed line.
fn reference_line(x_bounds: [f64; 2], width: u16) -> Vec<(f64, f64)> {
    let steps = (width / 2).max(2) as usize;
    let span = x_bounds[1] - x_bounds[0];
    (0..=steps)
        .map(|i| {
            let x = x_bounds[0] + span * i as f64 / steps as f64;
            (x, REFERENCE_LATENCY_MS)
        })
        .collect()
}

/// Start, middle and end of the time axis as local wall-clock times.
fn time_labels(bounds: [f64; 2]) -> Vec<String> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]].into_iter().map(format_clock).collect()
}

fn latency_labels(bounds: [f64; 2]) -> Vec<String> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .into_iter()
        .map(|v| format!("{:.0}", v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::stats::StatsSnapshot;
    use crate::engine::SeriesSnapshot;
    use crate::ui::Theme;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use tokio::sync::watch;

    #[test]
    fn test_reference_line_spans_axis() {
        let line = reference_line([100.0, 200.0], 40);
        assert_eq!(line.len(), 21);
        assert_eq!(line.first(), Some(&(100.0, 50.0)));
        assert_eq!(line.last(), Some(&(200.0, 50.0)));
    }

    #[test]
    fn test_latency_labels() {
        assert_eq!(latency_labels([-10.0, 120.0]), vec!["-10", "55", "120"]);
    }

    #[test]
    fn test_time_labels_are_clock_times() {
        let labels = time_labels([1_700_000_000.0, 1_700_000_060.0]);
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|l| l.len() == 8 && l.as_bytes()[2] == b':'));
    }

    #[test]
    fn test_plot_area_clears_labels_and_border() {
        let snapshot = SeriesSnapshot {
            ma_times: vec![1_700_000_000.0, 1_700_000_010.0],
            ma_values: vec![10.0, 20.0],
            stats: StatsSnapshot::from_values([10.0, 20.0]),
            ..SeriesSnapshot::default()
        };
        let (_tx, rx) = watch::channel(Arc::new(snapshot));
        let app = App::new(rx, Theme::dark());

        let area = Rect::new(0, 1, 80, 20);
        let plot = plot_area(&app, area);
        // "HH:MM:SS" is the widest label, minus the column shared with the axis.
        assert_eq!(plot.x, 1 + 7 + 1);
        assert_eq!(plot.right(), area.right() - 1);
        assert_eq!(plot.y, 2);
        assert_eq!(plot.height, 16);
    }

    #[test]
    fn test_render_with_cursor() {
        let values = [10.0, 60.0, 30.0];
        let snapshot = SeriesSnapshot {
            source: "file: SPY.csv".to_string(),
            ma_times: vec![1_700_000_000.0, 1_700_000_005.0, 1_700_000_010.0],
            ma_values: values.to_vec(),
            stats: StatsSnapshot::from_values(values),
            window_secs: 30.0,
            ..SeriesSnapshot::default()
        };
        let (_tx, rx) = watch::channel(Arc::new(snapshot));
        let mut app = App::new(rx, Theme::dark());
        app.cursor_last();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(frame, &app, frame.area())).unwrap();

        let buffer = terminal.backend().buffer();
        let top: String = (0..80u16).map(|x| buffer[(x, 0u16)].symbol().to_string()).collect();
        assert!(top.contains("Latency | file: SPY.csv"));
    }
}
