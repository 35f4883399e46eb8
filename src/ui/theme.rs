//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::app::REFERENCE_LATENCY_MS;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// The moving-average line.
    pub series: Color,
    /// The reference latency line.
    pub reference: Color,
    /// Inspection cursor marker.
    pub cursor: Color,
    /// Latency above the reference.
    pub warning: Color,
    /// Read errors and malformed rows.
    pub critical: Color,
    /// Latency at or below the reference.
    pub healthy: Color,
    /// Color for borders and axes.
    pub border: Color,
    /// Style for titles.
    pub header: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            series: Color::Green,
            reference: Color::LightRed,
            cursor: Color::Yellow,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            series: Color::Green,
            reference: Color::Red,
            cursor: Color::Magenta,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Style for a latency value, judged against the reference line.
    pub fn latency_style(&self, latency_ms: f64) -> Style {
        if latency_ms > 2.0 * REFERENCE_LATENCY_MS {
            Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
        } else if latency_ms > REFERENCE_LATENCY_MS {
            Style::default().fg(self.warning)
        } else {
            Style::default().fg(self.healthy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_style_bands() {
        let theme = Theme::dark();
        assert_eq!(theme.latency_style(10.0).fg, Some(Color::Green));
        assert_eq!(theme.latency_style(50.0).fg, Some(Color::Green));
        assert_eq!(theme.latency_style(75.0).fg, Some(Color::Yellow));
        assert_eq!(theme.latency_style(150.0).fg, Some(Color::Red));
    }
}
