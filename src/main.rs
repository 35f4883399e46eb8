use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    Terminal,
};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use latency_watch::app::write_snapshot;
use latency_watch::data::duration::parse_duration;
use latency_watch::ui::Theme;
use latency_watch::{driver, events, ui, App, EngineConfig, LatencyEngine, TimestampUnit};

#[derive(Parser, Debug)]
#[command(name = "latency-watch")]
#[command(about = "Live moving-average latency of market-data bars appended to a CSV file")]
struct Args {
    /// CSV file to tail [default: ./candles/SPY.csv]
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Moving-average window in seconds [default: 30]
    #[arg(long)]
    window: Option<f64>,

    /// Maximum points kept in memory [default: 10000]
    #[arg(long)]
    capacity: Option<usize>,

    /// Poll interval (e.g., "1s", "250ms") [default: 1s]
    #[arg(short, long)]
    interval: Option<String>,

    /// Bar-aggregation offset added to the bar timestamp, in seconds [default: 5]
    #[arg(long)]
    offset: Option<f64>,

    /// Unit of the receive timestamp column [default: nanoseconds]
    #[arg(long, value_enum)]
    recv_unit: Option<TimestampUnit>,

    /// Exact number of columns per row [default: taken from the header]
    #[arg(long)]
    fields: Option<usize>,

    /// Log statistics on every update instead of drawing the dashboard
    #[arg(long, conflicts_with = "export")]
    headless: bool,

    /// Drain the file once, write the series and statistics as JSON, and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Log file used while the dashboard owns the terminal
    #[arg(long, default_value = "latency-watch.log")]
    log_file: PathBuf,
}

impl Args {
    /// Load layered settings and apply flags on top.
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::load(self.config.as_deref())?;
        if let Some(ref path) = self.file {
            config.path = path.clone();
        }
        if let Some(window) = self.window {
            config.window_secs = window;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(ref interval) = self.interval {
            config.poll_interval = parse_duration(interval)?;
        }
        if let Some(offset) = self.offset {
            config.bar_offset_secs = offset;
        }
        if let Some(unit) = self.recv_unit {
            config.receive_unit = unit;
        }
        if self.fields.is_some() {
            config.fields = self.fields;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let tui = !args.headless && args.export.is_none();
    let _guard = init_logging(tui.then_some(args.log_file.as_path()))?;

    let config = args.engine_config()?;

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_to_file(&config, export_path);
    }

    if args.headless {
        return run_headless(config);
    }

    run_with_file(config)
}

/// Install the tracing subscriber.
///
/// With a log file, output goes there through a non-blocking writer so it
/// cannot tear the dashboard; otherwise it goes to stderr.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .with_context(|| format!("invalid log file: {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// Run the dashboard over the configured file
fn run_with_file(config: EngineConfig) -> Result<()> {
    // Open before touching the terminal so a missing file is a plain error.
    let engine = LatencyEngine::open(&config)?;
    let snapshots = engine.subscribe();

    let rt = Runtime::new()?;
    let (stop, shutdown) = watch::channel(false);
    let handle = rt.spawn(driver::run(engine, config.poll_interval, shutdown));

    let app = App::new(snapshots, Theme::auto_detect());
    let result = run_tui(app);

    // Signal shutdown and wait for the driver to finish its current drain
    let _ = stop.send(true);
    match rt.block_on(handle)? {
        Ok(summary) => info!(ticks = summary.ticks, "driver finished"),
        Err(err) => warn!("driver stopped with error: {}", err),
    }

    result
}

/// Log statistics every time a new snapshot is published, until Ctrl-C.
fn run_headless(config: EngineConfig) -> Result<()> {
    let engine = LatencyEngine::open(&config)?;
    let mut snapshots = engine.subscribe();

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let (stop, shutdown) = watch::channel(false);
        let mut handle = tokio::spawn(driver::run(engine, config.poll_interval, shutdown));

        let outcome = loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break (&mut handle).await?;
                    }
                    let snapshot = Arc::clone(&snapshots.borrow_and_update());
                    log_snapshot(&snapshot);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    let _ = stop.send(true);
                    break (&mut handle).await?;
                }
            }
        };

        let summary = outcome?;
        info!(
            ticks = summary.ticks,
            missed_ticks = summary.missed_ticks,
            read_errors = summary.read_errors,
            "stopped"
        );
        Ok::<(), anyhow::Error>(())
    })
}

fn log_snapshot(snapshot: &latency_watch::SeriesSnapshot) {
    if let Some(ref err) = snapshot.last_error {
        warn!(read_errors = snapshot.read_errors, "{}", err);
        return;
    }
    let Some(latest) = snapshot.latest else {
        return;
    };
    info!(
        min_ms = snapshot.stats.min,
        max_ms = snapshot.stats.max,
        avg_ms = snapshot.stats.avg,
        latest_ms = latest.latency_ms,
        points = snapshot.len(),
        malformed = snapshot.malformed_total,
        "Min: {:.2} ms | Max: {:.2} ms | Avg: {:.2} ms",
        snapshot.stats.min,
        snapshot.stats.max,
        snapshot.stats.avg
    );
}

/// Run the TUI until the user quits
fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 50;
    const MIN_HEIGHT: u16 = 10;

    let mut plot = Rect::default();

    while app.running {
        app.refresh();

        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered =
                    Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5.min(area.height));
                frame.render_widget(paragraph, centered);
                plot = Rect::default();
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Stats bar
                Constraint::Min(6),    // Chart
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::chart::render(frame, app, chunks[1]);
            plot = ui::chart::plot_area(app, chunks[1]);
            ui::common::render_status_bar(frame, app, chunks[2]);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        match events::poll_event(Duration::from_millis(100))? {
            Some(Event::Key(key)) => events::handle_key_event(app, key),
            Some(Event::Mouse(mouse)) => events::handle_mouse_event(app, mouse, plot),
            _ => {}
        }
    }

    Ok(())
}

/// Drain the file once and write the resulting snapshot as JSON
fn export_to_file(config: &EngineConfig, export_path: &Path) -> Result<()> {
    let mut engine = LatencyEngine::open(config)?;
    let report = engine.drain()?;
    write_snapshot(&engine.snapshot(), export_path)?;

    info!(
        samples = report.samples,
        malformed = report.malformed,
        path = %export_path.display(),
        "exported"
    );
    println!("Exported latency series to: {}", export_path.display());
    Ok(())
}
