//! zapcast - remote-driven TUI for an IPTV catalog server
//!
//! Browse movies, series and live channels with the arrow keys, zap between
//! channels, resume where you left off and hand streams to a Chromecast.
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! zapcast
//! zapcast --type live
//!
//! # CLI mode (for automation)
//! zapcast channels --filter news
//! zapcast cast 1234 --device "Living Room TV"
//! zapcast continue --json
//! ```

use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use zapcast::app::{App, AppEvent, InputMode, Screen};
use zapcast::cli::{Cli, Command, ExitCode, Output};
use zapcast::commands::{self, CommandContext};
use zapcast::config::Config;
use zapcast::models::ContentType;
use zapcast::stream::{CattCaster, MpvPlayer, Runtime};
use zapcast::ui::{self, browser, ListingViewport, Theme};

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Log filter variable, e.g. `ZAPCAST_LOG=zapcast=debug`
const LOG_ENV: &str = "ZAPCAST_LOG";

/// Redraw interval; also bounds how late a timer can fire
const TICK_RATE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.is_cli_mode() {
        // CLI mode: execute command and exit
        init_cli_logging(cli.quiet);
        let exit_code = run_cli(cli).await;
        std::process::exit(exit_code.into());
    } else {
        // TUI mode: launch interactive interface
        run_tui(cli).await
    }
}

fn load_config(cli: &Cli) -> Config {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// CLI logs go to stderr, next to the command's own messages
fn init_cli_logging(quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(if quiet { "error" } else { "warn" }))
        .with_writer(std::io::stderr)
        .try_init();
}

/// The TUI owns the terminal, so logs go to a file in the data dir
fn init_tui_logging() {
    let Some(dir) = dirs::data_local_dir().map(|d| d.join("zapcast")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("zapcast.log"))
    else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let ctx = CommandContext::new(
        load_config(&cli),
        cli.server.as_deref(),
        cli.device.clone(),
        cli.no_save,
    );

    match cli.command {
        Some(Command::Channels(cmd)) => commands::channels_cmd(cmd, &ctx, &output).await,

        Some(Command::Browse(cmd)) => commands::browse_cmd(cmd, &ctx, &output).await,

        Some(Command::Resolve(cmd)) => commands::resolve_cmd(cmd, &ctx, &output).await,

        Some(Command::Continue(cmd)) => commands::continue_cmd(cmd, &ctx, &output),

        Some(Command::Forget(cmd)) => commands::forget_cmd(cmd, &ctx, &output),

        Some(Command::Cast(cmd)) => commands::cast_cmd(cmd, &ctx, &output).await,

        None => {
            // This shouldn't happen (handled by is_cli_mode check)
            ExitCode::Success
        }
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(cli: Cli) -> Result<()> {
    init_tui_logging();

    let mut config = load_config(&cli);
    if let Some(content) = cli.content {
        config.content_type = content;
    }
    if cli.device.is_some() {
        config.cast_device = cli.device.clone();
    }
    let ctx = CommandContext::new(config, cli.server.as_deref(), cli.device.clone(), cli.no_save);
    let config = &ctx.config;

    let progress = ctx.progress()?;
    let mut app = App::new(config, progress).with_server(ctx.server.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    let mut runtime = Runtime::new(
        ctx.client(),
        MpvPlayer::new(config.player.clone()),
        CattCaster::new(),
        tx,
    );
    tracing::info!(server = %ctx.server, content = %config.content_type, "starting");

    // Initialize terminal
    let mut terminal = init_terminal()?;

    // Run the main event loop
    let result = run_event_loop(&mut terminal, &mut app, &mut runtime, rx, config.cell_width).await;

    runtime.stop_player();

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop: input, effect results and timers feed the app; the
/// effects it returns go to the runtime
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    runtime: &mut Runtime,
    mut rx: mpsc::UnboundedReceiver<AppEvent>,
    cell_width: u16,
) -> Result<()> {
    let effects = app.start(Instant::now());
    runtime.dispatch_all(effects);

    let mut viewport = ListingViewport::default();

    while app.running {
        // Render current state
        terminal.draw(|frame| {
            let layout = browser::layout_for(app.context.content_type, frame.area().width, cell_width);
            app.set_layout(layout);
            viewport = render_ui(frame, app);
        })?;

        let timeout = app
            .next_deadline()
            .map(|d| d.saturating_duration_since(Instant::now()).min(TICK_RATE))
            .unwrap_or(TICK_RATE);

        if event::poll(timeout)? {
            let event = match event::read()? {
                // Only handle key press events (ignore releases on Windows)
                Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
                Event::Mouse(mouse) if mouse.kind == MouseEventKind::ScrollDown => {
                    Some(AppEvent::Scrolled {
                        offset: viewport.first_row + 1,
                        viewport: viewport.visible_rows,
                        content: viewport.total_rows,
                    })
                }
                _ => None,
            };
            if let Some(event) = event {
                let effects = app.handle(event, Instant::now());
                runtime.dispatch_all(effects);
            }
        }

        while let Ok(event) = rx.try_recv() {
            let effects = app.handle(event, Instant::now());
            runtime.dispatch_all(effects);
        }

        let effects = app.tick(Instant::now());
        runtime.dispatch_all(effects);

        // Let spawned fetches make progress between frames
        tokio::task::yield_now().await;
    }

    Ok(())
}

// =============================================================================
// UI Rendering
// =============================================================================

/// Main render function - dispatches to screen-specific renderers
fn render_ui(frame: &mut Frame, app: &App) -> ListingViewport {
    let area = frame.area();

    // Clear with background color
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default().style(ratatui::style::Style::default().bg(Theme::BACKGROUND)),
        area,
    );

    let continue_line = if app.screen == Screen::Browse
        && app.context.is_root()
        && !app.context.content_type.is_live()
    {
        browser::continue_line(app, 4)
    } else {
        None
    };

    // Main layout: header, continue strip, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(u16::from(continue_line.is_some())),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    if let Some(line) = continue_line {
        frame.render_widget(Paragraph::new(line), chunks[1]);
    }

    let viewport = match app.screen {
        Screen::Browse => ui::render_listing(frame, chunks[2], app),
        Screen::Player => {
            ui::render_player(frame, chunks[2], app);
            ListingViewport::default()
        }
    };
    render_status_bar(frame, chunks[3], app);

    // Render notice overlay if present
    if let Some(ref toast) = app.toast {
        render_toast(frame, area, toast);
    }
    viewport
}

/// Render the header with logo, content tabs and search box
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14), // Logo
            Constraint::Length(34), // Tabs
            Constraint::Min(1),     // Search box
        ])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![
        Span::styled(
            "ZAP",
            ratatui::style::Style::default()
                .fg(Theme::PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "CAST",
            ratatui::style::Style::default()
                .fg(Theme::SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Theme::border()),
    );
    frame.render_widget(logo, header_chunks[0]);

    let mut tabs = Vec::new();
    for (key, content) in [
        ('1', ContentType::Movie),
        ('2', ContentType::Series),
        ('3', ContentType::Tv),
    ] {
        let style = if app.context.content_type == content {
            Theme::highlighted()
        } else {
            Theme::dimmed()
        };
        tabs.push(Span::styled(format!(" {} {} ", key, content), style));
    }
    let tabs = Paragraph::new(Line::from(tabs))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Theme::border()),
        );
    frame.render_widget(tabs, header_chunks[1]);

    ui::render_search_box(
        frame,
        header_chunks[2],
        &app.search,
        &app.input_mode,
        !app.context.content_type.is_live(),
    );
}

/// Render status bar at bottom
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mode_indicator = match app.input_mode {
        InputMode::Normal => Span::styled(
            " NORMAL ",
            ratatui::style::Style::default()
                .fg(Theme::BACKGROUND)
                .bg(Theme::PRIMARY),
        ),
        InputMode::Editing => Span::styled(
            " INSERT ",
            ratatui::style::Style::default()
                .fg(Theme::BACKGROUND)
                .bg(Theme::ACCENT),
        ),
    };

    let mut trail = app.history.breadcrumb();
    trail.push(app.context.title());
    let location = Span::styled(format!(" {} ", trail.join(" › ")), Theme::dimmed());

    let help = match app.screen {
        Screen::Browse => " q:quit  /:search  r:reload  ESC:back ",
        Screen::Player => " q:quit  y:copy link  c:cast  ESC:back ",
    };

    let status_line = Line::from(vec![
        mode_indicator,
        location,
        Span::raw(" │ "),
        Span::styled(help, Theme::dimmed()),
    ]);

    let status = Paragraph::new(status_line).style(Theme::status_bar());
    frame.render_widget(status, area);
}

/// Render notice popup overlay
fn render_toast(frame: &mut Frame, area: Rect, message: &str) {
    // Calculate centered popup
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    };

    frame.render_widget(Clear, popup_area);

    let popup = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Theme::warning())),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Theme::warning())
            .title(Span::styled(" ! ", Theme::warning()))
            .style(ratatui::style::Style::default().bg(Theme::BACKGROUND)),
    );

    frame.render_widget(popup, popup_area);
}
