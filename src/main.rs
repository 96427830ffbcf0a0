mod app;
mod cli;
mod components;
mod config;
mod event;
mod export;
mod logger;
mod schedule;
mod theme;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use app::{App, AppMessage, Command, LoadState};
use chrono::Local;
use clap::Parser;
use color_eyre::Result;
use crossterm::event::EventStream;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::Frame;
use tokio::sync::mpsc::{self, UnboundedSender};

use cli::Cli;
use config::Config;
use export::google::{self, GoogleAuth, GoogleCalendarClient};
use export::{DownloadDir, ExportController, ExportServices, ExportState};
use schedule::{BackendClient, Formatter};

/// Redraw delay while a modal section is sliding.
const FRAME: Duration = Duration::from_millis(40);
/// Redraw delay otherwise, so resizes are picked up.
const IDLE: Duration = Duration::from_millis(250);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let log_path = cli.log_file.clone().unwrap_or_else(config::default_log_path);
    logger::init(&log_path)?;
    log::info!(
        "starting {} {} against {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.backend.root
    );

    let config_hint = cli
        .config
        .clone()
        .or_else(config::default_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "config.toml".to_string());
    let session_path = google::session::default_path()
        .unwrap_or_else(|| PathBuf::from("google-session.toml"));

    let backend = Arc::new(BackendClient::new(&config.backend.root));
    let services = ExportServices {
        backend: backend.clone(),
        authorizer: Arc::new(GoogleAuth::new(&config.google, session_path, config_hint)),
        calendars: Arc::new(GoogleCalendarClient::new(&config.google)),
        downloader: Arc::new(DownloadDir::new(config.download_dir())),
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &config, backend, services).await;
    tui::restore()?;
    if let Err(err) = &result {
        log::error!("exiting with error: {err:#}");
    }
    result
}

/// Handles for starting background work from the UI loop.
struct Tasks {
    backend: Arc<BackendClient>,
    services: ExportServices,
    courses: PathBuf,
    formatter: Option<Formatter>,
    messages: UnboundedSender<AppMessage>,
    exports: UnboundedSender<ExportState>,
}

impl Tasks {
    fn load_events(&self) {
        let backend = self.backend.clone();
        let courses = self.courses.clone();
        let formatter = self.formatter.clone();
        let tx = self.messages.clone();

        tokio::spawn(async move {
            let result = match schedule::read_courses(&courses) {
                Ok(courses) => backend
                    .fetch_events(&courses, formatter.as_ref())
                    .await
                    .map_err(|err| err.to_string()),
                Err(err) => Err(format!("{err:#}")),
            };
            let _ = tx.send(AppMessage::EventsLoaded(result));
        });
    }

    fn check_auth(&self) {
        let authorizer = self.services.authorizer.clone();
        let tx = self.messages.clone();
        tokio::spawn(async move {
            let status = authorizer.check_silent().await;
            let _ = tx.send(AppMessage::AuthResolved(status));
        });
    }

    fn dispatch(&self, command: Command, app: &App) {
        match command {
            Command::LoadEvents => self.load_events(),
            Command::StartExport(request) => {
                let mut controller =
                    ExportController::new(self.services.clone()).with_updates(self.exports.clone());
                let events = app.events.clone();
                tokio::spawn(async move {
                    controller.run(&events, request).await;
                    log::info!("export finished: {}", controller.state().describe());
                });
            }
        }
    }
}

async fn run(
    terminal: &mut tui::Tui,
    config: &Config,
    backend: Arc<BackendClient>,
    services: ExportServices,
) -> Result<()> {
    let mut app = App::new(config.display.default_date, Local::now().date_naive());

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let (export_tx, mut export_rx) = mpsc::unbounded_channel();
    let tasks = Tasks {
        backend,
        services,
        courses: config.backend.courses.clone(),
        formatter: config.formatter.clone(),
        messages: msg_tx,
        exports: export_tx,
    };

    tasks.load_events();
    tasks.check_auth();

    let mut input = EventStream::new();

    while app.running {
        let now = Instant::now();
        terminal.draw(|frame| draw(frame, &app, now))?;
        let redraw = if app.is_animating(now) { FRAME } else { IDLE };

        tokio::select! {
            key = event::next_key_event(&mut input) => match key {
                Some(key) => {
                    if let Some(command) = app.handle_key(key?, Instant::now()) {
                        tasks.dispatch(command, &app);
                    }
                }
                None => app.running = false,
            },
            Some(msg) = msg_rx.recv() => app.on_message(msg),
            Some(state) = export_rx.recv() => app.on_export_update(state, Instant::now()),
            _ = tokio::time::sleep(redraw) => {}
        }
    }

    Ok(())
}

fn draw(frame: &mut Frame, app: &App, now: Instant) {
    let area = frame.area();
    let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);

    match &app.load_state {
        LoadState::Ready => components::WeekView::render(
            frame,
            layout[0],
            app.week_start,
            &app.decorated,
            app.selected,
        ),
        LoadState::Loading => render_notice(
            frame,
            layout[0],
            " Schedule ",
            vec!["Loading schedule...".to_string()],
            false,
        ),
        LoadState::Failed(reason) => render_notice(
            frame,
            layout[0],
            " Could not load schedule ",
            vec![
                reason.clone(),
                String::new(),
                "Press 'r' to retry or 'q' to quit.".to_string(),
            ],
            true,
        ),
    }

    if app.detail_open {
        if let Some(ev) = app.selected_event() {
            components::EventDetail::render(frame, area, ev);
        }
    }

    if let Some(modal) = &app.export_modal {
        components::ExportModal::render(frame, area, modal, &app.export_state, now);
    }

    if app.show_help {
        render_help(frame, area);
    }

    let left = app.status_left();
    let status = components::StatusLine {
        left: &left,
        auth: app.auth_status,
        message: app.status_message.as_deref(),
        is_error: matches!(
            app.export_state,
            ExportState::Failed(_) | ExportState::PartiallyFailed { .. }
        ),
    };
    components::StatusBar::render(frame, layout[1], &status);
}

fn render_notice(frame: &mut Frame, area: Rect, title: &str, lines: Vec<String>, is_error: bool) {
    use ratatui::text::Line;
    use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

    let title_style = if is_error {
        theme::ERROR_STYLE
    } else {
        theme::HEADER_STYLE
    };
    let block = Block::default()
        .title(title.to_string())
        .title_style(title_style)
        .borders(Borders::ALL)
        .border_style(theme::BORDER_STYLE);

    let lines: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let para = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    use ratatui::style::{Modifier, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

    let popup_w = area.width.clamp(30, 52);
    let popup_h = area.height.clamp(12, 20);
    let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
    let popup_area = Rect::new(x, y, popup_w, popup_h).intersection(area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Keybindings ")
        .title_style(theme::ACCENT_STYLE)
        .borders(Borders::ALL)
        .border_style(theme::ACCENT_STYLE);

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let section_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let entry = |keys: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<11}"), theme::KEY_STYLE),
            Span::raw(desc),
        ])
    };

    let lines = vec![
        Line::from(Span::styled("Week", section_style)),
        entry("[/]", "Previous/next week"),
        entry("t", "Back to the default week"),
        entry("Tab/S-Tab", "Select next/previous event"),
        entry("Enter", "Show event details"),
        Line::from(""),
        Line::from(Span::styled("Export", section_style)),
        entry("e", "Export as .ics or to Google"),
        entry("Tab", "Switch export target"),
        entry("Enter", "Start the export"),
        Line::from(""),
        entry("r", "Reload the schedule"),
        entry("Esc", "Close popup"),
        entry("q", "Quit"),
    ];

    let para = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}
