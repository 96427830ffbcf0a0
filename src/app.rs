use std::time::Instant;

use chrono::{Duration, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::components::export_modal::ExportModalState;
use crate::components::week_view;
use crate::export::google::AuthStatus;
use crate::export::{CalendarName, Completion, ExportRequest, ExportState};
use crate::schedule::{decorate_all, DecoratedEvent, Event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Results of background work, delivered to the UI loop.
#[derive(Debug)]
pub enum AppMessage {
    EventsLoaded(Result<Vec<Event>, String>),
    AuthResolved(AuthStatus),
}

/// Work the UI loop should start on the app's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadEvents,
    StartExport(ExportRequest),
}

pub struct App {
    pub running: bool,
    pub load_state: LoadState,
    pub events: Vec<Event>,
    pub decorated: Vec<DecoratedEvent>,
    configured_date: Option<NaiveDate>,
    today: NaiveDate,
    pub default_date: NaiveDate,
    pub week_start: NaiveDate,
    pub selected: Option<usize>,
    pub detail_open: bool,
    pub export_modal: Option<ExportModalState>,
    pub export_state: ExportState,
    pub auth_status: AuthStatus,
    pub calendar_name: Option<CalendarName>,
    pub show_help: bool,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(configured_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        let default_date = configured_date.unwrap_or(today);
        Self {
            running: true,
            load_state: LoadState::Loading,
            events: Vec::new(),
            decorated: Vec::new(),
            configured_date,
            today,
            default_date,
            week_start: week_view::week_start(default_date),
            selected: None,
            detail_open: false,
            export_modal: None,
            export_state: ExportState::Idle,
            auth_status: AuthStatus::Unknown,
            calendar_name: None,
            show_help: false,
            status_message: None,
        }
    }

    pub fn on_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::EventsLoaded(Ok(events)) => self.set_events(events),
            AppMessage::EventsLoaded(Err(reason)) => {
                log::error!("could not load schedule: {reason}");
                self.load_state = LoadState::Failed(reason);
            }
            AppMessage::AuthResolved(status) => {
                log::info!("silent auth check: {status}");
                self.auth_status = status;
            }
        }
    }

    fn set_events(&mut self, events: Vec<Event>) {
        let decorated = match decorate_all(&events) {
            Ok(decorated) => decorated,
            Err(err) => {
                log::error!("could not decorate events: {err}");
                self.load_state = LoadState::Failed(err.to_string());
                return;
            }
        };

        let latest = events.iter().map(|e| e.start.date()).max();
        self.default_date = self.configured_date.or(latest).unwrap_or(self.today);
        self.week_start = week_view::week_start(self.default_date);
        log::info!(
            "loaded {} events, showing week of {}",
            events.len(),
            self.week_start
        );

        self.events = events;
        self.decorated = decorated;
        self.selected = None;
        self.detail_open = false;
        self.load_state = LoadState::Ready;
    }

    pub fn on_export_update(&mut self, state: ExportState, now: Instant) {
        if let Some(modal) = &mut self.export_modal {
            modal.on_export_state(&state, now);
        }
        match &state {
            ExportState::Complete(Completion::Imported { .. })
            | ExportState::PartiallyFailed { .. } => {
                self.auth_status = AuthStatus::Authorized;
            }
            _ => {}
        }
        if state.is_finished() {
            self.status_message = Some(state.describe());
        }
        self.export_state = state;
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return None;
        }

        self.status_message = None;

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return None;
        }

        if self.export_modal.is_some() {
            return self.handle_modal_key(key, now);
        }

        if self.detail_open {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.detail_open = false;
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('r') => {
                self.load_state = LoadState::Loading;
                return Some(Command::LoadEvents);
            }
            _ if self.load_state != LoadState::Ready => {}
            KeyCode::Char('e') => self.open_export(now),
            KeyCode::Tab => self.select_next(),
            KeyCode::BackTab => self.select_prev(),
            KeyCode::Enter => self.detail_open = self.selected.is_some(),
            KeyCode::Char('[') => self.shift_week(-1),
            KeyCode::Char(']') => self.shift_week(1),
            KeyCode::Char('t') => self.go_to_default_week(),
            _ => {}
        }
        None
    }

    fn handle_modal_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        let busy = self.export_state.is_running();
        let modal = self.export_modal.as_mut()?;

        match key.code {
            KeyCode::Esc if !busy => self.close_export(),
            KeyCode::Tab | KeyCode::BackTab if !busy => {
                self.export_state = ExportState::Idle;
                modal.toggle_target(now);
            }
            KeyCode::Enter if !busy => {
                let request = modal.submit()?;
                if let ExportRequest::Gcal(name) = &request {
                    self.calendar_name = Some(name.clone());
                }
                log::info!("starting {} export", request.format());
                // Busy from here on, before the task reports anything.
                self.on_export_update(ExportState::FormatChosen(request.format()), now);
                return Some(Command::StartExport(request));
            }
            KeyCode::Backspace if !busy => modal.backspace(),
            KeyCode::Char(c) if modal.is_typing() && !busy => modal.input_char(c),
            KeyCode::Char('q') if !busy => self.close_export(),
            _ => {}
        }
        None
    }

    fn open_export(&mut self, now: Instant) {
        if self.export_state.is_finished() {
            self.export_state = ExportState::Idle;
        }
        let name = self
            .calendar_name
            .as_ref()
            .map(|n| n.to_string())
            .unwrap_or_default();
        self.export_modal = Some(ExportModalState::open(name, now));
    }

    fn close_export(&mut self) {
        self.export_modal = None;
        if self.export_state.is_finished() {
            self.export_state = ExportState::Idle;
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.export_modal
            .as_ref()
            .is_some_and(|modal| modal.bodies.is_animating(now))
    }

    /// Events drawn in the current week, in start order.
    pub fn visible_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .decorated
            .iter()
            .enumerate()
            .filter(|(_, ev)| week_view::is_visible(ev, self.week_start))
            .map(|(i, _)| i)
            .collect();
        indices.sort_by_key(|&i| self.decorated[i].event.start.naive_local());
        indices
    }

    pub fn selected_event(&self) -> Option<&DecoratedEvent> {
        self.selected.and_then(|i| self.decorated.get(i))
    }

    fn select_next(&mut self) {
        let visible = self.visible_indices();
        self.selected = match self.selected.and_then(|s| visible.iter().position(|&i| i == s)) {
            Some(pos) => visible.get((pos + 1) % visible.len()).copied(),
            None => visible.first().copied(),
        };
    }

    fn select_prev(&mut self) {
        let visible = self.visible_indices();
        self.selected = match self.selected.and_then(|s| visible.iter().position(|&i| i == s)) {
            Some(pos) => visible.get((pos + visible.len() - 1) % visible.len()).copied(),
            None => visible.last().copied(),
        };
    }

    fn shift_week(&mut self, weeks: i64) {
        self.week_start += Duration::weeks(weeks);
        self.selected = None;
    }

    fn go_to_default_week(&mut self) {
        self.week_start = week_view::week_start(self.default_date);
        self.selected = None;
    }

    pub fn status_left(&self) -> String {
        match &self.load_state {
            LoadState::Loading => "Loading schedule...".to_string(),
            LoadState::Failed(_) => "Could not load schedule (r: retry)".to_string(),
            LoadState::Ready => {
                let n = self.visible_indices().len();
                format!("{n} event{} this week", if n == 1 { "" } else { "s" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn event(summary: &str, start: &str, end: &str, group: u32) -> Event {
        serde_json::from_value(serde_json::json!({
            "summary": summary,
            "start": start,
            "end": end,
            "group": group
        }))
        .unwrap()
    }

    fn schedule() -> Vec<Event> {
        vec![
            event("MATH 133", "2015-09-09T13:05:00-04:00", "2015-09-09T14:25:00-04:00", 1),
            event("COMP 250", "2015-09-08T10:05:00-04:00", "2015-09-08T11:25:00-04:00", 2),
            event("FINAL", "2015-12-10T09:00:00-05:00", "2015-12-10T12:00:00-05:00", 3),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn loaded(configured: Option<NaiveDate>) -> App {
        let mut app = App::new(configured, today());
        app.on_message(AppMessage::EventsLoaded(Ok(schedule())));
        app
    }

    #[test]
    fn default_week_is_latest_start_unless_configured() {
        let app = loaded(None);
        assert_eq!(app.load_state, LoadState::Ready);
        assert_eq!(app.default_date, NaiveDate::from_ymd_opt(2015, 12, 10).unwrap());
        assert_eq!(app.week_start, NaiveDate::from_ymd_opt(2015, 12, 7).unwrap());

        let sept = NaiveDate::from_ymd_opt(2015, 9, 10).unwrap();
        let app = loaded(Some(sept));
        assert_eq!(app.week_start, NaiveDate::from_ymd_opt(2015, 9, 7).unwrap());
    }

    #[test]
    fn tab_cycles_visible_events_in_start_order() {
        let mut app = loaded(NaiveDate::from_ymd_opt(2015, 9, 10));
        let now = Instant::now();

        app.handle_key(key(KeyCode::Tab), now);
        assert_eq!(app.selected_event().unwrap().event.summary, "COMP 250");
        app.handle_key(key(KeyCode::Tab), now);
        assert_eq!(app.selected_event().unwrap().event.summary, "MATH 133");
        app.handle_key(key(KeyCode::Tab), now);
        assert_eq!(app.selected_event().unwrap().event.summary, "COMP 250");
        app.handle_key(key(KeyCode::BackTab), now);
        assert_eq!(app.selected_event().unwrap().event.summary, "MATH 133");

        app.handle_key(key(KeyCode::Enter), now);
        assert!(app.detail_open);
        app.handle_key(key(KeyCode::Esc), now);
        assert!(!app.detail_open);
    }

    #[test]
    fn week_navigation_clears_selection() {
        let mut app = loaded(None);
        let now = Instant::now();
        let default = app.week_start;

        app.handle_key(key(KeyCode::Tab), now);
        assert!(app.selected.is_some());
        app.handle_key(key(KeyCode::Char('[')), now);
        assert_eq!(app.week_start, default - Duration::weeks(1));
        assert_eq!(app.selected, None);

        app.handle_key(key(KeyCode::Char(']')), now);
        app.handle_key(key(KeyCode::Char(']')), now);
        app.handle_key(key(KeyCode::Char('t')), now);
        assert_eq!(app.week_start, default);
    }

    #[test]
    fn load_failure_is_visible_and_retryable() {
        let mut app = App::new(None, today());
        app.on_message(AppMessage::EventsLoaded(Err("connection refused".into())));
        assert_eq!(app.load_state, LoadState::Failed("connection refused".into()));
        assert!(app.status_left().contains("Could not load schedule"));

        // Export is unavailable without a schedule.
        app.handle_key(key(KeyCode::Char('e')), Instant::now());
        assert!(app.export_modal.is_none());

        assert_eq!(
            app.handle_key(key(KeyCode::Char('r')), Instant::now()),
            Some(Command::LoadEvents)
        );
        assert_eq!(app.load_state, LoadState::Loading);
    }

    #[test]
    fn bad_group_fails_the_load() {
        let mut app = App::new(None, today());
        app.on_message(AppMessage::EventsLoaded(Ok(vec![event(
            "X",
            "2015-09-08T10:05:00-04:00",
            "2015-09-08T11:25:00-04:00",
            9,
        )])));
        assert!(matches!(app.load_state, LoadState::Failed(_)));
        assert!(app.decorated.is_empty());
    }

    #[test]
    fn gcal_export_requires_a_valid_name() {
        let mut app = loaded(None);
        let now = Instant::now();

        app.handle_key(key(KeyCode::Char('e')), now);
        app.handle_key(key(KeyCode::Tab), now);
        for c in "Fall;".chars() {
            assert_eq!(app.handle_key(key(KeyCode::Char(c)), now), None);
        }
        assert_eq!(app.handle_key(key(KeyCode::Enter), now), None);
        assert!(app.export_modal.as_ref().unwrap().name_invalid);

        // 'q' is text while typing.
        app.handle_key(key(KeyCode::Backspace), now);
        app.handle_key(key(KeyCode::Char('q')), now);
        assert!(app.running);

        let cmd = app.handle_key(key(KeyCode::Enter), now);
        let name = CalendarName::parse("Fallq").unwrap();
        assert_eq!(cmd, Some(Command::StartExport(ExportRequest::Gcal(name.clone()))));
        assert_eq!(app.calendar_name, Some(name));
    }

    #[test]
    fn export_updates_drive_modal_and_auth() {
        let mut app = loaded(None);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('e')), now);

        app.on_export_update(ExportState::AuthPath, now);
        // No closing mid-export.
        app.handle_key(key(KeyCode::Esc), now);
        assert!(app.export_modal.is_some());

        app.on_export_update(
            ExportState::Complete(Completion::Imported {
                calendar_id: "cal".into(),
                inserted: 3,
            }),
            now,
        );
        assert_eq!(app.auth_status, AuthStatus::Authorized);
        assert!(app.status_message.is_some());

        app.handle_key(key(KeyCode::Esc), now);
        assert!(app.export_modal.is_none());
        assert_eq!(app.export_state, ExportState::Idle);
    }

    #[test]
    fn repeated_enter_starts_one_export() {
        let mut app = loaded(None);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('e')), now);

        assert_eq!(
            app.handle_key(key(KeyCode::Enter), now),
            Some(Command::StartExport(ExportRequest::Ics))
        );
        assert_eq!(app.export_state, ExportState::FormatChosen(ExportFormat::Ics));
        assert_eq!(app.handle_key(key(KeyCode::Enter), now), None);
    }

    #[test]
    fn name_is_frozen_while_exporting() {
        let mut app = loaded(None);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('e')), now);
        app.handle_key(key(KeyCode::Tab), now);
        for c in "Fall".chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
        // Running, but the name field is still showing.
        app.export_state = ExportState::AuthPath;
        assert!(app.export_modal.as_ref().unwrap().is_typing());

        app.handle_key(key(KeyCode::Backspace), now);
        app.handle_key(key(KeyCode::Char('x')), now);
        assert_eq!(app.export_modal.as_ref().unwrap().name_input, "Fall");
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let mut app = loaded(None);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('?')), now);
        app.handle_key(key(KeyCode::Char('q')), now);
        assert!(app.running);
        app.handle_key(key(KeyCode::Esc), now);
        app.handle_key(key(KeyCode::Char('q')), now);
        assert!(!app.running);
    }
}
