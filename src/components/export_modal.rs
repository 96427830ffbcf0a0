use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::modal::{ModalBodies, Section};
use crate::export::{CalendarName, Completion, ExportRequest, ExportState, ICS_FILENAME};
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Ics,
    Gcal,
}

impl Target {
    pub fn toggle(self) -> Self {
        match self {
            Target::Ics => Target::Gcal,
            Target::Gcal => Target::Ics,
        }
    }

    fn section(self) -> Section {
        match self {
            Target::Ics => Section::IcsInstructions,
            Target::Gcal => Section::GcalInstructions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportModalState {
    pub bodies: ModalBodies,
    pub target: Target,
    pub name_input: String,
    pub name_invalid: bool,
}

impl ExportModalState {
    /// Open on the `.ics` instructions, keeping any name typed earlier.
    pub fn open(name_input: String, now: Instant) -> Self {
        let mut bodies = ModalBodies::default();
        bodies.display(Section::IcsInstructions, now);
        Self {
            bodies,
            target: Target::Ics,
            name_input,
            name_invalid: false,
        }
    }

    pub fn choose(&mut self, target: Target, now: Instant) {
        self.target = target;
        self.bodies.display(target.section(), now);
    }

    pub fn toggle_target(&mut self, now: Instant) {
        self.choose(self.target.toggle(), now);
    }

    /// Keystrokes go to the name field only while its section is showing.
    pub fn is_typing(&self) -> bool {
        self.target == Target::Gcal && self.bodies.is_open(Section::GcalInstructions)
    }

    pub fn input_char(&mut self, c: char) {
        if self.is_typing() {
            self.name_input.push(c);
            self.name_invalid = false;
        }
    }

    pub fn backspace(&mut self) {
        if self.is_typing() {
            self.name_input.pop();
            self.name_invalid = false;
        }
    }

    /// Build the request for the chosen target. An invalid calendar name
    /// marks the field and keeps the modal where it is.
    pub fn submit(&mut self) -> Option<ExportRequest> {
        match self.target {
            Target::Ics => Some(ExportRequest::Ics),
            Target::Gcal => match CalendarName::parse(&self.name_input) {
                Ok(name) => {
                    self.name_invalid = false;
                    Some(ExportRequest::Gcal(name))
                }
                Err(err) => {
                    log::debug!("rejected calendar name {:?}: {err}", self.name_input);
                    self.name_invalid = true;
                    None
                }
            },
        }
    }

    pub fn on_export_state(&mut self, state: &ExportState, now: Instant) {
        if state.is_running() {
            self.bodies.display(Section::Working, now);
            return;
        }
        match state {
            ExportState::Complete(_) | ExportState::PartiallyFailed { .. } => {
                self.bodies.show_footer(now)
            }
            ExportState::Failed(_) => self.bodies.display(Section::Error, now),
            _ => {}
        }
    }
}

fn full_height(section: Section) -> u16 {
    match section {
        Section::IcsInstructions => 3,
        Section::GcalInstructions => 6,
        Section::Working => 2,
        Section::Error => 3,
        Section::Footer => 3,
    }
}

pub struct ExportModal;

impl ExportModal {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        state: &ExportModalState,
        export: &ExportState,
        now: Instant,
    ) {
        let popup_w = area.width.clamp(40, 64);
        let popup_h = area.height.clamp(10, 15);
        let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
        let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
        let popup_area = Rect::new(x, y, popup_w, popup_h).intersection(area);

        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(" Export schedule ")
            .title_style(theme::ACCENT_STYLE)
            .borders(Borders::ALL)
            .border_style(theme::ACCENT_STYLE);
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let mut constraints = vec![Constraint::Length(1), Constraint::Length(1)];
        for section in Section::ALL {
            let h = f32::from(full_height(section)) * state.bodies.extent(section, now);
            constraints.push(Constraint::Length(h.ceil() as u16));
        }
        constraints.push(Constraint::Min(0));
        constraints.push(Constraint::Length(1));
        let rows = Layout::vertical(constraints).split(inner);

        render_tabs(frame, rows[0], state.target, export.is_running());

        for (i, section) in Section::ALL.into_iter().enumerate() {
            let rect = rows[i + 2];
            if rect.height == 0 {
                continue;
            }
            match section {
                Section::IcsInstructions => render_ics(frame, rect),
                Section::GcalInstructions => render_gcal(frame, rect, state),
                Section::Working => render_text(
                    frame,
                    rect,
                    vec![Line::from(Span::styled(export.describe(), theme::HEADER_STYLE))],
                ),
                Section::Error => render_error(frame, rect, export),
                Section::Footer => render_footer(frame, rect, export),
            }
        }

        let hints = if export.is_running() {
            "Working..."
        } else {
            "Tab:Switch  Enter:Export  Esc:Close"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(hints, theme::DIM_STYLE)),
            rows[rows.len() - 1],
        );
    }
}

fn render_tabs(frame: &mut Frame, area: Rect, target: Target, busy: bool) {
    let tab = |label: &'static str, active: bool| {
        if active && !busy {
            Span::styled(label, theme::SELECTED_STYLE)
        } else if active {
            Span::styled(label, theme::HEADER_STYLE)
        } else {
            Span::styled(label, theme::DIM_STYLE)
        }
    };
    let line = Line::from(vec![
        tab(" .ics file ", target == Target::Ics),
        Span::raw(" "),
        tab(" Google Calendar ", target == Target::Gcal),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_text(frame: &mut Frame, area: Rect, lines: Vec<Line>) {
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_ics(frame: &mut Frame, area: Rect) {
    render_text(
        frame,
        area,
        vec![
            Line::from(format!("Save the schedule as {ICS_FILENAME} in your")),
            Line::from("download folder, ready to import anywhere."),
        ],
    );
}

fn render_gcal(frame: &mut Frame, area: Rect, state: &ExportModalState) {
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(area);

    render_text(
        frame,
        rows[0],
        vec![Line::from("Create a new Google Calendar named:")],
    );

    let border = if state.name_invalid {
        theme::ERROR_STYLE
    } else if state.is_typing() {
        theme::KEY_STYLE
    } else {
        theme::BORDER_STYLE
    };
    let input = Block::default()
        .borders(Borders::ALL)
        .border_style(border);
    let cursor = if state.is_typing() { "_" } else { "" };
    frame.render_widget(
        Paragraph::new(format!("{}{cursor}", state.name_input)).block(input),
        rows[1],
    );

    if state.name_invalid {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Use only letters, digits and spaces.",
                theme::ERROR_STYLE,
            )),
            rows[2],
        );
    }
}

fn render_error(frame: &mut Frame, area: Rect, export: &ExportState) {
    let mut lines = vec![Line::from(Span::styled(
        "Something went wrong. Please try again.",
        theme::ERROR_STYLE,
    ))];
    if let ExportState::Failed(reason) = export {
        lines.push(Line::from(Span::styled(reason.clone(), theme::DIM_STYLE)));
    }
    render_text(frame, area, lines);
}

fn render_footer(frame: &mut Frame, area: Rect, export: &ExportState) {
    let style: Style = match export {
        ExportState::PartiallyFailed { .. } => theme::ERROR_STYLE,
        _ => theme::SUCCESS_STYLE,
    };
    let mut lines = vec![Line::from(Span::styled(export.describe(), style))];
    if let ExportState::Complete(Completion::Imported { .. }) = export {
        lines.push(Line::from("It is now listed in your Google Calendar."));
    }
    render_text(frame, area, lines);
}
