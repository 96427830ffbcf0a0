use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::schedule::DecoratedEvent;
use crate::theme;

pub const HOUR_START: u32 = 8;
pub const HOUR_END: u32 = 21;
/// Weekends are hidden.
pub const DAYS: u32 = 5;

/// Headers narrower than this use single-letter day names.
const FULL_LABEL_WIDTH: u16 = 10;

pub struct WeekView;

impl WeekView {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        week_start: NaiveDate,
        events: &[DecoratedEvent],
        selected: Option<usize>,
    ) {
        let block = Block::default()
            .title(format!(" Week of {} ", week_start.format("%b %d, %Y")))
            .title_style(theme::HEADER_STYLE)
            .borders(Borders::ALL)
            .border_style(theme::BORDER_STYLE);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.width < 10 || inner.height < 3 {
            return;
        }

        let time_col_w: u16 = if inner.width >= 60 { 6 } else { 3 };
        let col_w = (inner.width.saturating_sub(time_col_w) / DAYS as u16).max(1);

        let mut col_constraints = vec![Constraint::Length(time_col_w)];
        for _ in 0..DAYS {
            col_constraints.push(Constraint::Length(col_w));
        }
        col_constraints.push(Constraint::Min(0));
        let cols = Layout::horizontal(col_constraints).split(inner);

        // One header row, then as many rows per hour as fit.
        let content_rows = (inner.height as usize).saturating_sub(1);
        let total_hours = (HOUR_END - HOUR_START) as usize;
        let rows_per_hour = (content_rows / total_hours).max(1);
        let visible_hours = (content_rows / rows_per_hour).min(total_hours);

        let mut row_constraints = vec![Constraint::Length(1)];
        for _ in 0..visible_hours {
            row_constraints.push(Constraint::Length(rows_per_hour as u16));
        }
        row_constraints.push(Constraint::Min(0));
        let rows = Layout::vertical(row_constraints).split(inner);

        for day_offset in 0..DAYS {
            let date = week_start + Duration::days(day_offset as i64);
            let col = cols[(day_offset + 1) as usize];
            let label = Paragraph::new(Line::from(Span::styled(
                format!("{:^width$}", day_label(date, col_w), width = col_w as usize),
                theme::HEADER_STYLE,
            )));
            frame.render_widget(label, col.intersection(rows[0]));
        }

        for hour_idx in 0..visible_hours {
            let hour = HOUR_START + hour_idx as u32;
            let row = rows[hour_idx + 1];

            let time_label = if time_col_w >= 6 {
                format!("{:>2}:00 ", hour)
            } else {
                format!("{:>2} ", hour)
            };
            frame.render_widget(
                Paragraph::new(Span::styled(time_label, theme::DIM_STYLE)),
                cols[0].intersection(row),
            );

            for day_offset in 0..DAYS {
                let date = week_start + Duration::days(day_offset as i64);
                let cell = cols[(day_offset + 1) as usize].intersection(row);
                if cell.width == 0 || cell.height == 0 {
                    continue;
                }

                let in_slot = slot_events(events, date, hour);
                let Some(&(idx, ev)) = in_slot
                    .iter()
                    .find(|(i, _)| Some(*i) == selected)
                    .or_else(|| in_slot.first())
                else {
                    continue;
                };

                render_block(frame, cell, ev, hour, Some(idx) == selected, in_slot.len());
            }
        }
    }
}

fn render_block(
    frame: &mut Frame,
    cell: Rect,
    ev: &DecoratedEvent,
    hour: u32,
    is_selected: bool,
    overlapping: usize,
) {
    let width = cell.width as usize;
    let starts_here = ev
        .event
        .start
        .time()
        .map_or(true, |t| {
            t < hour_time(hour + 1) && (hour == HOUR_START || t >= hour_time(hour))
        });

    let mut text = if starts_here {
        ev.event.summary.clone()
    } else {
        String::new()
    };
    if starts_here && overlapping > 1 {
        text = format!("{text} +{}", overlapping - 1);
    }
    let body: String = text.chars().take(width.saturating_sub(1)).collect();

    let mut style = Style::default().fg(theme::text_on(ev.fill)).bg(ev.fill);
    if is_selected {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    let mut lines = vec![Line::from(vec![
        Span::styled("\u{258c}", Style::default().fg(ev.border).bg(ev.fill)),
        Span::styled(format!("{:<w$}", body, w = width.saturating_sub(1)), style),
    ])];
    // Fill the rest of the cell when an hour spans several rows.
    for _ in 1..cell.height {
        lines.push(Line::from(vec![
            Span::styled("\u{258c}", Style::default().fg(ev.border).bg(ev.fill)),
            Span::styled(" ".repeat(width.saturating_sub(1)), style),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), cell);
}

fn hour_time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Day header: the full weekday name, or a one-letter abbreviation when narrow.
pub fn day_label(date: NaiveDate, width: u16) -> String {
    if width >= FULL_LABEL_WIDTH {
        return date.format("%A").to_string();
    }
    match date.weekday() {
        Weekday::Mon => "M",
        Weekday::Tue => "T",
        Weekday::Wed => "W",
        Weekday::Thu => "R",
        Weekday::Fri => "F",
        Weekday::Sat => "S",
        Weekday::Sun => "U",
    }
    .to_string()
}

/// Timed events on `date` that overlap `[hour, hour + 1)`, with their indices.
pub fn slot_events(
    events: &[DecoratedEvent],
    date: NaiveDate,
    hour: u32,
) -> Vec<(usize, &DecoratedEvent)> {
    let slot_start = hour_time(hour);
    let slot_end = hour_time(hour + 1);

    events
        .iter()
        .enumerate()
        .filter(|(_, ev)| {
            let (Some(start), Some(end)) = (ev.event.start.naive_local(), ev.event.end.naive_local())
            else {
                return false;
            };
            start.date() == date && start.time() < slot_end && end.time() > slot_start
        })
        .collect()
}

/// Whether the event appears anywhere in the grid for the given week.
pub fn is_visible(ev: &DecoratedEvent, week_start: NaiveDate) -> bool {
    let Some(start) = ev.event.start.naive_local() else {
        return false;
    };
    let Some(end) = ev.event.end.naive_local() else {
        return false;
    };
    let offset = (start.date() - week_start).num_days();
    (0..DAYS as i64).contains(&offset)
        && start.time() < hour_time(HOUR_END)
        && end.time() > hour_time(HOUR_START)
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::schedule::{decorate_all, Event};

    fn event(summary: &str, start: &str, end: &str, group: u32) -> Event {
        serde_json::from_value(serde_json::json!({
            "summary": summary,
            "start": start,
            "end": end,
            "group": group
        }))
        .unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 9, 7).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        let thursday = NaiveDate::from_ymd_opt(2015, 9, 10).unwrap();
        assert_eq!(week_start(thursday), monday());
        assert_eq!(week_start(monday()), monday());
    }

    #[test]
    fn narrow_headers_are_abbreviated() {
        let thursday = NaiveDate::from_ymd_opt(2015, 9, 10).unwrap();
        assert_eq!(day_label(thursday, 14), "Thursday");
        assert_eq!(day_label(thursday, 6), "R");
        assert_eq!(day_label(monday(), 3), "M");
        assert_eq!(day_label(monday() + Duration::days(4), 9), "F");
    }

    #[test]
    fn slots_cover_partial_hours() {
        let events = decorate_all(&[
            event("COMP 250", "2015-09-08T10:05:00-04:00", "2015-09-08T11:25:00-04:00", 1),
            event("Reading", "2015-09-08", "2015-09-08", 2),
        ])
        .unwrap();
        let tuesday = monday() + Duration::days(1);

        assert!(slot_events(&events, tuesday, 9).is_empty());
        assert_eq!(slot_events(&events, tuesday, 10).len(), 1);
        assert_eq!(slot_events(&events, tuesday, 11)[0].0, 0);
        assert!(slot_events(&events, tuesday, 12).is_empty());
        assert!(slot_events(&events, monday(), 10).is_empty());
    }

    #[test]
    fn visibility_respects_hours_weekdays_and_all_day() {
        let events = decorate_all(&[
            event("Morning", "2015-09-07T06:00:00-04:00", "2015-09-07T07:30:00-04:00", 1),
            event("Saturday", "2015-09-12T10:00:00-04:00", "2015-09-12T11:00:00-04:00", 1),
            event("All day", "2015-09-08", "2015-09-08", 1),
            event("Lecture", "2015-09-11T20:30:00-04:00", "2015-09-11T22:00:00-04:00", 1),
            event("Next week", "2015-09-14T10:00:00-04:00", "2015-09-14T11:00:00-04:00", 1),
        ])
        .unwrap();

        let visible: Vec<&str> = events
            .iter()
            .filter(|e| is_visible(e, monday()))
            .map(|e| e.event.summary.as_str())
            .collect();
        assert_eq!(visible, vec!["Lecture"]);
    }

    #[test]
    fn renders_headers_and_titles() {
        let events = decorate_all(&[event(
            "MATH 133 - L",
            "2015-09-09T13:05:00-04:00",
            "2015-09-09T14:25:00-04:00",
            3,
        )])
        .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|frame| WeekView::render(frame, frame.area(), monday(), &events, Some(0)))
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Monday"));
        assert!(text.contains("Friday"));
        assert!(!text.contains("Saturday"));
        assert!(text.contains("MATH 133"));
        assert!(text.contains(" 8:00"));
        assert!(text.contains("20:00"));
    }
}
