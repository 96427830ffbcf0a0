use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::schedule::DecoratedEvent;
use crate::theme;

pub struct EventDetail;

impl EventDetail {
    pub fn render(frame: &mut Frame, area: Rect, ev: &DecoratedEvent) {
        let popup_w = area.width.clamp(30, 60);
        let popup_h = area.height.clamp(8, 16);
        let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
        let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
        let popup_area = Rect::new(x, y, popup_w, popup_h).intersection(area);

        frame.render_widget(Clear, popup_area);

        let header = Style::default()
            .fg(theme::text_on(ev.fill))
            .bg(ev.fill)
            .add_modifier(Modifier::BOLD);
        let block = Block::default()
            .title(Span::styled(format!(" {} ", ev.event.summary), header))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ev.border));

        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let para = Paragraph::new(detail_lines(ev)).wrap(Wrap { trim: false });
        frame.render_widget(para, inner);
    }
}

fn detail_lines(ev: &DecoratedEvent) -> Vec<Line<'static>> {
    let event = &ev.event;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Time: ", theme::DIM_STYLE),
            Span::raw(event.duration_display()),
        ]),
        Line::from(vec![
            Span::styled("Date: ", theme::DIM_STYLE),
            Span::raw(event.start.date().format("%A, %B %d, %Y").to_string()),
        ]),
    ];

    if let Some(until) = &event.until {
        lines.push(Line::from(vec![
            Span::styled("Until: ", theme::DIM_STYLE),
            Span::raw(until.date().format("%B %d, %Y").to_string()),
        ]));
    }

    if !event.location.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Location: ", theme::DIM_STYLE),
            Span::raw(event.location.clone()),
        ]));
    }

    if !event.description.is_empty() {
        lines.push(Line::from(""));
        for line in event.description.lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Esc to close",
        theme::DIM_STYLE,
    )));
    lines
}
