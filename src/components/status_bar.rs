use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::export::google::AuthStatus;
use crate::theme;

/// What the status bar needs to know about the session.
pub struct StatusLine<'a> {
    pub left: &'a str,
    pub auth: AuthStatus,
    pub message: Option<&'a str>,
    pub is_error: bool,
}

pub struct StatusBar;

impl StatusBar {
    pub fn render(frame: &mut Frame, area: Rect, status: &StatusLine) {
        let w = area.width as usize;

        let right = match status.message {
            Some(msg) => format!(" {msg} "),
            None => hints(w).to_string(),
        };
        let auth = if w >= 60 {
            format!(" [{}] ", status.auth)
        } else {
            String::new()
        };
        let left = format!(" {}", status.left);

        let padding = " ".repeat(
            w.saturating_sub(left.chars().count() + auth.chars().count() + right.chars().count()),
        );

        let right_style = if status.is_error {
            theme::STATUS_STYLE.patch(Style::new().fg(ratatui::style::Color::LightRed))
        } else {
            theme::STATUS_STYLE
        };

        let line = Line::from(vec![
            Span::styled(left, theme::STATUS_STYLE),
            Span::styled(auth, theme::STATUS_STYLE),
            Span::styled(padding, theme::STATUS_STYLE),
            Span::styled(right, right_style),
        ]);

        frame.render_widget(Paragraph::new(line).style(theme::STATUS_STYLE), area);
    }
}

fn hints(width: usize) -> &'static str {
    if width >= 90 {
        " Tab:Select Enter:Detail [/]:Week t:Default e:Export ?:Help q:Quit "
    } else if width >= 50 {
        " Tab:Select [/]:Week e:Export q:Quit "
    } else {
        " ?:Help q:Quit "
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_shrink_with_width() {
        assert!(hints(120).contains("Enter:Detail"));
        assert!(!hints(60).contains("Enter:Detail"));
        assert_eq!(hints(20), " ?:Help q:Quit ");
    }
}
