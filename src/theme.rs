use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::White)
    .add_modifier(Modifier::BOLD);
pub const DIM_STYLE: Style = Style::new().fg(Color::DarkGray);
pub const BORDER_STYLE: Style = Style::new().fg(Color::Gray);
pub const STATUS_STYLE: Style = Style::new().fg(Color::White).bg(Color::DarkGray);
pub const SELECTED_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const ERROR_STYLE: Style = Style::new().fg(Color::LightRed).add_modifier(Modifier::BOLD);
pub const SUCCESS_STYLE: Style = Style::new().fg(Color::LightGreen).add_modifier(Modifier::BOLD);
pub const ACCENT_STYLE: Style = Style::new().fg(Color::Green).add_modifier(Modifier::BOLD);
pub const KEY_STYLE: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);

/// Build an RGB color from a `0xRRGGBB` literal.
pub const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

/// Pick black or white text for legibility on `bg`.
pub fn text_on(bg: Color) -> Color {
    match bg {
        Color::Rgb(r, g, b) => {
            // ITU-R BT.601 luma
            let luma = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
            if luma > 150_000 {
                Color::Black
            } else {
                Color::White
            }
        }
        Color::Yellow | Color::LightYellow | Color::Cyan | Color::LightCyan | Color::White => {
            Color::Black
        }
        _ => Color::White,
    }
}
