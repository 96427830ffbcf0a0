use ratatui::style::Color;
use thiserror::Error;

use super::event::{DecoratedEvent, Event};
use crate::theme::rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub fill: Color,
    pub border: Color,
}

impl ColorPair {
    const fn new(fill: u32, border: u32) -> Self {
        Self {
            fill: rgb(fill),
            border: rgb(border),
        }
    }
}

/// Fill/border pairs, indexed by `group - 1`.
pub const PALETTE: [ColorPair; 7] = [
    ColorPair::new(0xF44336, 0xe53935), // Red
    ColorPair::new(0x9C27B0, 0x8E24AA), // Purple
    ColorPair::new(0x2196F3, 0x1E88E5), // Blue
    ColorPair::new(0x8BC34A, 0x7CB342), // Light Green
    ColorPair::new(0xFFC107, 0xFFB300), // Amber
    ColorPair::new(0x3F51B5, 0x3949AB), // Indigo
    ColorPair::new(0x607D8B, 0x546E7A), // Blue Grey
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("event '{summary}' has group {group}, expected 1..={max}")]
    GroupOutOfRange {
        summary: String,
        group: u32,
        max: usize,
    },
}

pub fn color_pair(group: u32) -> Option<ColorPair> {
    let idx = (group as usize).checked_sub(1)?;
    PALETTE.get(idx).copied()
}

pub fn decorate(event: &Event) -> Result<DecoratedEvent, PaletteError> {
    let colors = color_pair(event.group).ok_or_else(|| PaletteError::GroupOutOfRange {
        summary: event.summary.clone(),
        group: event.group,
        max: PALETTE.len(),
    })?;

    Ok(DecoratedEvent {
        event: event.clone(),
        fill: colors.fill,
        border: colors.border,
    })
}

pub fn decorate_all(events: &[Event]) -> Result<Vec<DecoratedEvent>, PaletteError> {
    events.iter().map(decorate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::event::EventTime;
    use chrono::NaiveDate;

    fn event(group: u32) -> Event {
        let day = NaiveDate::from_ymd_opt(2015, 9, 10).unwrap();
        Event {
            summary: format!("group {group}"),
            description: String::new(),
            location: String::new(),
            start: EventTime::Date(day),
            end: EventTime::Date(day),
            until: None,
            group,
            extra: Default::default(),
        }
    }

    #[test]
    fn decoration_is_deterministic_for_every_group() {
        for group in 1..=PALETTE.len() as u32 {
            let ev = event(group);
            let first = decorate(&ev).unwrap();
            let second = decorate(&ev).unwrap();
            assert_eq!(first.fill, second.fill);
            assert_eq!(first.border, second.border);
            assert_eq!(first.fill, PALETTE[group as usize - 1].fill);
            assert_eq!(first.event, ev);
        }
    }

    #[test]
    fn first_group_is_red() {
        let dec = decorate(&event(1)).unwrap();
        assert_eq!(dec.fill, Color::Rgb(0xF4, 0x43, 0x36));
        assert_eq!(dec.border, Color::Rgb(0xe5, 0x39, 0x35));
    }

    #[test]
    fn out_of_range_groups_are_rejected() {
        assert!(matches!(
            decorate(&event(0)),
            Err(PaletteError::GroupOutOfRange { group: 0, max: 7, .. })
        ));
        assert!(decorate(&event(8)).is_err());
        assert!(decorate_all(&[event(1), event(42), event(2)]).is_err());
    }
}
