use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Start or end of an event: either a zoned date-time or a whole date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl EventTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::DateTime(dt) => dt.date_naive(),
            EventTime::Date(d) => *d,
        }
    }

    /// Wall-clock time as written by the backend, without converting zones.
    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            EventTime::DateTime(dt) => Some(dt.time()),
            EventTime::Date(_) => None,
        }
    }

    pub fn naive_local(&self) -> Option<NaiveDateTime> {
        match self {
            EventTime::DateTime(dt) => Some(dt.naive_local()),
            EventTime::Date(_) => None,
        }
    }
}

/// One calendar entry as produced by the backend's `/events` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(alias = "title")]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub until: Option<EventTime>,
    pub group: u32,
    /// Backend-owned fields we don't interpret, sent back untouched on export.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn duration_display(&self) -> String {
        match (self.start.time(), self.end.time()) {
            (Some(start), Some(end)) => {
                format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
            }
            _ => "All day".to_string(),
        }
    }
}

/// An event ready for display, carrying its group's fill and border colors.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedEvent {
    pub event: Event,
    pub fill: Color,
    pub border: Color,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_event_with_offset() {
        let ev: Event = serde_json::from_str(
            r#"{
                "summary": "COMP 250 - L",
                "description": "Intro to CS - 001\nJane Doe",
                "location": "Trottier 0100",
                "start": "2015-09-08T10:05:00-04:00",
                "end": "2015-09-08T11:25:00-04:00",
                "until": "2015-12-03T11:25:00-05:00",
                "group": 2
            }"#,
        )
        .unwrap();

        assert_eq!(ev.summary, "COMP 250 - L");
        assert_eq!(ev.group, 2);
        assert_eq!(ev.start.date(), NaiveDate::from_ymd_opt(2015, 9, 8).unwrap());
        assert_eq!(ev.start.time(), NaiveTime::from_hms_opt(10, 5, 0));
        assert_eq!(ev.duration_display(), "10:05 - 11:25");
        assert!(ev.end.time().is_some());
    }

    #[test]
    fn accepts_title_alias_and_date_only_times() {
        let ev: Event = serde_json::from_str(
            r#"{"title": "Reading week", "start": "2015-10-12", "end": "2015-10-16", "group": 1}"#,
        )
        .unwrap();

        assert_eq!(ev.summary, "Reading week");
        assert_eq!(ev.start, EventTime::Date(NaiveDate::from_ymd_opt(2015, 10, 12).unwrap()));
        assert_eq!(ev.start.time(), None);
        assert_eq!(ev.duration_display(), "All day");
        assert!(ev.description.is_empty());
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let ev: Event = serde_json::from_str(
            r#"{"summary": "X", "start": "2015-10-12", "end": "2015-10-12", "group": 1, "code": "MATH 133"}"#,
        )
        .unwrap();

        let back = serde_json::to_value(&ev).unwrap();
        assert_eq!(back["code"], "MATH 133");
        assert_eq!(back["group"], 1);
    }
}
