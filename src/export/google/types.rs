use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A Calendar API event resource, as the backend's `gcal` format serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: GoogleEventTime,
    pub end: GoogleEventTime,
    #[serde(
        default,
        deserialize_with = "recurrence_lines",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub recurrence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// The backend sends recurrence either as the API's plain list of lines or
/// keyed by rule kind, e.g. `{"rrule": ["RRULE:FREQ=WEEKLY;UNTIL=..."]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecurrenceField {
    Lines(Vec<String>),
    Keyed(BTreeMap<String, Vec<String>>),
}

fn recurrence_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RecurrenceField>::deserialize(deserializer)? {
        Some(RecurrenceField::Lines(lines)) => lines,
        Some(RecurrenceField::Keyed(map)) => map.into_values().flatten().collect(),
        None => Vec::new(),
    })
}

/// Tokens granted by a code exchange or a refresh.
#[derive(Debug)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl TokenGrant {
    /// The Calendar client reports a missing refresh token as "".
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token: Some(refresh_token).filter(|t| !t.is_empty()),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_recurrence_is_flattened() {
        let ev: GoogleEvent = serde_json::from_value(serde_json::json!({
            "summary": "COMP 250 - L",
            "location": "Trottier 0100",
            "start": {"dateTime": "2015-09-08T14:05:00+00:00", "timeZone": "UTC"},
            "end": {"dateTime": "2015-09-08T15:25:00+00:00", "timeZone": "UTC"},
            "recurrence": {"rrule": ["RRULE:FREQ=WEEKLY;UNTIL=20151203T162500Z"]}
        }))
        .unwrap();

        assert_eq!(ev.recurrence, vec!["RRULE:FREQ=WEEKLY;UNTIL=20151203T162500Z"]);
        assert_eq!(ev.start.time_zone.as_deref(), Some("UTC"));
        assert!(ev.description.is_none());

        let out = serde_json::to_value(&ev).unwrap();
        assert_eq!(out["recurrence"][0], "RRULE:FREQ=WEEKLY;UNTIL=20151203T162500Z");
        assert_eq!(out["start"]["dateTime"], "2015-09-08T14:05:00+00:00");
        assert!(out.get("description").is_none());
    }

    #[test]
    fn missing_or_null_recurrence_is_empty() {
        let ev: GoogleEvent = serde_json::from_value(serde_json::json!({
            "summary": "x",
            "start": {"date": "2015-09-08"},
            "end": {"date": "2015-09-09"},
            "recurrence": null
        }))
        .unwrap();
        assert!(ev.recurrence.is_empty());
    }
}
