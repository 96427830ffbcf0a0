use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use google_calendar::types::{Calendar, Event, EventDateTime, SendUpdates};
use google_calendar::Client;

use super::types::{GoogleEvent, GoogleEventTime};
use super::{AccessToken, GoogleApiError};
use crate::config::GoogleConfig;
use crate::export::CalendarService;

/// The installed-app client registered in the `[google]` config table.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Credentials {
    /// `None` unless both the id and the secret are set.
    pub fn from_config(config: &GoogleConfig) -> Option<Self> {
        match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() => Some(Self {
                client_id: id.clone(),
                client_secret: secret.clone(),
                redirect_uri: format!("http://localhost:{}/callback", config.redirect_port),
            }),
            _ => None,
        }
    }

    /// A Calendar client carrying the given tokens.
    pub fn client(&self, access_token: &str, refresh_token: &str) -> Client {
        Client::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.redirect_uri.clone(),
            access_token.to_string(),
            refresh_token.to_string(),
        )
    }

    /// A client with no tokens yet, for the consent flow.
    pub fn auth_client(&self) -> Client {
        self.client("", "")
    }
}

/// Calendar API v3 through `google-calendar`: create a calendar, insert
/// events into it.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    credentials: Option<Credentials>,
}

impl GoogleCalendarClient {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            credentials: Credentials::from_config(config),
        }
    }

    fn client(&self, token: &AccessToken) -> Result<Client, GoogleApiError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(GoogleApiError::MissingCredentials)?;
        Ok(creds.client(token.secret(), ""))
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn create_calendar(
        &self,
        token: &AccessToken,
        summary: &str,
    ) -> Result<String, GoogleApiError> {
        let calendar = Calendar {
            summary: summary.to_string(),
            conference_properties: None,
            description: String::new(),
            etag: String::new(),
            id: String::new(),
            kind: String::new(),
            location: String::new(),
            time_zone: String::new(),
        };
        let created = self
            .client(token)?
            .calendars()
            .insert(&calendar)
            .await
            .map_err(|e| GoogleApiError::Request(e.to_string()))?;
        Ok(created.body.id)
    }

    async fn insert_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event: &GoogleEvent,
    ) -> Result<(), GoogleApiError> {
        let body = to_google_event(event)?;
        self.client(token)?
            .events()
            .insert(calendar_id, 0, 0, false, SendUpdates::None, false, &body)
            .await
            .map_err(|e| GoogleApiError::Request(format!("'{}': {e}", event.summary)))?;

        log::debug!("inserted '{}' into {calendar_id}", event.summary);
        Ok(())
    }
}

/// Convert an event as the backend serves it into the client's request type.
pub fn to_google_event(event: &GoogleEvent) -> Result<Event, GoogleApiError> {
    Ok(Event {
        summary: event.summary.clone(),
        description: event.description.clone().unwrap_or_default(),
        location: event.location.clone().unwrap_or_default(),
        start: Some(event_time(&event.start)?),
        end: Some(event_time(&event.end)?),
        recurrence: event.recurrence.clone(),
        ..Default::default()
    })
}

fn event_time(time: &GoogleEventTime) -> Result<EventDateTime, GoogleApiError> {
    let date_time = time
        .date_time
        .as_deref()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| GoogleApiError::InvalidEvent(format!("dateTime {s:?}: {e}")))
        })
        .transpose()?;
    let date = time
        .date
        .as_deref()
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| GoogleApiError::InvalidEvent(format!("date {s:?}: {e}")))
        })
        .transpose()?;

    if date_time.is_none() && date.is_none() {
        return Err(GoogleApiError::InvalidEvent(
            "event time has neither date nor dateTime".to_string(),
        ));
    }

    Ok(EventDateTime {
        date,
        date_time,
        time_zone: time.time_zone.clone().unwrap_or_default(),
    })
}
