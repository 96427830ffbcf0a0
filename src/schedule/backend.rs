use std::path::Path;

use async_trait::async_trait;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::event::Event;
use crate::export::google::types::GoogleEvent;
use crate::export::{ExportBackend, ExportFormat};

/// Summary/description templates the backend applies to each course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formatter {
    pub summary: String,
    pub description: String,
}

/// What the backend's `/calendar` endpoint hands back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExportPayload {
    /// A serialized `.ics` body to save.
    Calendar { calendar: String },
    /// Google-shaped event resources to insert through the API.
    Events { events: Vec<GoogleEvent> },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {message}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Serialize)]
struct EventsRequest<'a> {
    courses: &'a [Value],
    #[serde(rename = "format")]
    formatter: Option<&'a Formatter>,
}

#[derive(Deserialize)]
struct EventsResponse {
    events: Vec<Event>,
}

#[derive(Serialize)]
struct CalendarRequest<'a> {
    events: &'a [Event],
    format: ExportFormat,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    root: String,
}

impl BackendClient {
    pub fn new(root: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            root: root.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.root, path)
    }

    /// POST the course list to `/events` and return the generated events in order.
    pub async fn fetch_events(
        &self,
        courses: &[Value],
        formatter: Option<&Formatter>,
    ) -> Result<Vec<Event>, BackendError> {
        let body = EventsRequest { courses, formatter };
        let response: EventsResponse = self.post("events", &body).await?;
        log::info!("fetched {} events for {} courses", response.events.len(), courses.len());
        Ok(response.events)
    }

    /// POST the events to `/calendar`, asking for the given export format.
    pub async fn request_export(
        &self,
        events: &[Event],
        format: ExportFormat,
    ) -> Result<ExportPayload, BackendError> {
        let body = CalendarRequest { events, format };
        self.post("calendar", &body).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path);
        log::debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(BackendError::Status { url, status, message });
        }

        response
            .json()
            .await
            .map_err(|source| BackendError::Decode { url, source })
    }
}

#[async_trait]
impl ExportBackend for BackendClient {
    async fn request_export(
        &self,
        events: &[Event],
        format: ExportFormat,
    ) -> Result<ExportPayload, BackendError> {
        BackendClient::request_export(self, events, format).await
    }
}

/// Read the course list handed to us by the surrounding environment.
pub fn read_courses(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read courses from {}", path.display()))?;
    let courses: Vec<Value> = serde_json::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse courses from {}", path.display()))?;
    Ok(courses)
}
