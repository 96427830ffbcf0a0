pub mod controller;
pub mod download;
pub mod google;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::schedule::backend::{BackendError, ExportPayload};
use crate::schedule::Event;
use google::types::GoogleEvent;
use google::{AccessToken, AuthError, AuthStatus, GoogleApiError};

pub use controller::{Completion, ExportController, ExportServices, ExportState};
pub use download::DownloadDir;

/// Name of the file written for `.ics` exports.
pub const ICS_FILENAME: &str = "calendar.ics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Ics,
    Gcal,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Ics => write!(f, "ics"),
            ExportFormat::Gcal => write!(f, "gcal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("calendar names may only contain letters, digits and spaces")]
pub struct InvalidCalendarName;

/// A user-supplied calendar name that passed [`validate_input`].
///
/// [`validate_input`]: crate::components::modal::validate_input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarName(String);

impl CalendarName {
    pub fn parse(input: &str) -> Result<Self, InvalidCalendarName> {
        if crate::components::modal::validate_input(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(InvalidCalendarName)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the user asked for when they hit the export button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRequest {
    Ics,
    Gcal(CalendarName),
}

impl ExportRequest {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportRequest::Ics => ExportFormat::Ics,
            ExportRequest::Gcal(_) => ExportFormat::Gcal,
        }
    }
}

#[async_trait]
pub trait ExportBackend: Send + Sync {
    async fn request_export(
        &self,
        events: &[Event],
        format: ExportFormat,
    ) -> Result<ExportPayload, BackendError>;
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Resolve the stored grant without prompting the user.
    async fn check_silent(&self) -> AuthStatus;

    /// Return a usable token, prompting for consent if there is no valid grant.
    async fn authorize(&self) -> Result<AccessToken, AuthError>;
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create a secondary calendar and return its id.
    async fn create_calendar(
        &self,
        token: &AccessToken,
        summary: &str,
    ) -> Result<String, GoogleApiError>;

    async fn insert_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event: &GoogleEvent,
    ) -> Result<(), GoogleApiError>;
}

pub trait Downloader: Send + Sync {
    fn save(&self, filename: &str, contents: &str) -> std::io::Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_name_is_validated() {
        assert_eq!(CalendarName::parse("Fall 2015").unwrap().as_str(), "Fall 2015");
        assert_eq!(CalendarName::parse("U2 #1"), Err(InvalidCalendarName));
        assert!(CalendarName::parse("").is_err());
    }

    #[test]
    fn format_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ExportFormat::Gcal).unwrap(), "gcal");
        assert_eq!(ExportRequest::Ics.format().to_string(), "ics");
    }
}
