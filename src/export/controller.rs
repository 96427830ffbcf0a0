//! The export workflow as an explicit state machine.
//!
//! ```text
//! Idle -> FormatChosen -> DownloadPath -------------------------> Complete
//!                      \-> AuthPath -> AuthorizedPending -------> Complete
//!                                                        \------> PartiallyFailed
//! (any) -> Failed
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;

use super::google::types::GoogleEvent;
use super::google::AccessToken;
use super::{
    Authorizer, CalendarName, CalendarService, Downloader, ExportBackend, ExportFormat,
    ExportRequest, ICS_FILENAME,
};
use crate::logger::LogErr;
use crate::schedule::backend::ExportPayload;
use crate::schedule::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Downloaded(PathBuf),
    Imported { calendar_id: String, inserted: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    FormatChosen(ExportFormat),
    DownloadPath,
    AuthPath,
    /// `calendar_id` is set once the calendar exists and insertion has begun.
    AuthorizedPending {
        calendar_id: Option<String>,
        total: usize,
    },
    Complete(Completion),
    PartiallyFailed {
        calendar_id: String,
        inserted: usize,
        failed: usize,
    },
    Failed(String),
}

impl ExportState {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ExportState::FormatChosen(_)
                | ExportState::DownloadPath
                | ExportState::AuthPath
                | ExportState::AuthorizedPending { .. }
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ExportState::Complete(_) | ExportState::PartiallyFailed { .. } | ExportState::Failed(_)
        )
    }

    pub fn describe(&self) -> String {
        match self {
            ExportState::Idle => "Idle".to_string(),
            ExportState::FormatChosen(format) => format!("Requesting {format} export..."),
            ExportState::DownloadPath => "Saving calendar file...".to_string(),
            ExportState::AuthPath => "Waiting for Google authorization...".to_string(),
            ExportState::AuthorizedPending { calendar_id: None, .. } => {
                "Creating calendar...".to_string()
            }
            ExportState::AuthorizedPending { total, .. } => format!("Adding {total} events..."),
            ExportState::Complete(Completion::Downloaded(path)) => {
                format!("Saved {}", path.display())
            }
            ExportState::Complete(Completion::Imported { inserted, .. }) => {
                format!("Calendar created with {inserted} events")
            }
            ExportState::PartiallyFailed { inserted, failed, .. } => {
                format!("Calendar created, but {failed} of {} events failed", inserted + failed)
            }
            ExportState::Failed(reason) => format!("Export failed: {reason}"),
        }
    }
}

/// Collaborators the controller talks to.
#[derive(Clone)]
pub struct ExportServices {
    pub backend: Arc<dyn ExportBackend>,
    pub authorizer: Arc<dyn Authorizer>,
    pub calendars: Arc<dyn CalendarService>,
    pub downloader: Arc<dyn Downloader>,
}

pub struct ExportController {
    services: ExportServices,
    state: ExportState,
    updates: Option<UnboundedSender<ExportState>>,
}

impl ExportController {
    pub fn new(services: ExportServices) -> Self {
        Self {
            services,
            state: ExportState::Idle,
            updates: None,
        }
    }

    /// Publish every transition on `updates`.
    pub fn with_updates(mut self, updates: UnboundedSender<ExportState>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    fn transition(&mut self, next: ExportState) {
        log::info!("export: {:?} -> {:?}", self.state, next);
        self.state = next;
        if let Some(tx) = &self.updates {
            // The UI may already be gone on shutdown.
            let _ = tx.send(self.state.clone());
        }
    }

    fn fail(&mut self, reason: impl Into<String>) -> ExportState {
        self.transition(ExportState::Failed(reason.into()));
        self.state.clone()
    }

    /// Drive one export to a terminal state and return it.
    pub async fn run(&mut self, events: &[Event], request: ExportRequest) -> ExportState {
        self.transition(ExportState::FormatChosen(request.format()));

        let backend = Arc::clone(&self.services.backend);
        let payload = match backend
            .request_export(events, request.format())
            .await
            .log_err("backend export request failed")
        {
            Ok(payload) => payload,
            Err(e) => return self.fail(e.to_string()),
        };

        match payload {
            ExportPayload::Calendar { calendar } => self.download(&calendar),
            ExportPayload::Events { events } => {
                self.transition(ExportState::AuthPath);
                let ExportRequest::Gcal(name) = request else {
                    return self.fail("backend sent Google events for a file export");
                };
                self.import(&name, &events).await
            }
        }
    }

    fn download(&mut self, calendar: &str) -> ExportState {
        self.transition(ExportState::DownloadPath);
        match self
            .services
            .downloader
            .save(ICS_FILENAME, calendar)
            .log_err("saving calendar file failed")
        {
            Ok(path) => {
                self.transition(ExportState::Complete(Completion::Downloaded(path)));
                self.state.clone()
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    async fn import(&mut self, name: &CalendarName, events: &[GoogleEvent]) -> ExportState {
        let authorizer = Arc::clone(&self.services.authorizer);
        let token = match authorizer.authorize().await.log_err("authorization failed") {
            Ok(token) => token,
            Err(e) => return self.fail(e.to_string()),
        };

        self.transition(ExportState::AuthorizedPending {
            calendar_id: None,
            total: events.len(),
        });

        let calendars = Arc::clone(&self.services.calendars);
        let calendar_id = match calendars
            .create_calendar(&token, name.as_str())
            .await
            .log_err("calendar creation failed")
        {
            Ok(id) => id,
            Err(e) => return self.fail(e.to_string()),
        };
        log::info!("created calendar {calendar_id} ('{name}')");

        self.transition(ExportState::AuthorizedPending {
            calendar_id: Some(calendar_id.clone()),
            total: events.len(),
        });

        let (inserted, failed) = insert_all(calendars.as_ref(), &token, &calendar_id, events).await;

        let next = if failed == 0 {
            ExportState::Complete(Completion::Imported {
                calendar_id,
                inserted,
            })
        } else {
            ExportState::PartiallyFailed {
                calendar_id,
                inserted,
                failed,
            }
        };
        self.transition(next);
        self.state.clone()
    }
}

/// Insert every event concurrently and wait for all of them.
async fn insert_all(
    calendars: &dyn CalendarService,
    token: &AccessToken,
    calendar_id: &str,
    events: &[GoogleEvent],
) -> (usize, usize) {
    let results = join_all(
        events
            .iter()
            .map(|event| calendars.insert_event(token, calendar_id, event)),
    )
    .await;

    let mut failed = 0;
    for (event, result) in events.iter().zip(&results) {
        if let Err(e) = result {
            log::warn!("inserting '{}' failed: {e}", event.summary);
            failed += 1;
        }
    }
    (results.len() - failed, failed)
}
