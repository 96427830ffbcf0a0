pub mod api;
pub mod auth;
pub mod session;
pub mod types;

use std::fmt;

use thiserror::Error;

pub use api::GoogleCalendarClient;
pub use auth::GoogleAuth;

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

/// Whether the user has granted calendar access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    #[default]
    Unknown,
    Authorized,
    Unauthorized,
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthStatus::Unknown => "Google: checking",
            AuthStatus::Authorized => "Google: connected",
            AuthStatus::Unauthorized => "Google: not connected",
        };
        f.write_str(s)
    }
}

/// Bearer token for Calendar API calls. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Google credentials missing: set google.client_id and google.client_secret in {0}")]
    MissingCredentials(String),
    #[error("authorization was denied ({0})")]
    Denied(String),
    #[error("OAuth callback was malformed: {0}")]
    BadCallback(String),
    #[error("OAuth state mismatch")]
    StateMismatch,
    #[error("token request failed: {0}")]
    Token(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("could not store session: {0}")]
    Session(String),
}

#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("Google credentials missing")]
    MissingCredentials,
    #[error("event cannot be sent to Google: {0}")]
    InvalidEvent(String),
    #[error("Google Calendar request failed: {0}")]
    Request(String),
}
