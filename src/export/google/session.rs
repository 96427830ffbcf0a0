//! Stored OAuth tokens, so later runs can skip the consent screen.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::TokenGrant;
use super::AccessToken;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_grant(tokens: TokenGrant, previous_refresh: Option<&str>) -> Self {
        // Google usually omits the refresh token when refreshing.
        let refresh_token = tokens
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        Self {
            access_token: tokens.access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        }
    }

    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                log::warn!("ignoring unreadable session {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;

        // Owner-only, the file holds OAuth tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(crate::config::APP_DIR).join("google-session.toml"))
}
