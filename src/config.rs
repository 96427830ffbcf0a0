use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Deserialize;

use crate::schedule::Formatter;

pub const APP_DIR: &str = "schedule-tui";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub formatter: Option<Formatter>,
    pub display: DisplayConfig,
    pub export: ExportConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Root URL the `/events` and `/calendar` endpoints hang off.
    pub root: String,
    /// JSON file with the course list to send to the backend.
    pub courses: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            root: "http://localhost:8000".to_string(),
            courses: PathBuf::from("courses.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_port: u16,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_port: 8085,
        }
    }
}

impl Config {
    /// Load `path`, or the default location when `None`. A missing default
    /// file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(eyre!("Config file {} does not exist", path.display()));
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read config from {}", path.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.export
            .download_dir
            .as_deref()
            .map(expand_home)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("schedule-tui.log")
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
