use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Debug, Clone, Parser)]
#[clap(bin_name = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Backend root URL (overrides `backend.root`)
    #[clap(long)]
    pub backend: Option<String>,

    /// Course list JSON file (overrides `backend.courses`)
    #[clap(long)]
    pub courses: Option<PathBuf>,

    /// Where to write the log
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.backend {
            config.backend.root = root.clone();
        }
        if let Some(courses) = &self.courses {
            config.backend.courses = courses.clone();
        }
    }
}
