use std::fmt::Display;
use std::fs::OpenOptions;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use env_logger::{Env, Target, WriteStyle};

/// Send logs to `path`; the terminal belongs to the TUI.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .write_style(WriteStyle::Never)
        .try_init()?;

    Ok(())
}

pub trait LogErr<T, E> {
    /// Log the error (if any) at warn level with the caller's location.
    fn log_err(self, msg: &str) -> Result<T, E>;
}

impl<T, E: Display> LogErr<T, E> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self, msg: &str) -> std::result::Result<T, E> {
        if let Err(error) = &self {
            let location = std::panic::Location::caller();
            log::warn!("[{location}] {msg}: {error}");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_err_passes_values_through() {
        let ok: std::result::Result<u8, String> = Ok(3);
        assert_eq!(ok.log_err("unused"), Ok(3));

        let err: std::result::Result<u8, String> = Err("boom".to_string());
        assert_eq!(err.log_err("failed"), Err("boom".to_string()));
    }
}
