use std::io;
use std::path::PathBuf;

use super::Downloader;

/// Saves exported files into a directory, standing in for a browser download.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl Downloader for DownloadDir {
    fn save(&self, filename: &str, contents: &str) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        if path.exists() {
            log::warn!("overwriting {}", path.display());
        }
        std::fs::write(&path, contents)?;
        log::info!("saved {} bytes to {}", contents.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_nested_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = DownloadDir::new(tmp.path().join("a").join("b"));

        let path = target.save("calendar.ics", "BEGIN:VCALENDAR").unwrap();

        assert_eq!(path, tmp.path().join("a").join("b").join("calendar.ics"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "BEGIN:VCALENDAR");

        target.save("calendar.ics", "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
