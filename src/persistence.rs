use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use std::path::PathBuf;

/// Hands finished media to the user as a named file
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save(&self, bytes: &[u8], filename: &str) -> Result<()>;
}

/// Writes files into a downloads directory
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Persistence for DownloadDir {
    async fn save(&self, bytes: &[u8], filename: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create downloads directory: {:?}", self.dir))?;

        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;

        tracing::info!("Saved {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }
}

/// `MM-DD-YYYY HH-MM-SS`
pub fn timestamp_stem(at: &NaiveDateTime) -> String {
    at.format("%m-%d-%Y %H-%M-%S").to_string()
}

pub fn clip_filename(at: &DateTime<Local>, extension: &str) -> String {
    format!("video-{}.{}", timestamp_stem(&at.naive_local()), extension)
}

pub fn screenshot_filename(at: &DateTime<Local>) -> String {
    format!("image-{}.png", timestamp_stem(&at.naive_local()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_timestamp_stem_zero_pads() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 3)
            .unwrap();
        assert_eq!(timestamp_stem(&at), "03-05-2024 09-07-03");
    }

    #[test]
    fn test_filenames() {
        let at = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
        assert_eq!(clip_filename(&at, "mjpeg"), "video-12-31-2023 23-59-58.mjpeg");
        assert_eq!(screenshot_filename(&at), "image-12-31-2023 23-59-58.png");
    }

    #[tokio::test]
    async fn test_download_dir_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let downloads = DownloadDir::new(root.path().join("Downloads"));

        downloads.save(b"clip", "video-x.mjpeg").await.unwrap();

        let written = std::fs::read(root.path().join("Downloads").join("video-x.mjpeg")).unwrap();
        assert_eq!(written, b"clip");
    }
}
