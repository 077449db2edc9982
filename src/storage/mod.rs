// Storage for generated spreadsheets served under /downloads

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{AppError, AppResult};

/// Public URL prefix the downloads directory is mounted at
pub const DOWNLOADS_ROUTE: &str = "/downloads";

#[derive(Debug, Clone)]
pub struct DownloadStore {
    root: PathBuf,
}

impl DownloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` as `filename` and return its public URL.
    ///
    /// The file is written under a per-request temporary name and renamed into
    /// place, so concurrent requests never observe a partial file.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> AppResult<String> {
        if filename.is_empty()
            || filename.starts_with('.')
            || filename.contains(['/', '\\'])
        {
            return Err(AppError::InvalidRequest(format!(
                "Refusing to store download with unsafe name {:?}",
                filename
            )));
        }

        fs::create_dir_all(&self.root).await?;

        let target = self.root.join(filename);
        let scratch = self
            .root
            .join(format!(".{}.{}.part", filename, Uuid::new_v4()));

        let stored = async {
            fs::write(&scratch, bytes).await?;
            fs::rename(&scratch, &target).await
        }
        .await;

        // A failed write can leave a partial scratch file as well as a failed rename
        if let Err(e) = stored {
            if let Err(cleanup) = fs::remove_file(&scratch).await {
                debug!(path = %scratch.display(), error = %cleanup, "Failed to remove scratch file");
            }
            return Err(e.into());
        }

        info!(path = %target.display(), bytes = bytes.len(), "Stored analysis spreadsheet");
        Ok(format!("{}/{}", DOWNLOADS_ROUTE, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_writes_file_and_returns_url() {
        let temp_dir = TempDir::new().unwrap();
        let store = DownloadStore::new(temp_dir.path().join("downloads"));

        let url = store.save("lease_analysis_1.xlsx", b"PK\x03\x04").await.unwrap();

        assert_eq!(url, "/downloads/lease_analysis_1.xlsx");
        let written = tokio::fs::read(store.root().join("lease_analysis_1.xlsx")).await.unwrap();
        assert_eq!(written, b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_no_scratch_files_remain() {
        let temp_dir = TempDir::new().unwrap();
        let store = DownloadStore::new(temp_dir.path());

        store.save("a.xlsx", b"1").await.unwrap();
        store.save("a.xlsx", b"2").await.unwrap();

        let mut entries = tokio::fs::read_dir(temp_dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["a.xlsx".to_string()]);
        let written = tokio::fs::read(temp_dir.path().join("a.xlsx")).await.unwrap();
        assert_eq!(written, b"2");
    }

    #[tokio::test]
    async fn test_failed_store_removes_scratch_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = DownloadStore::new(temp_dir.path());
        // A non-empty directory in the way makes the final step fail
        std::fs::create_dir_all(temp_dir.path().join("taken.xlsx/inner")).unwrap();

        assert!(store.save("taken.xlsx", b"PK").await.is_err());

        let mut entries = tokio::fs::read_dir(temp_dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["taken.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = DownloadStore::new(temp_dir.path());

        assert!(store.save("../escape.xlsx", b"x").await.is_err());
        assert!(store.save("nested/file.xlsx", b"x").await.is_err());
        assert!(store.save(".hidden", b"x").await.is_err());
        assert!(store.save("", b"x").await.is_err());
    }
}
