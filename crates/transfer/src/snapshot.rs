use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::TransferError;

/// Size and modification time of a file, captured when an upload starts.
///
/// Some filesystems cannot report a modification time; in that case only
/// the size takes part in [`verify`](Self::verify).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyToken {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
}

impl ConsistencyToken {
    /// Captures the current state of `path`.
    pub async fn capture(path: &Path) -> Result<Self, TransferError> {
        let (size, modified) = stat(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            size,
            modified,
        })
    }

    /// Checks that the file still matches the captured state.
    ///
    /// Returns [`TransferError::FileChanged`] on a size or timestamp mismatch
    /// and [`TransferError::FileAccess`] if the file can no longer be read.
    pub async fn verify(&self) -> Result<(), TransferError> {
        let (size, modified) = stat(&self.path).await?;

        if size != self.size {
            return Err(TransferError::FileChanged {
                path: self.path.clone(),
                reason: format!("size changed from {} to {size} bytes", self.size),
            });
        }
        if let (Some(before), Some(now)) = (self.modified, modified)
            && before != now
        {
            return Err(TransferError::FileChanged {
                path: self.path.clone(),
                reason: "modification time changed".into(),
            });
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes at capture time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time at capture time, if the filesystem reports one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Reads the last modification time of `path`.
///
/// A missing or unreadable file is an error; a filesystem without
/// modification times yields `Ok(None)`.
pub async fn read_last_modified(path: &Path) -> Result<Option<SystemTime>, TransferError> {
    stat(path).await.map(|(_, modified)| modified)
}

async fn stat(path: &Path) -> Result<(u64, Option<SystemTime>), TransferError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| TransferError::access(path, e))?;
    Ok((metadata.len(), metadata.modified().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, shift: Duration) {
        let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
        let modified = file.metadata().unwrap().modified().unwrap();
        file.set_modified(modified + shift).unwrap();
    }

    #[tokio::test]
    async fn unmodified_file_verifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stable.txt");
        std::fs::write(&path, b"hello").unwrap();

        let token = ConsistencyToken::capture(&path).await.unwrap();
        assert_eq!(token.size(), 5);
        token.verify().await.unwrap();
        token.verify().await.unwrap();
    }

    #[tokio::test]
    async fn timestamp_change_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("touched.txt");
        std::fs::write(&path, b"hello").unwrap();

        let token = ConsistencyToken::capture(&path).await.unwrap();
        touch(&path, Duration::from_secs(5));

        let result = token.verify().await;
        assert!(matches!(result, Err(TransferError::FileChanged { .. })));
    }

    #[tokio::test]
    async fn size_change_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grown.txt");
        std::fs::write(&path, b"hello").unwrap();

        let token = ConsistencyToken::capture(&path).await.unwrap();
        std::fs::write(&path, b"hello world").unwrap();

        let err = token.verify().await.unwrap_err();
        assert!(err.to_string().contains("size changed from 5 to 11"));
    }

    #[tokio::test]
    async fn vanished_file_is_access_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, b"hello").unwrap();

        let token = ConsistencyToken::capture(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            token.verify().await,
            Err(TransferError::FileAccess { .. })
        ));
    }

    #[tokio::test]
    async fn read_last_modified_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, b"<html></html>").unwrap();

        let modified = read_last_modified(&path).await.unwrap();
        assert!(modified.is_some());
    }

    #[tokio::test]
    async fn read_last_modified_missing_file() {
        let result = read_last_modified(Path::new("read_last_modified_missing")).await;
        assert!(matches!(result, Err(TransferError::FileAccess { .. })));
    }
}
