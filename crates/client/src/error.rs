//! Upload error types.

use std::path::PathBuf;

use sisyphus_transfer::TransferError;

use crate::transport::HttpResponse;

/// Errors produced by an upload session.
///
/// Every variant is terminal for the session that produced it.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Caller misconfiguration: unset path, zero chunk size, bad endpoint.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file was modified after the session started.
    #[error("file integrity check failed for {}: {reason}", .path.display())]
    FileIntegrity { path: PathBuf, reason: String },

    /// The server rejected the create or head request.
    #[error("upload session error: {0}")]
    SessionCreation(String),

    /// A chunk could not be uploaded within the configured retry budget.
    #[error("chunk at offset {offset} failed after {attempts} attempt(s): {reason}")]
    FileUpload {
        offset: u64,
        attempts: usize,
        reason: String,
        last_response: Option<Box<HttpResponse>>,
    },

    #[error("server offset went backwards from {previous} to {reported}")]
    OffsetRegression { previous: u64, reported: u64 },

    #[error("server offset {reported} is past the upload length {length}")]
    OffsetOutOfRange { reported: u64, length: u64 },

    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Status code of the last response seen before a [`FileUpload`](Self::FileUpload) failure.
    pub fn last_status(&self) -> Option<u16> {
        match self {
            Self::FileUpload {
                last_response: Some(resp),
                ..
            } => Some(resp.status),
            _ => None,
        }
    }
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidInput(msg) => Self::InvalidInput(msg),
            TransferError::FileAccess { path, source } => Self::FileAccess { path, source },
            TransferError::FileChanged { path, reason } => Self::FileIntegrity { path, reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_errors_map_to_taxonomy() {
        let changed = TransferError::FileChanged {
            path: "a.bin".into(),
            reason: "modification time changed".into(),
        };
        assert!(matches!(
            UploadError::from(changed),
            UploadError::FileIntegrity { .. }
        ));

        let access = TransferError::FileAccess {
            path: "a.bin".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(matches!(
            UploadError::from(access),
            UploadError::FileAccess { .. }
        ));

        let invalid = TransferError::InvalidInput("file path is not set".into());
        assert!(matches!(
            UploadError::from(invalid),
            UploadError::InvalidInput(_)
        ));
    }

    #[test]
    fn last_status_only_for_upload_failures() {
        let err = UploadError::FileUpload {
            offset: 0,
            attempts: 3,
            reason: "server returned 500".into(),
            last_response: Some(Box::new(HttpResponse::new(500))),
        };
        assert_eq!(err.last_status(), Some(500));
        assert_eq!(UploadError::Cancelled.last_status(), None);
    }
}
