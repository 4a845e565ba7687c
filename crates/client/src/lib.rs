//! Resumable chunked upload client.
//!
//! Uploads a local file to a server speaking a create-then-patch protocol:
//! the server assigns the upload URI and reports how many bytes it has
//! accepted, and the client follows that offset until the file is done.
//!
//! # Pipeline
//!
//! 1. **Init**: validate the target, compute the fingerprint and metadata,
//!    capture a consistency token for the file
//! 2. **Create**: POST to the endpoint (or HEAD an existing upload to resume)
//! 3. **Upload**: PATCH chunk by chunk, each under a bounded retry policy
//! 4. **Complete**: the acknowledged offset equals the file size
//!
//! The HTTP stack sits behind [`HttpTransport`]; [`ReqwestTransport`] is the
//! production implementation.

pub mod adapter;
pub mod config;
pub mod error;
pub mod metadata;
pub mod retry;
pub mod session;
pub mod transport;

use std::path::PathBuf;
use std::sync::Arc;

// Re-export primary types for convenience.
pub use adapter::{RemoteOffset, TusAdapter, offset_from_response};
pub use config::ClientConfig;
pub use error::UploadError;
pub use metadata::{encode_metadata, generate_metadata};
pub use retry::{AttemptError, RetryPolicy, classify_patch};
pub use session::{SessionState, UploadEvent, UploadSession, UploadTarget};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError,
};

pub use sisyphus_transfer::{Fingerprint, UploadProgress, calc_fingerprint};

/// Uploads `path` with the settings in `config` and returns the final offset.
pub async fn upload(config: &ClientConfig, path: impl Into<PathBuf>) -> Result<u64, UploadError> {
    config.validate()?;
    let transport = config
        .transport()
        .map_err(|e| UploadError::InvalidInput(format!("cannot build HTTP client: {e}")))?;

    let mut session = UploadSession::new(config.target(path), Arc::new(transport));
    session.run().await
}
