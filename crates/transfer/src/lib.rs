//! File-side primitives for resumable uploads.
//!
//! Everything here deals with the local file only: deriving a resume
//! fingerprint, reading it lazily in chunks from an arbitrary offset,
//! detecting modification underfoot, probing its content type and
//! measuring throughput. Network concerns live in `sisyphus-client`.

mod chunked;
mod content_type;
mod fingerprint;
mod progress;
mod snapshot;

use std::path::PathBuf;

pub use chunked::{Chunk, ChunkSource};
pub use content_type::{ContentTypeProbe, ExtensionProbe};
pub use fingerprint::{Fingerprint, calc_fingerprint};
pub use progress::{SpeedCalculator, UploadProgress};
pub use snapshot::{ConsistencyToken, read_last_modified};

/// Default chunk size: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} changed since the upload started: {reason}", .path.display())]
    FileChanged { path: PathBuf, reason: String },
}

impl TransferError {
    pub(crate) fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}
