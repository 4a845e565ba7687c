use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::TransferError;

/// Resume identifier for "this file, at this size".
///
/// Rendered as `<sha256 of the absolute path>-<byte length>`. Identity is
/// path plus size only: rewriting a file without changing its length keeps
/// the same fingerprint. Callers that map fingerprints to upload URIs must
/// pair this with a [`ConsistencyToken`](crate::ConsistencyToken) check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the fingerprint of the file at `path`.
///
/// Fails with [`TransferError::InvalidInput`] when the path is empty or the
/// file cannot be resolved.
pub async fn calc_fingerprint(path: &Path) -> Result<Fingerprint, TransferError> {
    if path.as_os_str().is_empty() {
        return Err(TransferError::InvalidInput("file path is not set".into()));
    }

    let unreadable =
        |e: std::io::Error| TransferError::InvalidInput(format!("cannot fingerprint {}: {e}", path.display()));
    let absolute = tokio::fs::canonicalize(path).await.map_err(unreadable)?;
    let size = tokio::fs::metadata(&absolute).await.map_err(unreadable)?.len();

    let mut hasher = Sha256::new();
    hasher.update(absolute.to_string_lossy().as_bytes());
    Ok(Fingerprint(format!("{}-{size}", hex::encode(hasher.finalize()))))
}
