//! Builds upload metadata from file attributes.

use std::path::Path;

use tracing::debug;

use sisyphus_protocol::UploadMetadata;
use sisyphus_protocol::constants::{METADATA_FILENAME, METADATA_FILETYPE};
use sisyphus_transfer::ContentTypeProbe;

use crate::error::UploadError;

/// Builds the metadata for `path`: always `filename`, plus `filetype` when
/// the probe recognizes the file.
///
/// A failed or empty probe is not an error; `filetype` is simply omitted.
pub fn generate_metadata(
    path: &Path,
    probe: &dyn ContentTypeProbe,
) -> Result<UploadMetadata, UploadError> {
    if path.as_os_str().is_empty() {
        return Err(UploadError::InvalidInput("file path is not set".into()));
    }
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            UploadError::InvalidInput(format!("{} has no file name", path.display()))
        })?;

    let mut metadata = UploadMetadata::new();
    metadata
        .insert(METADATA_FILENAME, filename)
        .map_err(|e| UploadError::InvalidInput(e.to_string()))?;

    match probe.probe(path).filter(|ct| !ct.trim().is_empty()) {
        Some(content_type) => metadata
            .insert(METADATA_FILETYPE, content_type)
            .map_err(|e| UploadError::InvalidInput(e.to_string()))?,
        None => debug!(path = %path.display(), "content type unknown, omitting filetype"),
    }

    Ok(metadata)
}

/// Same as [`generate_metadata`], encoded as an `Upload-Metadata` header value.
pub fn encode_metadata(path: &Path, probe: &dyn ContentTypeProbe) -> Result<String, UploadError> {
    generate_metadata(path, probe).map(|m| m.encode())
}
