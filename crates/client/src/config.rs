//! Client configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sisyphus_transfer::DEFAULT_CHUNK_SIZE;

use crate::error::UploadError;
use crate::session::UploadTarget;
use crate::transport::{ReqwestTransport, TransportError};

/// Default backoff intervals between patch retries, in milliseconds.
pub const DEFAULT_RETRY_INTERVALS_MS: [u64; 4] = [500, 1000, 2000, 5000];

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings shared by every upload a client performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Creation endpoint, e.g. `https://uploads.example.com/files/`.
    pub endpoint: String,
    /// Chunk size in bytes.
    pub chunk_size: usize,
    /// Backoff intervals between retries of one chunk, in milliseconds.
    pub retry_intervals_ms: Vec<u64>,
    pub request_timeout_secs: u64,
    /// Extra headers sent with every request.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_intervals_ms: DEFAULT_RETRY_INTERVALS_MS.to_vec(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a default configuration for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, UploadError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| UploadError::InvalidInput(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, UploadError> {
        let json = std::fs::read_to_string(path).map_err(|source| UploadError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.endpoint.trim().is_empty() {
            return Err(UploadError::InvalidInput("endpoint is not set".into()));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::InvalidInput(
                "chunk size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_intervals(&self) -> Vec<Duration> {
        self.retry_intervals_ms
            .iter()
            .map(|&ms| Duration::from_millis(ms))
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds the upload target for `path` from these settings.
    pub fn target(&self, path: impl Into<PathBuf>) -> UploadTarget {
        UploadTarget::new(path, self.endpoint.clone())
            .with_chunk_size(self.chunk_size)
            .with_intervals(self.retry_intervals())
    }

    /// Builds a reqwest-backed transport with the configured timeout and headers.
    pub fn transport(&self) -> Result<ReqwestTransport, TransportError> {
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ReqwestTransport::new(self.request_timeout(), &headers)
    }
}
