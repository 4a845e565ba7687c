//! Upload session: drives one file from creation to completion.
//!
//! # States
//!
//! `Init` → `Created` → `Uploading` → `Completed`, with `Failed` reachable
//! from any non-terminal state. `Completed` and `Failed` are final; a
//! finished session refuses to run again.
//!
//! The cursor follows the offsets the server acknowledges, never the number
//! of bytes sent: a server may accept part of a chunk, in which case the
//! chunk source is reopened at the acknowledged offset.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use sisyphus_transfer::{
    Chunk, ChunkSource, ConsistencyToken, ContentTypeProbe, DEFAULT_CHUNK_SIZE, ExtensionProbe,
    Fingerprint, SpeedCalculator, UploadProgress, calc_fingerprint,
};

use crate::adapter::TusAdapter;
use crate::config::DEFAULT_RETRY_INTERVALS_MS;
use crate::error::UploadError;
use crate::metadata::generate_metadata;
use crate::retry::{RetryPolicy, classify_patch};
use crate::transport::HttpTransport;

/// What to upload, where, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub path: PathBuf,
    /// Maximum bytes per patch request.
    pub chunk_size: usize,
    /// Backoff intervals for retrying one chunk. Empty means no retry.
    pub intervals: Vec<Duration>,
    /// Creation endpoint.
    pub endpoint: String,
}

impl UploadTarget {
    pub fn new(path: impl Into<PathBuf>, endpoint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            intervals: DEFAULT_RETRY_INTERVALS_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_intervals(mut self, intervals: impl IntoIterator<Item = Duration>) -> Self {
        self.intervals = intervals.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.path.as_os_str().is_empty() {
            return Err(UploadError::InvalidInput("file path is not set".into()));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::InvalidInput(
                "chunk size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle state of an [`UploadSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Created { upload_uri: String },
    Uploading { offset: u64 },
    Completed { offset: u64 },
    Failed { reason: String },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Notifications emitted while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    StateChanged(SessionState),
    /// Sent after every acknowledged chunk.
    Progress(UploadProgress),
}

/// Uploads one file: create (or resume), then patch chunk by chunk.
pub struct UploadSession {
    target: UploadTarget,
    adapter: TusAdapter,
    probe: Box<dyn ContentTypeProbe>,
    cancel: CancellationToken,
    events_tx: Option<mpsc::Sender<UploadEvent>>,
    resume_uri: Option<String>,
    state: SessionState,
    fingerprint: Option<Fingerprint>,
    upload_uri: Option<String>,
    offset: u64,
}

impl UploadSession {
    pub fn new(target: UploadTarget, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            target,
            adapter: TusAdapter::new(transport),
            probe: Box::new(ExtensionProbe),
            cancel: CancellationToken::new(),
            events_tx: None,
            resume_uri: None,
            state: SessionState::Init,
            fingerprint: None,
            upload_uri: None,
            offset: 0,
        }
    }

    /// Replaces the default extension-based content type probe.
    pub fn with_probe(mut self, probe: impl ContentTypeProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Sends state changes and progress to `events_tx`.
    pub fn with_events(mut self, events_tx: mpsc::Sender<UploadEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    /// Uses an externally supplied cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Continues an existing upload instead of creating a new one.
    ///
    /// The starting offset is queried from the server.
    pub fn resume(mut self, upload_uri: impl Into<String>) -> Self {
        self.resume_uri = Some(upload_uri.into());
        self
    }

    /// Token that aborts the session at its next suspension point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Available once the session has passed `Init`.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn upload_uri(&self) -> Option<&str> {
        self.upload_uri.as_deref()
    }

    /// Bytes acknowledged by the server so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    /// Runs the session to a terminal state and returns the final offset.
    ///
    /// On failure the session moves to [`SessionState::Failed`] and the
    /// original error is returned.
    pub async fn run(&mut self) -> Result<u64, UploadError> {
        if self.state.is_terminal() {
            return Err(UploadError::InvalidInput(
                "upload session already finished".into(),
            ));
        }

        match self.drive().await {
            Ok(offset) => Ok(offset),
            Err(err) => {
                error!(
                    path = %self.target.path.display(),
                    offset = self.offset,
                    error = %err,
                    "upload failed"
                );
                self.transition(SessionState::Failed {
                    reason: err.to_string(),
                })
                .await;
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<u64, UploadError> {
        // Init
        self.transition(SessionState::Init).await;
        self.target.validate()?;
        let path = self.target.path.clone();

        let fingerprint = calc_fingerprint(&path).await?;
        let metadata = generate_metadata(&path, self.probe.as_ref())?;
        let token = ConsistencyToken::capture(&path).await?;
        let size = token.size();
        debug!(path = %path.display(), %fingerprint, size, "session initialized");
        self.fingerprint = Some(fingerprint);

        // Created
        let (upload_uri, start) = match self.resume_uri.clone() {
            Some(uri) => {
                let remote = self.cancellable(self.adapter.head(&uri)).await?;
                if let Some(length) = remote.length
                    && length != size
                {
                    return Err(UploadError::FileIntegrity {
                        path,
                        reason: format!("server expects {length} bytes, file has {size}"),
                    });
                }
                if remote.offset > size {
                    return Err(UploadError::OffsetOutOfRange {
                        reported: remote.offset,
                        length: size,
                    });
                }
                info!(upload = %uri, offset = remote.offset, size, "resuming upload");
                (uri, remote.offset)
            }
            None => {
                let endpoint = self.target.endpoint.clone();
                let uri = self
                    .cancellable(self.adapter.create(&endpoint, &metadata, size))
                    .await?;
                (uri, 0)
            }
        };
        self.upload_uri = Some(upload_uri.clone());
        self.transition(SessionState::Created {
            upload_uri: upload_uri.clone(),
        })
        .await;

        // Uploading
        self.offset = start;
        self.transition(SessionState::Uploading { offset: start }).await;

        let mut speed = SpeedCalculator::default();
        speed.add_sample(0);
        let mut source: Option<ChunkSource> = None;
        let mut stalls = 0usize;

        while self.offset < size {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            token.verify().await?;

            let reader = match source.take() {
                Some(open) if open.offset() == self.offset => source.insert(open),
                _ => source
                    .insert(ChunkSource::open(&path, self.offset, self.target.chunk_size).await?),
            };
            let Some(chunk) = reader.next_chunk().await? else {
                return Err(UploadError::FileIntegrity {
                    path,
                    reason: format!("file ended at {} before {size} bytes", self.offset),
                });
            };

            let previous = self.offset;
            let acknowledged = self.patch_chunk(&upload_uri, &chunk).await?;

            if acknowledged < previous {
                return Err(UploadError::OffsetRegression {
                    previous,
                    reported: acknowledged,
                });
            }
            if acknowledged > size {
                return Err(UploadError::OffsetOutOfRange {
                    reported: acknowledged,
                    length: size,
                });
            }

            if acknowledged == previous {
                stalls += 1;
                if stalls > self.target.intervals.len() {
                    return Err(UploadError::FileUpload {
                        offset: previous,
                        attempts: stalls,
                        reason: "server acknowledged no bytes".into(),
                        last_response: None,
                    });
                }
            } else {
                stalls = 0;
            }

            if acknowledged != chunk.end() {
                debug!(
                    sent_until = chunk.end(),
                    acknowledged, "partial acknowledgement, reopening source"
                );
                source = None;
            }

            speed.add_sample(acknowledged - previous);
            self.offset = acknowledged;
            debug!(upload = %upload_uri, offset = acknowledged, size, "chunk acknowledged");

            self.emit(UploadEvent::Progress(UploadProgress {
                offset: acknowledged,
                size,
                bytes_per_second: speed.bytes_per_second(),
            }))
            .await;
        }

        self.transition(SessionState::Completed { offset: self.offset })
            .await;
        info!(upload = %upload_uri, size, "upload completed");
        Ok(self.offset)
    }

    /// Patches one chunk under the retry policy, returning the acknowledged offset.
    async fn patch_chunk(&self, upload_uri: &str, chunk: &Chunk) -> Result<u64, UploadError> {
        let policy = RetryPolicy::new(self.target.intervals.clone());
        let adapter = &self.adapter;
        let offset = chunk.offset;

        policy
            .run(offset, &self.cancel, move || {
                let data = chunk.data.clone();
                async move { classify_patch(adapter.patch(offset, upload_uri, data).await) }
            })
            .await
    }

    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, UploadError>>,
    ) -> Result<T, UploadError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            result = fut => result,
        }
    }

    async fn transition(&mut self, state: SessionState) {
        info!(path = %self.target.path.display(), ?state, "session state");
        self.state = state.clone();
        self.emit(UploadEvent::StateChanged(state)).await;
    }

    /// Delivers `event` unless the receiver is gone. A full channel waits
    /// for room, but never past cancellation.
    async fn emit(&self, event: UploadEvent) {
        let Some(tx) = &self.events_tx else {
            return;
        };
        let event = match tx.try_send(event) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => return,
            Err(mpsc::error::TrySendError::Full(event)) => event,
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(path = %self.target.path.display(), "event dropped, session cancelled");
            }
            _ = tx.send(event) => {}
        }
    }
}
