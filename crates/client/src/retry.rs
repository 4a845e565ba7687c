//! Bounded retry around a single chunk patch.
//!
//! Backoff intervals are caller-supplied literals consumed in order. Every
//! retry re-sends the same chunk at the same offset; the cursor only moves
//! on an acknowledged response.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::offset_from_response;
use crate::error::UploadError;
use crate::transport::{HttpResponse, TransportError};

/// Statuses for which re-sending the same request cannot succeed.
const FATAL_STATUSES: [u16; 5] = [403, 404, 410, 413, 415];

/// Why a single attempt did not produce a new offset.
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying after a backoff interval.
    Retryable {
        reason: String,
        response: Option<HttpResponse>,
    },
    /// Stop immediately, regardless of remaining intervals.
    Fatal {
        reason: String,
        response: Option<HttpResponse>,
    },
}

impl AttemptError {
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
            response: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    fn into_parts(self) -> (String, Option<HttpResponse>) {
        match self {
            Self::Retryable { reason, response } | Self::Fatal { reason, response } => {
                (reason, response)
            }
        }
    }
}

/// Classifies the outcome of one patch request.
///
/// Success needs a 2xx status and a parsable `Upload-Offset`. A 2xx without
/// the header leaves the outcome unknown and is retried.
pub fn classify_patch(result: Result<HttpResponse, TransportError>) -> Result<u64, AttemptError> {
    let resp = match result {
        Ok(resp) => resp,
        Err(e) => return Err(AttemptError::retryable(format!("transport error: {e}"))),
    };

    if resp.is_success() {
        return match offset_from_response(&resp) {
            Some(offset) => Ok(offset),
            None => Err(AttemptError::Retryable {
                reason: format!("status {} without a valid Upload-Offset header", resp.status),
                response: Some(resp),
            }),
        };
    }

    let reason = format!("server returned status {}", resp.status);
    if FATAL_STATUSES.contains(&resp.status) {
        Err(AttemptError::Fatal {
            reason,
            response: Some(resp),
        })
    } else {
        Err(AttemptError::Retryable {
            reason,
            response: Some(resp),
        })
    }
}

/// Ordered backoff intervals for one chunk.
///
/// An empty policy makes exactly one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    intervals: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(intervals: Vec<Duration>) -> Self {
        Self { intervals }
    }

    pub fn from_millis(intervals: &[u64]) -> Self {
        Self::new(intervals.iter().map(|&ms| Duration::from_millis(ms)).collect())
    }

    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    /// Initial attempt plus one retry per interval.
    pub fn max_attempts(&self) -> usize {
        self.intervals.len() + 1
    }

    /// Runs `attempt` until it succeeds, fails fatally, or the intervals run out.
    ///
    /// `offset` is the chunk's target offset and is only used for reporting.
    /// Cancellation is observed while an attempt is in flight and during
    /// every backoff wait.
    pub async fn run<F, Fut>(
        &self,
        offset: u64,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<u64, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<u64, AttemptError>>,
    {
        let mut waits = self.intervals.iter();
        let mut attempts = 0;
        let mut last_response = None;

        loop {
            attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                outcome = attempt() => outcome,
            };

            let err = match outcome {
                Ok(new_offset) => {
                    if attempts > 1 {
                        debug!(offset, attempts, "patch succeeded after retry");
                    }
                    return Ok(new_offset);
                }
                Err(err) => err,
            };

            let fatal = err.is_fatal();
            let (reason, response) = err.into_parts();
            if response.is_some() {
                last_response = response;
            }
            let next = if fatal { None } else { waits.next() };

            let Some(&delay) = next else {
                return Err(UploadError::FileUpload {
                    offset,
                    attempts,
                    reason,
                    last_response: last_response.map(Box::new),
                });
            };

            warn!(
                offset,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "patch failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
