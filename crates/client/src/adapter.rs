//! Protocol operations (create, patch, head) on top of an [`HttpTransport`].

use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info};

use sisyphus_protocol::{ProtocolError, UploadMetadata};
use sisyphus_protocol::constants::{
    LOCATION, OFFSET_CONTENT_TYPE, TUS_RESUMABLE, TUS_VERSION, UPLOAD_LENGTH, UPLOAD_METADATA,
    UPLOAD_OFFSET,
};

use crate::error::UploadError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// Server-side state of an upload, as reported by `head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteOffset {
    /// Bytes the server has accepted.
    pub offset: u64,
    /// Declared upload length, if the server reports it.
    pub length: Option<u64>,
}

/// Issues protocol requests through a shared transport.
#[derive(Clone)]
pub struct TusAdapter {
    transport: Arc<dyn HttpTransport>,
}

impl TusAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Creates an upload resource and returns its absolute URI.
    ///
    /// A relative `Location` header is resolved against `endpoint`.
    pub async fn create(
        &self,
        endpoint: &str,
        metadata: &UploadMetadata,
        file_size: u64,
    ) -> Result<String, UploadError> {
        let base = Url::parse(endpoint)
            .map_err(|e| UploadError::InvalidInput(format!("bad endpoint {endpoint:?}: {e}")))?;

        let req = HttpRequest::new(Method::Post, endpoint)
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_LENGTH, file_size)
            .header(UPLOAD_METADATA, metadata.encode());

        let resp = self
            .transport
            .send(req)
            .await
            .map_err(|e| UploadError::SessionCreation(format!("create request failed: {e}")))?;

        if !resp.is_success() {
            return Err(UploadError::SessionCreation(format!(
                "server rejected create with status {}",
                resp.status
            )));
        }

        let location = resp.header(LOCATION).ok_or_else(|| {
            UploadError::SessionCreation("create response carried no Location header".into())
        })?;
        let upload_uri = base
            .join(location)
            .map_err(|e| UploadError::SessionCreation(format!("bad Location {location:?}: {e}")))?
            .to_string();

        info!(endpoint, upload = %upload_uri, file_size, "upload created");
        Ok(upload_uri)
    }

    /// Sends one chunk starting at `offset` and returns the raw response.
    ///
    /// Interpreting the response is up to the caller; see
    /// [`offset_from_response`].
    pub async fn patch(
        &self,
        offset: u64,
        upload_uri: &str,
        chunk: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let len = chunk.len();
        let req = HttpRequest::new(Method::Patch, upload_uri)
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_OFFSET, offset)
            .header("Content-Type", OFFSET_CONTENT_TYPE)
            .body(chunk);

        let resp = self.transport.send(req).await?;
        debug!(upload = %upload_uri, offset, len, status = resp.status, "patch sent");
        Ok(resp)
    }

    /// Queries the offset the server has acknowledged for `upload_uri`.
    pub async fn head(&self, upload_uri: &str) -> Result<RemoteOffset, UploadError> {
        let req = HttpRequest::new(Method::Head, upload_uri).header(TUS_RESUMABLE, TUS_VERSION);

        let resp = self
            .transport
            .send(req)
            .await
            .map_err(|e| UploadError::SessionCreation(format!("head request failed: {e}")))?;

        if !resp.is_success() {
            return Err(UploadError::SessionCreation(format!(
                "server rejected head with status {}",
                resp.status
            )));
        }

        let offset = sisyphus_protocol::parse_offset(resp.header(UPLOAD_OFFSET))
            .map_err(|e| UploadError::SessionCreation(e.to_string()))?;
        let length = match sisyphus_protocol::parse_length(resp.header(UPLOAD_LENGTH)) {
            Ok(length) => Some(length),
            Err(ProtocolError::MissingHeader(_)) => None,
            Err(e) => return Err(UploadError::SessionCreation(e.to_string())),
        };

        debug!(upload = %upload_uri, offset, ?length, "remote offset");
        Ok(RemoteOffset { offset, length })
    }
}

/// Extracts the acknowledged offset from a patch response.
///
/// `None` when the header is absent or malformed, which leaves the outcome
/// of the patch unknown.
pub fn offset_from_response(resp: &HttpResponse) -> Option<u64> {
    sisyphus_protocol::parse_offset(resp.header(UPLOAD_OFFSET)).ok()
}
