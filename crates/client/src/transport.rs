//! HTTP capability used by the upload adapter.
//!
//! `HttpTransport` keeps the protocol logic independent of any particular
//! HTTP stack and testable with in-memory mocks. [`ReqwestTransport`] is the
//! production implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Errors raised below the protocol level (connection, timeout, request building).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// The three request methods the protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Patch,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Looks up a header case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response. Header names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Looks up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

/// Sends a request and returns the status, headers and body.
///
/// Non-2xx statuses are responses, not errors; only failures to obtain a
/// response at all are reported as [`TransportError`].
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

// ---------------------------------------------------------------------------
// ReqwestTransport
// ---------------------------------------------------------------------------

/// [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport with a per-request timeout and headers sent on
    /// every request (authentication, tracing ids).
    pub fn new(timeout: Duration, default_headers: &[(String, String)]) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidRequest(format!("bad header name {name:?}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidRequest(format!("bad value for header {name}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { http, timeout })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut builder = self
                .http
                .request(request.method.into(), &request.uri)
                .timeout(self.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if request.method != Method::Head {
                builder = builder.body(request.body);
            }

            let resp = builder.send().await?;
            let mut response = HttpResponse::new(resp.status().as_u16());
            for (name, value) in resp.headers() {
                if let Ok(value) = value.to_str() {
                    response = response.with_header(name.as_str(), value);
                }
            }
            response.body = resp.bytes().await?.to_vec();
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Starts a one-shot HTTP responder and hands back the raw request it saw.
    async fn mock_server(
        response: &'static str,
    ) -> (String, oneshot::Receiver<String>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());

                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, rx, handle)
    }

    #[test]
    fn response_headers_are_case_insensitive() {
        let resp = HttpResponse::new(204).with_header("Upload-Offset", 42);
        assert_eq!(resp.header("upload-offset"), Some("42"));
        assert_eq!(resp.header("UPLOAD-OFFSET"), Some("42"));
        assert!(resp.is_success());
        assert!(!HttpResponse::new(409).is_success());
    }

    #[test]
    fn request_builder_collects_headers() {
        let req = HttpRequest::new(Method::Patch, "http://x/files/1")
            .header("Upload-Offset", 7)
            .body(b"abc".to_vec());
        assert_eq!(req.header_value("upload-offset"), Some("7"));
        assert_eq!(req.body, b"abc");
        assert_eq!(req.method.as_str(), "PATCH");
    }

    #[test]
    fn rejects_invalid_default_header() {
        let result = ReqwestTransport::new(
            Duration::from_secs(1),
            &[("bad header".into(), "x".into())],
        );
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn sends_request_and_reads_response() {
        let (url, seen, handle) = mock_server(
            "HTTP/1.1 204 No Content\r\nUpload-Offset: 5\r\nTus-Resumable: 1.0.0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let transport = ReqwestTransport::new(
            Duration::from_secs(5),
            &[("Authorization".into(), "Bearer secret".into())],
        )
        .unwrap();
        let req = HttpRequest::new(Method::Patch, format!("{url}/files/abc"))
            .header("Upload-Offset", 0)
            .body(b"hello".to_vec());

        let resp = transport.send(req).await.unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(resp.header("Upload-Offset"), Some("5"));

        let raw = seen.await.unwrap().to_lowercase();
        assert!(raw.starts_with("patch /files/abc"));
        assert!(raw.contains("upload-offset: 0"));
        assert!(raw.contains("authorization: bearer secret"));

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn error_status_is_a_response() {
        let (url, _seen, handle) = mock_server(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        )
        .await;

        let transport = ReqwestTransport::new(Duration::from_secs(5), &[]).unwrap();
        let resp = transport
            .send(HttpRequest::new(Method::Head, format!("{url}/files/gone")))
            .await
            .unwrap();
        assert_eq!(resp.status, 404);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(5), &[]).unwrap();
        let result = transport
            .send(HttpRequest::new(Method::Post, format!("http://127.0.0.1:{port}/files")))
            .await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
