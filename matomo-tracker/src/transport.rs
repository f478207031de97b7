//! HTTP transport abstraction for testability.
//!
//! The tracker never talks to sockets itself. It hands fully built requests
//! to an [`HttpTransport`], chosen once per tracker from the endpoint scheme.
//! [`ReqwestTransport`] is the production implementation; tests substitute a
//! recording mock.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use thiserror::Error;
use tracing::trace;

use crate::error::{TrackerError, TrackerResult};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport-level failure (name resolution, refused connection, TLS, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::new(e.to_string())
    }
}

/// Which transport a tracker uses, decided from the endpoint URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportScheme {
    Plain,
    Secure,
}

impl TransportScheme {
    /// `https` URLs use the secure transport, everything else the plain one.
    pub fn for_url(url: &Url) -> Self {
        if url.scheme().eq_ignore_ascii_case("https") {
            TransportScheme::Secure
        } else {
            TransportScheme::Plain
        }
    }
}

/// Completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Full response body. Empty when the transport did not read it.
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status_only(status: u16) -> Self {
        Self::new(status, Vec::new())
    }
}

/// POST request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PostRequest {
    /// JSON body with `Content-Type` and byte-accurate `Content-Length`.
    pub fn json(body: String) -> Self {
        let body = body.into_bytes();
        Self {
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Trait for HTTP client operations.
///
/// Implementations perform exactly one request per call, without retries.
pub trait HttpTransport: Send + Sync {
    /// Performs a GET. The body of the response is not needed.
    fn get(&self, url: Url) -> BoxFuture<'_, Result<TransportResponse, TransportError>>;

    /// Performs a POST and reads the full response body.
    fn post(
        &self,
        url: Url,
        request: PostRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}

/// Settings for the reqwest client backing [`ReqwestTransport`].
///
/// Both fields default to `None`, which keeps reqwest's own defaults.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

/// HTTP transport using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    scheme: TransportScheme,
}

impl ReqwestTransport {
    /// Transport for `http://` endpoints.
    pub fn plain() -> TrackerResult<Self> {
        Self::with_options(TransportScheme::Plain, &TransportOptions::default())
    }

    /// Transport for `https://` endpoints. Refuses plain-text requests.
    pub fn secure() -> TrackerResult<Self> {
        Self::with_options(TransportScheme::Secure, &TransportOptions::default())
    }

    pub fn with_options(scheme: TransportScheme, options: &TransportOptions) -> TrackerResult<Self> {
        // One request per call: a 30x is the endpoint's answer, not a hop.
        let mut builder = reqwest::Client::builder()
            .https_only(scheme == TransportScheme::Secure)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TrackerError::Transport(e.to_string()))?;

        Ok(Self { client, scheme })
    }

    pub fn scheme(&self) -> TransportScheme {
        self.scheme
    }

    async fn send_get(&self, url: Url) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        trace!(status, "GET completed");
        Ok(TransportResponse::status_only(status))
    }

    async fn send_post(
        &self,
        url: Url,
        request: PostRequest,
    ) -> Result<TransportResponse, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::new(format!("invalid header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::new(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut response = self
            .client
            .post(url)
            .headers(headers)
            .body(request.body)
            .send()
            .await?;
        let status = response.status().as_u16();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
        }
        trace!(status, bytes = body.len(), "POST completed");

        Ok(TransportResponse::new(status, body))
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: Url) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(self.send_get(url))
    }

    fn post(
        &self,
        url: Url,
        request: PostRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(self.send_post(url, request))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// A request seen by [`MockTransport`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedRequest {
        Get(String),
        Post { url: String, request: PostRequest },
    }

    /// Mock transport recording every request and replaying canned replies.
    ///
    /// Replies are consumed in order; once exhausted, `default_reply` is used.
    pub struct MockTransport {
        pub requests: Mutex<Vec<RecordedRequest>>,
        pub replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        pub default_reply: Result<TransportResponse, TransportError>,
    }

    impl MockTransport {
        pub fn replying(reply: Result<TransportResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                replies: Mutex::new(VecDeque::new()),
                default_reply: reply,
            })
        }

        pub fn with_status(status: u16) -> Arc<Self> {
            Self::replying(Ok(TransportResponse::status_only(status)))
        }

        pub fn recorded(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }

        fn next_reply(&self) -> Result<TransportResponse, TransportError> {
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.default_reply.clone())
        }
    }

    impl HttpTransport for MockTransport {
        fn get(&self, url: Url) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
            self.requests
                .lock()
                .push(RecordedRequest::Get(url.to_string()));
            let reply = self.next_reply();
            Box::pin(async move { reply })
        }

        fn post(
            &self,
            url: Url,
            request: PostRequest,
        ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
            self.requests.lock().push(RecordedRequest::Post {
                url: url.to_string(),
                request,
            });
            let reply = self.next_reply();
            Box::pin(async move { reply })
        }
    }

    #[test]
    fn test_scheme_for_url() {
        let plain = Url::parse("http://example.com/matomo.php").unwrap();
        let secure = Url::parse("https://example.com/matomo.php").unwrap();
        assert_eq!(TransportScheme::for_url(&plain), TransportScheme::Plain);
        assert_eq!(TransportScheme::for_url(&secure), TransportScheme::Secure);
    }

    #[test]
    fn test_post_request_json_headers() {
        let request = PostRequest::json(r#"{"requests":["?é=1"]}"#.to_string());
        assert_eq!(request.header("content-type"), Some("application/json"));
        // byte length, not char count
        assert_eq!(request.header("Content-Length"), Some("22"));
        assert_eq!(request.body.len(), 22);
    }

    #[test]
    fn test_reqwest_transport_schemes() {
        assert_eq!(
            ReqwestTransport::plain().unwrap().scheme(),
            TransportScheme::Plain
        );
        assert_eq!(
            ReqwestTransport::secure().unwrap().scheme(),
            TransportScheme::Secure
        );
    }

    #[test]
    fn test_reqwest_transport_with_options() {
        let options = TransportOptions {
            user_agent: Some("matomo-tracker-test".to_string()),
            timeout: Some(Duration::from_secs(5)),
        };
        let transport = ReqwestTransport::with_options(TransportScheme::Plain, &options);
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_mock_transport_records_and_replays() {
        let mock = MockTransport::with_status(204);
        mock.replies
            .lock()
            .push_back(Err(TransportError::new("refused")));

        let url = Url::parse("http://example.com/matomo.php?a=1").unwrap();
        let first = mock.get(url.clone()).await;
        let second = mock.get(url).await;

        assert_eq!(first, Err(TransportError::new("refused")));
        assert_eq!(second, Ok(TransportResponse::status_only(204)));
        assert_eq!(mock.recorded().len(), 2);
    }
}
