//! HTTP transport layer
//!
//! This module provides:
//! - The `Transport` seam the request pipeline dispatches through
//! - A pooled hyper client (`HyperTransport`) shared by every call of a client
//! - The retry state machine used for transient, connection-level failures

pub mod retry;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

pub use retry::{send_with_retry, RetryPolicy, RetryState};

/// Transport-level errors (the request never produced an HTTP response)
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Connection errors and timeouts may succeed on another attempt;
    /// a request that cannot be built never will.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

/// A fully-formed outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Header names are stored lower-case
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A fully-collected response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Something that can carry one HTTP exchange.
///
/// Implementations must be cheap to clone and safe to share across tasks;
/// the pipeline clones nothing but the request between attempts.
pub trait Transport: Clone + Send + Sync + 'static {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Pooled hyper client
///
/// Clone is cheap - the underlying HTTP client uses Arc internally, so all
/// clones share one connection pool.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    /// Per-attempt timeout (covers the exchange and body collection)
    timeout: Duration,
}

impl HyperTransport {
    /// Create a transport with the given per-attempt timeout.
    ///
    /// `insecure_tls` disables certificate and hostname verification and
    /// is meant for test clusters with self-signed certificates only.
    pub fn new(timeout: Duration, insecure_tls: bool) -> Result<Self, TransportError> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(timeout));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let tls = if insecure_tls {
            tracing::warn!("INSECURE TLS MODE ENABLED: Certificate verification is disabled!");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            TlsConnector::new()
        }
        .map_err(|e| TransportError::InvalidRequest(format!("TLS setup failed: {}", e)))?;

        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(100)
            .set_host(true)
            .build(https);

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = Request::builder().method(request.method).uri(&request.url);
        for (key, value) in request.headers.iter() {
            builder = builder.header(key, value);
        }

        let req = builder
            .body(Full::new(request.body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .request(req)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();

        Ok(HttpResponse { status, headers, body })
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}
