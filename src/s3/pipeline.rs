//! Authenticated request pipeline
//!
//! Every storage call goes through `RequestPipeline::execute`:
//! 1. attach credentials (bearer token from the session cache, or SigV4 headers)
//! 2. dispatch through the transport, retrying transient transport failures
//! 3. classify the response: any status >= 400 becomes a `Server` error
//!
//! The login call that fills the session cache uses the same transport and
//! retry policy but carries no credentials of its own.

use bytes::Bytes;
use chrono::Utc;
use hyper::Method;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::s3::endpoint::Endpoint;
use crate::s3::error::{Result, StorageError};
use crate::s3::session::SessionCache;
use crate::s3::signer::{SigV4Signer, SigningContext, EMPTY_SHA256};
use crate::s3::xml;
use crate::transport::{send_with_retry, HttpRequest, HttpResponse, RetryPolicy, Transport};

pub const LOGIN_PATH: &str = "/api/admin/auth/login";

/// How authenticated calls prove who they are
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `Authorization: Bearer <token>` from the session cache
    #[default]
    Session,
    /// Per-request SigV4 header signing
    Sigv4,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" | "bearer" => Ok(AuthMode::Session),
            "sigv4" | "signed" => Ok(AuthMode::Sigv4),
            other => Err(format!("unknown auth mode '{}'", other)),
        }
    }
}

/// Username/password for the login call
#[derive(Clone)]
pub struct LoginCredentials {
    username: String,
    password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Request pipeline bound to one endpoint and one set of credentials
#[derive(Clone)]
pub struct RequestPipeline<T: Transport> {
    transport: T,
    endpoint: Endpoint,
    retry: RetryPolicy,
    auth: AuthMode,
    login: LoginCredentials,
    signer: SigV4Signer,
    session: Arc<SessionCache>,
}

impl<T: Transport> RequestPipeline<T> {
    pub fn new(
        transport: T,
        endpoint: Endpoint,
        auth: AuthMode,
        login: LoginCredentials,
        signer: SigV4Signer,
    ) -> Self {
        Self {
            transport,
            endpoint,
            retry: RetryPolicy::default(),
            auth,
            login,
            signer,
            session: Arc::new(SessionCache::default()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_session_cache(mut self, session: Arc<SessionCache>) -> Self {
        self.session = session;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A valid bearer token, logging in when the cache is empty or stale
    pub async fn get_token(&self) -> Result<String> {
        self.session.get_or_refresh(|| self.login()).await
    }

    /// Unauthenticated login call
    async fn login(&self) -> Result<String> {
        let payload = serde_json::to_vec(&LoginRequest {
            username: &self.login.username,
            password: &self.login.password,
        })?;

        let mut request = HttpRequest::new(Method::POST, self.endpoint.url_for(LOGIN_PATH));
        request
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        request.body = Bytes::from(payload);

        debug!(username = %self.login.username, "logging in");
        let response = send_with_retry(&self.transport, &self.retry, request).await?;

        if !response.status.is_success() {
            warn!(status = response.status.as_u16(), "login rejected");
            return Err(StorageError::AuthenticationFailed(format!(
                "login rejected with status {}",
                response.status.as_u16()
            )));
        }

        let parsed: LoginResponse = serde_json::from_slice(&response.body).map_err(|e| {
            StorageError::AuthenticationFailed(format!("malformed login response: {}", e))
        })?;

        match parsed.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                info!(username = %self.login.username, "login succeeded");
                Ok(token)
            }
            None => Err(StorageError::AuthenticationFailed(
                "login response did not contain a token".to_string(),
            )),
        }
    }

    /// Run one authenticated call.
    ///
    /// `path_and_query` must already be percent-encoded.
    pub async fn execute(
        &self,
        method: Method,
        path_and_query: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(method, self.endpoint.url_for(path_and_query));
        request.headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        request.body = body;

        self.authorize(&mut request, path_and_query).await?;

        debug!(method = %request.method, path = %path_and_query, "executing request");
        let response = send_with_retry(&self.transport, &self.retry, request).await?;
        self.classify(response).await
    }

    async fn authorize(&self, request: &mut HttpRequest, path_and_query: &str) -> Result<()> {
        match self.auth {
            AuthMode::Session => {
                let token = self.get_token().await?;
                request
                    .headers
                    .insert("authorization".to_string(), format!("Bearer {}", token));
            }
            AuthMode::Sigv4 => {
                let (path, query) = split_path_and_query(path_and_query);
                let payload_hash = if request.body.is_empty() {
                    EMPTY_SHA256.to_string()
                } else {
                    hex::encode(Sha256::digest(&request.body))
                };
                let timestamp = Utc::now();

                request
                    .headers
                    .insert("host".to_string(), self.endpoint.authority().to_string());
                request
                    .headers
                    .insert("x-amz-content-sha256".to_string(), payload_hash);
                request.headers.insert(
                    "x-amz-date".to_string(),
                    crate::s3::signer::amz_date(&timestamp),
                );

                let method = request.method.as_str().to_string();
                let ctx = SigningContext {
                    method: &method,
                    host: self.endpoint.authority(),
                    path,
                    query,
                    headers: request.headers.clone(),
                    body: Some(&request.body[..]),
                    timestamp,
                };
                for (name, value) in self.signer.sign_request(&ctx) {
                    request.headers.insert(name.to_ascii_lowercase(), value);
                }
            }
        }
        Ok(())
    }

    /// Turn statuses >= 400 into errors
    async fn classify(&self, response: HttpResponse) -> Result<HttpResponse> {
        let status = response.status.as_u16();
        if status < 400 {
            return Ok(response);
        }

        if status == 401 && self.auth == AuthMode::Session {
            self.session.invalidate().await;
        }

        let code = xml::error_code(&response.body);
        debug!(status, code = code.as_deref().unwrap_or(""), "request failed");
        Err(StorageError::from_status(status, code))
    }
}

/// Split `path?query` into the path and decoded query parameters
fn split_path_and_query(path_and_query: &str) -> (&str, BTreeMap<String, String>) {
    let (path, raw_query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, query),
        None => (path_and_query, ""),
    };

    let mut query = BTreeMap::new();
    for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key).map(|k| k.into_owned()).unwrap_or_else(|_| key.to_string());
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        query.insert(key, value);
    }

    (path, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_and_query() {
        let (path, query) = split_path_and_query("/bucket?uploads");
        assert_eq!(path, "/bucket");
        assert_eq!(query.get("uploads").map(String::as_str), Some(""));

        let (path, query) =
            split_path_and_query("/bucket/key?partNumber=2&uploadId=abc%2Fdef");
        assert_eq!(path, "/bucket/key");
        assert_eq!(query["partNumber"], "2");
        assert_eq!(query["uploadId"], "abc/def");

        let (path, query) = split_path_and_query("/bucket/key");
        assert_eq!(path, "/bucket/key");
        assert!(query.is_empty());
    }

    #[test]
    fn test_auth_mode_parsing() {
        assert_eq!("session".parse::<AuthMode>(), Ok(AuthMode::Session));
        assert_eq!("SigV4".parse::<AuthMode>(), Ok(AuthMode::Sigv4));
        assert!("basic".parse::<AuthMode>().is_err());
        assert_eq!(AuthMode::default(), AuthMode::Session);
    }

    #[test]
    fn test_login_request_field_names() {
        let body = serde_json::to_string(&LoginRequest {
            username: "admin",
            password: "pw",
        })
        .unwrap();
        assert_eq!(body, r#"{"Username":"admin","Password":"pw"}"#);
    }

    #[test]
    fn test_login_credentials_debug_redacts_password() {
        let creds = LoginCredentials::new("admin", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
    }
}
