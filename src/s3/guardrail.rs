//! Presigned URL guardrail
//!
//! Decides which endpoint a presigned URL is signed against and validates the
//! result before it leaves the client. Browser-accessible URLs must not point
//! at internal hosts, and must match the configured public host when one is
//! set. Accepted URLs are reported to an [`AuditSink`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::s3::endpoint::{Endpoint, EndpointPair};
use crate::s3::error::{Result, StorageError};
use crate::s3::types::PresignRequest;

/// One accepted browser-accessible presigned URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignAudit {
    pub host: String,
    pub configured_public_host: Option<String>,
    pub expiry_seconds: u64,
    pub bucket: String,
    pub object: String,
}

/// Receives guardrail decisions
pub trait AuditSink: Send + Sync {
    /// A browser-accessible URL passed every check
    fn accepted(&self, record: &PresignAudit);

    /// A browser-accessible URL was signed against the internal endpoint
    /// because no public endpoint is configured
    fn public_endpoint_missing(&self, internal_host: &str, bucket: &str, object: &str);
}

/// Writes audit records through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn accepted(&self, record: &PresignAudit) {
        info!(
            target: "omnix_storage::audit",
            host = %record.host,
            configured_public_host = record.configured_public_host.as_deref().unwrap_or("<none>"),
            expiry_seconds = record.expiry_seconds,
            bucket = %record.bucket,
            object = %record.object,
            "presigned URL issued"
        );
    }

    fn public_endpoint_missing(&self, internal_host: &str, bucket: &str, object: &str) {
        warn!(
            target: "omnix_storage::audit",
            host = %internal_host,
            bucket = %bucket,
            object = %object,
            "no public endpoint configured; browser-accessible URL uses the internal endpoint \
             and may not work outside the private network"
        );
    }
}

/// Guardrail bound to one endpoint pair
#[derive(Clone)]
pub struct PresignGuardrail {
    endpoints: EndpointPair,
    sink: Arc<dyn AuditSink>,
}

impl PresignGuardrail {
    pub fn new(endpoints: EndpointPair, sink: Arc<dyn AuditSink>) -> Self {
        Self { endpoints, sink }
    }

    pub fn endpoints(&self) -> &EndpointPair {
        &self.endpoints
    }

    /// Endpoint to sign against
    pub fn resolve_target(&self, request: &PresignRequest) -> &Endpoint {
        if !request.browser_accessible {
            return &self.endpoints.internal;
        }
        match &self.endpoints.public {
            Some(public) => public,
            None => {
                self.sink.public_endpoint_missing(
                    self.endpoints.internal.host(),
                    &request.bucket,
                    &request.object,
                );
                &self.endpoints.internal
            }
        }
    }

    /// Check a signed URL; returns the host it resolves to
    pub fn validate(&self, signed_url: &str, request: &PresignRequest) -> Result<String> {
        let parsed = Url::parse(signed_url)
            .map_err(|e| StorageError::InvalidUrl(format!("{}: {}", signed_url, e)))?;
        if parsed.scheme().is_empty() {
            return Err(StorageError::InvalidUrl(format!("{} has no scheme", signed_url)));
        }
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StorageError::InvalidUrl(format!("{} has no host", signed_url)))?
            .to_ascii_lowercase();

        if !request.browser_accessible {
            return Ok(host);
        }

        if is_internal_host(&host) {
            warn!(host = %host, bucket = %request.bucket, "rejected presigned URL for internal host");
            return Err(StorageError::RejectedInternalHost(host));
        }

        let configured_public_host = self.endpoints.public.as_ref().map(|p| p.host().to_string());
        if let Some(expected) = &configured_public_host {
            if !host.eq_ignore_ascii_case(expected) {
                return Err(StorageError::RejectedHostMismatch {
                    host,
                    expected: expected.clone(),
                });
            }
        }

        self.sink.accepted(&PresignAudit {
            host: host.clone(),
            configured_public_host,
            expiry_seconds: request.expires_in_seconds,
            bucket: request.bucket.clone(),
            object: request.object.clone(),
        });

        Ok(host)
    }
}

/// Hosts that only resolve inside a private network
pub fn is_internal_host(host: &str) -> bool {
    let host = host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    if host.ends_with(".local") || host.ends_with(".internal") {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_internal_v4(ip),
        Ok(IpAddr::V6(ip)) => is_internal_v6(ip),
        Err(_) => false,
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    // is_private covers 10/8, 172.16/12 and 192.168/16
    ip.is_loopback() || ip.is_private() || ip.is_unspecified()
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    match ip.to_ipv4_mapped() {
        Some(v4) => is_internal_v4(v4),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        accepted: Mutex<Vec<PresignAudit>>,
        fallbacks: Mutex<Vec<String>>,
    }

    impl AuditSink for RecordingSink {
        fn accepted(&self, record: &PresignAudit) {
            self.accepted.lock().unwrap().push(record.clone());
        }

        fn public_endpoint_missing(&self, internal_host: &str, _bucket: &str, _object: &str) {
            self.fallbacks.lock().unwrap().push(internal_host.to_string());
        }
    }

    fn request(browser_accessible: bool) -> PresignRequest {
        PresignRequest {
            bucket: "photos".into(),
            object: "a.jpg".into(),
            expires_in_seconds: 900,
            browser_accessible,
        }
    }

    fn guardrail(public: Option<&str>) -> (PresignGuardrail, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let endpoints = EndpointPair::parse("storage.internal:9000", public, false).unwrap();
        (PresignGuardrail::new(endpoints, sink.clone()), sink)
    }

    #[test]
    fn test_internal_hosts() {
        for host in [
            "127.0.0.1",
            "localhost",
            "10.1.2.3",
            "192.168.0.5",
            "172.20.0.1",
            "foo.local",
            "foo.internal",
            "[::1]",
            "LOCALHOST",
        ] {
            assert!(is_internal_host(host), "{} should be internal", host);
        }
    }

    #[test]
    fn test_public_hosts() {
        for host in ["storage-public.example.com", "8.8.8.8", "172.32.0.1", "internal.example.com"] {
            assert!(!is_internal_host(host), "{} should be public", host);
        }
    }

    #[test]
    fn test_resolve_target_prefers_public() {
        let (guard, sink) = guardrail(Some("storage-public.example.com"));
        assert_eq!(guard.resolve_target(&request(true)).host(), "storage-public.example.com");
        assert_eq!(guard.resolve_target(&request(false)).host(), "storage.internal");
        assert!(sink.fallbacks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_target_falls_back_with_warning() {
        let (guard, sink) = guardrail(None);
        assert_eq!(guard.resolve_target(&request(true)).host(), "storage.internal");
        assert_eq!(sink.fallbacks.lock().unwrap().as_slice(), ["storage.internal"]);
    }

    #[test]
    fn test_accepts_and_audits_public_url() {
        let (guard, sink) = guardrail(Some("storage-public.example.com"));
        let host = guard
            .validate(
                "https://Storage-Public.example.com/photos/a.jpg?X-Amz-Signature=abc",
                &request(true),
            )
            .unwrap();
        assert_eq!(host, "storage-public.example.com");

        let records = sink.accepted.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].expiry_seconds, 900);
        assert_eq!(
            records[0].configured_public_host.as_deref(),
            Some("storage-public.example.com")
        );
    }

    #[test]
    fn test_rejects_internal_host() {
        let (guard, sink) = guardrail(None);
        let err = guard
            .validate("http://storage.internal:9000/photos/a.jpg", &request(true))
            .unwrap_err();
        assert!(matches!(err, StorageError::RejectedInternalHost(h) if h == "storage.internal"));
        assert!(sink.accepted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_host_mismatch() {
        let (guard, _) = guardrail(Some("storage-public.example.com"));
        let err = guard
            .validate("https://cdn.example.com/photos/a.jpg", &request(true))
            .unwrap_err();
        assert!(matches!(err, StorageError::RejectedHostMismatch { .. }));
    }

    #[test]
    fn test_internal_only_url_skips_host_checks() {
        let (guard, sink) = guardrail(Some("storage-public.example.com"));
        let host = guard
            .validate("http://storage.internal:9000/photos/a.jpg", &request(false))
            .unwrap();
        assert_eq!(host, "storage.internal");
        assert!(sink.accepted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let (guard, _) = guardrail(None);
        assert!(matches!(
            guard.validate("not a url", &request(true)),
            Err(StorageError::InvalidUrl(_))
        ));
    }
}
