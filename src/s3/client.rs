//! Storage client
//!
//! `StorageClient` maps bucket and object operations onto the request
//! pipeline, and produces presigned URLs through the signer and guardrail
//! without touching the network.
//!
//! The client is cheap to clone: the transport pool and the session cache
//! are shared between clones.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use hyper::Method;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, Profile, RetrySettings};
use crate::s3::endpoint::EndpointPair;
use crate::s3::error::{Result, StorageError};
use crate::s3::guardrail::{AuditSink, PresignGuardrail, TracingAuditSink};
use crate::s3::pipeline::{LoginCredentials, RequestPipeline};
use crate::s3::session::{fixed_margin, ExpiryEstimator, SessionCache};
use crate::s3::signer::{uri_encode, Credentials, PresignParams, SigV4Signer};
use crate::s3::types::{
    validate_bucket_name, validate_names, Bucket, BucketListBody, CompleteMultipartUploadResponse,
    CompletedPart, CopyObjectResult, CreateMultipartUploadResponse, DeleteObjectsResponse,
    GetObjectResult, ListObjectsBody, ListObjectsOptions, ListObjectsResult, MultipartConfig,
    ObjectMetadata, PresignRequest, PresignedUrlResult, PutObjectResult, MAX_DELETE_KEYS,
};
use crate::s3::xml;
use crate::transport::{HttpResponse, HyperTransport, RetryPolicy, Transport};

const BUCKETS_PATH: &str = "/api/admin/buckets";
const HEALTH_PATH: &str = "/api/health";
const META_PREFIX: &str = "x-amz-meta-";

/// Fixed-delay loop around the exists-then-create sequence
#[derive(Debug, Clone)]
struct BucketRetry {
    attempts: u32,
    delay: Duration,
}

/// S3-compatible storage client
#[derive(Clone)]
pub struct StorageClient<T: Transport = HyperTransport> {
    pipeline: RequestPipeline<T>,
    signer: SigV4Signer,
    guardrail: PresignGuardrail,
    bucket_retry: BucketRetry,
}

impl StorageClient<HyperTransport> {
    /// Client for one profile, using the pooled hyper transport
    pub fn new(profile: &Profile) -> Result<Self> {
        let transport = HyperTransport::new(profile.timeout(), profile.insecure_tls)?;
        Self::with_transport(profile, transport)
    }

    /// Client for a named (or the default) profile of a loaded configuration
    pub fn from_config(config: &Config, profile_name: Option<&str>) -> Result<Self> {
        let profile = config.get_profile(profile_name).ok_or_else(|| {
            StorageError::InvalidConfig(format!(
                "profile '{}' not found",
                profile_name.unwrap_or("default")
            ))
        })?;
        Self::for_profile(profile, config)
    }

    /// Client for an already resolved profile, with the configuration's
    /// retry and session settings applied
    pub fn for_profile(profile: &Profile, config: &Config) -> Result<Self> {
        let margin = config.session.token_lifetime()?;
        Ok(Self::new(profile)?
            .with_retry_settings(&config.retry)
            .with_expiry_estimator(fixed_margin(margin)))
    }
}

impl<T: Transport> StorageClient<T> {
    /// Client for one profile over any transport
    pub fn with_transport(profile: &Profile, transport: T) -> Result<Self> {
        let endpoints = EndpointPair::parse(
            &profile.endpoint,
            profile.public_endpoint.as_deref(),
            profile.use_ssl,
        )?;

        let signer = SigV4Signer::new(Credentials::new(
            profile.access_key.clone(),
            profile.secret_key.clone(),
        ));
        let login = LoginCredentials::new(profile.username.clone(), profile.password.clone());

        let settings = RetrySettings::default();
        let pipeline = RequestPipeline::new(
            transport,
            endpoints.internal.clone(),
            profile.auth_mode,
            login,
            signer.clone(),
        )
        .with_retry_policy(
            RetryPolicy::new(profile.max_retries)
                .with_delays(settings.base_delay(), settings.max_delay()),
        );

        debug!(
            endpoint = %endpoints.internal,
            public_endpoint = ?endpoints.public.as_ref().map(|p| p.to_string()),
            auth_mode = ?profile.auth_mode,
            "storage client created"
        );

        Ok(Self {
            pipeline,
            signer,
            guardrail: PresignGuardrail::new(endpoints, Arc::new(TracingAuditSink)),
            bucket_retry: BucketRetry {
                attempts: settings.bucket_attempts,
                delay: settings.bucket_delay(),
            },
        })
    }

    /// Replace the sink that receives presigned URL audit records
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.guardrail = PresignGuardrail::new(self.guardrail.endpoints().clone(), sink);
        self
    }

    /// Replace the token expiry policy (drops any cached token)
    pub fn with_expiry_estimator(mut self, estimator: ExpiryEstimator) -> Self {
        self.pipeline = self
            .pipeline
            .with_session_cache(Arc::new(SessionCache::new(estimator)));
        self
    }

    /// Apply backoff delays and the bucket-ensure budget
    pub fn with_retry_settings(mut self, settings: &RetrySettings) -> Self {
        let mut policy = RetryPolicy::new(self.pipeline.retry_policy().max_attempts)
            .with_delays(settings.base_delay(), settings.max_delay());
        if let Some(deadline) = settings.deadline() {
            policy = policy.with_deadline(deadline);
        }
        self.pipeline = self.pipeline.with_retry_policy(policy);
        self.bucket_retry = BucketRetry {
            attempts: settings.bucket_attempts,
            delay: settings.bucket_delay(),
        };
        self
    }

    pub fn pipeline(&self) -> &RequestPipeline<T> {
        &self.pipeline
    }

    pub fn endpoints(&self) -> &EndpointPair {
        self.guardrail.endpoints()
    }

    /// Current bearer token, logging in if needed
    pub async fn get_token(&self) -> Result<String> {
        self.pipeline.get_token().await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<HttpResponse> {
        self.pipeline.execute(method, path, headers, body).await
    }

    async fn execute_simple(&self, method: Method, path: &str) -> Result<HttpResponse> {
        self.execute(method, path, BTreeMap::new(), Bytes::new()).await
    }

    // =========================================================================
    // Buckets
    // =========================================================================

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        validate_bucket_name(bucket)?;
        match self.execute_simple(Method::HEAD, &bucket_path(bucket)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn make_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket_name(bucket)?;
        match self.execute_simple(Method::PUT, &bucket_path(bucket)).await {
            Ok(_) => {
                info!(bucket = %bucket, "bucket created");
                Ok(())
            }
            Err(e) if e.status_code() == Some(409) => {
                Err(StorageError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket_name(bucket)?;
        self.execute_simple(Method::DELETE, &bucket_path(bucket))
            .await
            .map_err(|e| bucket_not_found(e, bucket))?;
        info!(bucket = %bucket, "bucket removed");
        Ok(())
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let response = self.execute_simple(Method::GET, BUCKETS_PATH).await?;
        let body: BucketListBody = serde_json::from_slice(&response.body)?;
        Ok(body.buckets)
    }

    /// Make sure a bucket exists, retrying the whole sequence.
    ///
    /// Intermediate failures are logged and swallowed until the attempt
    /// budget runs out; the last one is returned. A bucket created
    /// concurrently by someone else counts as success.
    pub async fn ensure_bucket_exists(&self, bucket: &str) -> Result<()> {
        validate_bucket_name(bucket)?;
        let attempts = self.bucket_retry.attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match self.bucket_exists(bucket).await {
                Ok(true) => Ok(()),
                Ok(false) => match self.make_bucket(bucket).await {
                    Err(StorageError::BucketAlreadyExists(_)) => Ok(()),
                    other => other,
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= attempts => {
                    warn!(bucket = %bucket, attempts = attempt, error = %e, "giving up on bucket");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        bucket = %bucket,
                        attempt,
                        delay_ms = self.bucket_retry.delay.as_millis() as u64,
                        error = %e,
                        "bucket check failed, retrying"
                    );
                    tokio::time::sleep(self.bucket_retry.delay).await;
                }
            }
        }
    }

    // =========================================================================
    // Objects
    // =========================================================================

    pub async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        content_type: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PutObjectResult> {
        validate_names(bucket, object)?;

        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            content_type.unwrap_or("application/octet-stream").to_string(),
        );
        for (key, value) in metadata {
            headers.insert(format!("{}{}", META_PREFIX, key.to_ascii_lowercase()), value.clone());
        }

        let size = data.len();
        let response = self
            .execute(Method::PUT, &object_path(bucket, object), headers, data)
            .await
            .map_err(|e| bucket_not_found(e, bucket))?;

        debug!(bucket = %bucket, object = %object, size, "object stored");
        Ok(PutObjectResult {
            bucket: bucket.to_string(),
            object: object.to_string(),
            etag: etag_header(&response),
            version_id: response.header("x-amz-version-id").map(str::to_string),
        })
    }

    pub async fn get_object(&self, bucket: &str, object: &str) -> Result<GetObjectResult> {
        validate_names(bucket, object)?;
        let response = self
            .execute_simple(Method::GET, &object_path(bucket, object))
            .await
            .map_err(|e| object_not_found(e, bucket, object))?;

        let mut metadata = metadata_from_headers(&response, bucket, object);
        metadata.size = response.body.len() as u64;
        Ok(GetObjectResult {
            data: response.body,
            metadata,
        })
    }

    /// Metadata without the body
    pub async fn stat_object(&self, bucket: &str, object: &str) -> Result<ObjectMetadata> {
        validate_names(bucket, object)?;
        let response = self
            .execute_simple(Method::HEAD, &object_path(bucket, object))
            .await
            .map_err(|e| object_not_found(e, bucket, object))?;
        Ok(metadata_from_headers(&response, bucket, object))
    }

    /// Delete one object; deleting a missing object succeeds
    pub async fn remove_object(&self, bucket: &str, object: &str) -> Result<()> {
        validate_names(bucket, object)?;
        match self
            .execute_simple(Method::DELETE, &object_path(bucket, object))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(bucket = %bucket, object = %object, "object already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Batch delete, split into requests of at most 1000 keys
    pub async fn remove_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteObjectsResponse> {
        validate_bucket_name(bucket)?;
        let mut combined = DeleteObjectsResponse::default();

        for chunk in keys.chunks(MAX_DELETE_KEYS) {
            let body = xml::build_delete_body(chunk).into_bytes();
            let md5_hash = md5::compute(&body);
            let md5_base64 =
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &md5_hash[..]);

            let mut headers = BTreeMap::new();
            headers.insert("content-type".to_string(), "application/xml".to_string());
            headers.insert("content-md5".to_string(), md5_base64);

            // "?delete=" keeps the canonical query string at "delete="
            let path = format!("{}?delete=", bucket_path(bucket));
            let response = self
                .execute(Method::POST, &path, headers, Bytes::from(body))
                .await
                .map_err(|e| bucket_not_found(e, bucket))?;

            let parsed = xml::parse_delete_response(&response.body)?;
            combined.deleted.extend(parsed.deleted);
            combined.errors.extend(parsed.errors);
        }

        if !combined.errors.is_empty() {
            warn!(
                bucket = %bucket,
                failed = combined.errors.len(),
                deleted = combined.deleted.len(),
                "batch delete partially failed"
            );
        }
        Ok(combined)
    }

    /// Server-side copy; returns the new object's ETag
    pub async fn copy_object(
        &self,
        src_bucket: &str,
        src_object: &str,
        dst_bucket: &str,
        dst_object: &str,
    ) -> Result<CopyObjectResult> {
        validate_names(src_bucket, src_object)?;
        validate_names(dst_bucket, dst_object)?;

        let mut headers = BTreeMap::new();
        headers.insert(
            "x-amz-copy-source".to_string(),
            object_path(src_bucket, src_object),
        );

        let response = self
            .execute(
                Method::PUT,
                &object_path(dst_bucket, dst_object),
                headers,
                Bytes::new(),
            )
            .await
            .map_err(|e| object_not_found(e, src_bucket, src_object))?;

        // Some gateways answer with an empty body and only the header
        let (etag, last_modified) = if response.body.is_empty() {
            let etag = etag_header(&response).ok_or_else(|| {
                StorageError::InvalidResponse("copy returned no ETag".to_string())
            })?;
            (etag, None)
        } else {
            let fields = xml::parse_copy_object_response(&response.body)?;
            (fields.etag, fields.last_modified)
        };

        debug!(
            src_bucket = %src_bucket,
            src_object = %src_object,
            bucket = %dst_bucket,
            object = %dst_object,
            "object copied"
        );
        Ok(CopyObjectResult {
            bucket: dst_bucket.to_string(),
            object: dst_object.to_string(),
            etag,
            last_modified,
        })
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        options: &ListObjectsOptions,
    ) -> Result<ListObjectsResult> {
        validate_bucket_name(bucket)?;
        let path = build_list_path(bucket, options);
        let response = self
            .execute_simple(Method::GET, &path)
            .await
            .map_err(|e| bucket_not_found(e, bucket))?;

        let body: ListObjectsBody = serde_json::from_slice(&response.body)?;
        Ok(body.into_result(bucket))
    }

    // =========================================================================
    // Multipart
    // =========================================================================

    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: Option<&str>,
    ) -> Result<CreateMultipartUploadResponse> {
        validate_names(bucket, object)?;
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            content_type.unwrap_or("application/octet-stream").to_string(),
        );

        let path = format!("{}?uploads", object_path(bucket, object));
        let response = self
            .execute(Method::POST, &path, headers, Bytes::new())
            .await
            .map_err(|e| bucket_not_found(e, bucket))?;
        xml::parse_create_multipart_response(&response.body)
    }

    /// Upload one part (1-indexed); returns the part with its ETag
    pub async fn upload_part(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> Result<CompletedPart> {
        let mut path = object_path(bucket, object);
        let _ = write!(
            path,
            "?partNumber={}&uploadId={}",
            part_number,
            uri_encode(upload_id, true)
        );

        let response = self
            .execute(Method::PUT, &path, BTreeMap::new(), data)
            .await?;
        let etag = etag_header(&response).ok_or_else(|| {
            StorageError::InvalidResponse(format!("part {} returned no ETag", part_number))
        })?;
        Ok(CompletedPart::new(part_number, etag))
    }

    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompleteMultipartUploadResponse> {
        let mut sorted = parts.to_vec();
        sorted.sort_by_key(|p| p.part_number);
        let body = xml::build_complete_body(&sorted);

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());

        let path = format!(
            "{}?uploadId={}",
            object_path(bucket, object),
            uri_encode(upload_id, true)
        );
        let response = self
            .execute(Method::POST, &path, headers, Bytes::from(body))
            .await?;
        xml::parse_complete_multipart_response(&response.body)
    }

    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
    ) -> Result<()> {
        let path = format!(
            "{}?uploadId={}",
            object_path(bucket, object),
            uri_encode(upload_id, true)
        );
        self.execute_simple(Method::DELETE, &path).await?;
        Ok(())
    }

    /// Split `data` into parts and upload them with bounded concurrency.
    ///
    /// Any part failure aborts the upload and returns that failure.
    pub async fn upload_multipart(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        config: &MultipartConfig,
    ) -> Result<CompleteMultipartUploadResponse> {
        let upload = self.create_multipart_upload(bucket, object, None).await?;
        let upload_id = upload.upload_id;

        let total_size = data.len();
        let part_size = config.part_size.max(1);
        let num_parts = config.part_count(total_size);

        let parts: Vec<(u32, Bytes)> = (0..num_parts)
            .map(|index| {
                let start = index * part_size;
                let end = std::cmp::min(start + part_size, total_size);
                ((index + 1) as u32, data.slice(start..end))
            })
            .collect();

        let results: Vec<Result<CompletedPart>> = stream::iter(parts)
            .map(|(part_number, part_data)| {
                let upload_id = upload_id.as_str();
                async move {
                    self.upload_part(bucket, object, upload_id, part_number, part_data)
                        .await
                }
            })
            .buffer_unordered(config.concurrency.max(1))
            .collect()
            .await;

        let mut completed = Vec::with_capacity(num_parts);
        let mut failure = None;
        for result in results {
            match result {
                Ok(part) => completed.push(part),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            warn!(bucket = %bucket, object = %object, error = %err, "part upload failed, aborting");
            if let Err(abort_err) = self.abort_multipart_upload(bucket, object, &upload_id).await {
                warn!(upload_id = %upload_id, error = %abort_err, "abort failed");
            }
            return Err(err);
        }

        debug!(bucket = %bucket, object = %object, parts = num_parts, "all parts uploaded");
        self.complete_multipart_upload(bucket, object, &upload_id, &completed)
            .await
    }

    // =========================================================================
    // Presigned URLs
    // =========================================================================

    /// Presigned GET; no network call
    pub fn presigned_get_object(
        &self,
        bucket: &str,
        object: &str,
        expires_in_seconds: u64,
        browser_accessible: bool,
    ) -> Result<PresignedUrlResult> {
        let request = PresignRequest::new(bucket, object, expires_in_seconds, browser_accessible);
        self.presign_at(Method::GET, &request, Utc::now())
    }

    /// Presigned PUT; no network call
    pub fn presigned_put_object(
        &self,
        bucket: &str,
        object: &str,
        expires_in_seconds: u64,
        browser_accessible: bool,
    ) -> Result<PresignedUrlResult> {
        let request = PresignRequest::new(bucket, object, expires_in_seconds, browser_accessible);
        self.presign_at(Method::PUT, &request, Utc::now())
    }

    /// Presign with an explicit signing time
    pub fn presign_at(
        &self,
        method: Method,
        request: &PresignRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<PresignedUrlResult> {
        request.validate()?;
        if !self.signer.has_credentials() {
            return Err(StorageError::InvalidConfig(
                "presigning needs an access key and secret key".to_string(),
            ));
        }

        let target = self.guardrail.resolve_target(request);
        let path = object_path(&request.bucket, &request.object);
        let url = self.signer.presign_url(&PresignParams {
            method: method.as_str(),
            host: target.authority(),
            path: &path,
            query: BTreeMap::new(),
            expires_in_seconds: request.expires_in_seconds,
            use_https: target.is_https(),
            timestamp,
        })?;

        self.guardrail.validate(&url, request)?;

        Ok(PresignedUrlResult {
            url,
            expires_at: timestamp + chrono::Duration::seconds(request.expires_in_seconds as i64),
        })
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// True when the server answers the health endpoint successfully
    pub async fn health(&self) -> bool {
        match self.execute_simple(Method::GET, HEALTH_PATH).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        }
    }

    /// True when an authenticated bucket listing succeeds
    pub async fn health_check_buckets(&self) -> bool {
        match self.list_buckets().await {
            Ok(buckets) => {
                debug!(buckets = buckets.len(), "bucket listing healthy");
                true
            }
            Err(e) => {
                debug!(error = %e, "bucket listing health check failed");
                false
            }
        }
    }
}

fn bucket_path(bucket: &str) -> String {
    format!("/{}", uri_encode(bucket, true))
}

/// `/{bucket}/{key}` with the key encoded and `/` preserved
fn object_path(bucket: &str, object: &str) -> String {
    let encoded = uri_encode(object, false);
    let mut path = String::with_capacity(bucket.len() + encoded.len() + 2);
    path.push('/');
    path.push_str(&uri_encode(bucket, true));
    path.push('/');
    path.push_str(&encoded);
    path
}

fn build_list_path(bucket: &str, options: &ListObjectsOptions) -> String {
    let mut path = bucket_path(bucket);
    let mut params: Vec<(&str, String)> = Vec::with_capacity(4);

    if let Some(prefix) = options.prefix.as_deref().filter(|p| !p.is_empty()) {
        params.push(("prefix", uri_encode(prefix, true)));
    }
    if let Some(delimiter) = options.delimiter.as_deref().filter(|d| !d.is_empty()) {
        params.push(("delimiter", uri_encode(delimiter, true)));
    }
    if let Some(max_keys) = options.max_keys.filter(|m| *m > 0) {
        params.push(("max-keys", max_keys.to_string()));
    }
    if let Some(token) = options.continuation_token.as_deref().filter(|t| !t.is_empty()) {
        params.push(("continuation-token", uri_encode(token, true)));
    }

    for (index, (key, value)) in params.iter().enumerate() {
        path.push(if index == 0 { '?' } else { '&' });
        path.push_str(key);
        path.push('=');
        path.push_str(value);
    }
    path
}

fn etag_header(response: &HttpResponse) -> Option<String> {
    response
        .header("etag")
        .map(|v| v.trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

fn metadata_from_headers(response: &HttpResponse, bucket: &str, object: &str) -> ObjectMetadata {
    let metadata = response
        .headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(META_PREFIX)?;
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();

    ObjectMetadata {
        bucket: bucket.to_string(),
        object: object.to_string(),
        size: response
            .header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        etag: etag_header(response),
        last_modified: response
            .header("last-modified")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|d| d.with_timezone(&Utc)),
        content_type: response.header("content-type").map(str::to_string),
        metadata,
    }
}

fn bucket_not_found(err: StorageError, bucket: &str) -> StorageError {
    if matches!(err, StorageError::Server { status: 404, .. }) {
        StorageError::BucketNotFound(bucket.to_string())
    } else {
        err
    }
}

fn object_not_found(err: StorageError, bucket: &str, object: &str) -> StorageError {
    match err {
        StorageError::Server {
            status: 404,
            code: Some(ref code),
            ..
        } if code == "NoSuchBucket" => StorageError::BucketNotFound(bucket.to_string()),
        StorageError::Server { status: 404, .. } => StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            object: object.to_string(),
        },
        other => other,
    }
}
