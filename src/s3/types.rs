//! Request and response records

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::s3::error::{Result, StorageError};
use crate::s3::signer::validate_expiry;

/// Maximum keys accepted by one batch delete
pub const MAX_DELETE_KEYS: usize = 1000;

/// Bucket returned by the admin listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(rename = "createdAt")]
    pub creation_date: Option<DateTime<Utc>>,
}

/// `GET /api/admin/buckets` body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BucketListBody {
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// Object metadata from a HEAD, GET or listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectMetadata {
    pub bucket: String,
    pub object: String,
    pub size: u64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    /// `x-amz-meta-*` headers without the prefix
    pub metadata: BTreeMap<String, String>,
}

/// Listing options; empty strings are not sent
#[derive(Debug, Clone)]
pub struct ListObjectsOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: Option<u32>,
    pub continuation_token: Option<String>,
}

impl Default for ListObjectsOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            delimiter: None,
            max_keys: Some(1000),
            continuation_token: None,
        }
    }
}

impl ListObjectsOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListObjectsResult {
    pub objects: Vec<ObjectMetadata>,
    pub is_truncated: bool,
    pub continuation_token: Option<String>,
    pub common_prefixes: Vec<String>,
}

/// Listing body as the server sends it
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListObjectsBody {
    #[serde(default)]
    pub contents: Vec<ListedObject>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub continuation_token: Option<String>,
    #[serde(default)]
    pub common_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListedObject {
    pub key: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ListObjectsBody {
    pub fn into_result(self, bucket: &str) -> ListObjectsResult {
        let objects = self
            .contents
            .into_iter()
            .map(|listed| ObjectMetadata {
                bucket: bucket.to_string(),
                object: listed.key,
                size: listed.size,
                etag: listed.etag,
                last_modified: listed.last_modified,
                ..ObjectMetadata::default()
            })
            .collect();

        ListObjectsResult {
            objects,
            is_truncated: self.is_truncated,
            continuation_token: self.continuation_token,
            common_prefixes: self.common_prefixes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutObjectResult {
    pub bucket: String,
    pub object: String,
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

/// Object body plus the metadata sent with it
#[derive(Debug, Clone)]
pub struct GetObjectResult {
    pub data: Bytes,
    pub metadata: ObjectMetadata,
}

/// A presigned URL and the moment it stops working
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrlResult {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Presigning input, checked before any signing work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignRequest {
    pub bucket: String,
    pub object: String,
    pub expires_in_seconds: u64,
    /// The URL will be handed to a browser outside the private network
    pub browser_accessible: bool,
}

impl PresignRequest {
    pub fn new(
        bucket: impl Into<String>,
        object: impl Into<String>,
        expires_in_seconds: u64,
        browser_accessible: bool,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            expires_in_seconds,
            browser_accessible,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_expiry(self.expires_in_seconds)?;
        validate_names(&self.bucket, &self.object)
    }
}

/// Reject empty bucket or object names
pub fn validate_names(bucket: &str, object: &str) -> Result<()> {
    validate_bucket_name(bucket)?;
    if object.is_empty() {
        return Err(StorageError::InvalidObjectName(object.to_string()));
    }
    Ok(())
}

pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() || bucket.contains('/') {
        return Err(StorageError::InvalidObjectName(bucket.to_string()));
    }
    Ok(())
}

// =============================================================================
// Batch delete
// =============================================================================

/// Result of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteObjectsResponse {
    pub deleted: Vec<DeletedObject>,
    pub errors: Vec<DeleteError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedObject {
    pub key: String,
    pub version_id: Option<String>,
}

impl DeletedObject {
    pub fn new(key: String) -> Self {
        Self {
            key,
            version_id: None,
        }
    }
}

/// Per-key failure inside a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteError {
    pub key: String,
    pub code: String,
    pub message: String,
}

// =============================================================================
// Multipart Upload Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMultipartUploadResponse {
    pub bucket: String,
    pub key: String,
    /// Upload ID for subsequent UploadPart and CompleteMultipartUpload requests
    pub upload_id: String,
}

/// Part information for CompleteMultipartUpload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedPart {
    /// Part number (1-10000)
    pub part_number: u32,
    /// ETag returned from UploadPart
    pub etag: String,
}

impl CompletedPart {
    pub fn new(part_number: u32, etag: String) -> Self {
        Self { part_number, etag }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompleteMultipartUploadResponse {
    pub location: Option<String>,
    pub bucket: String,
    pub key: String,
    pub etag: String,
}

/// Outcome of a server-side copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyObjectResult {
    pub bucket: String,
    pub object: String,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Part sizing for multipart uploads
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Part size in bytes (5MB minimum except for the last part)
    pub part_size: usize,
    /// Maximum concurrent part uploads
    pub concurrency: usize,
}

pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: 8 * 1024 * 1024,
            concurrency: 4,
        }
    }
}

impl MultipartConfig {
    pub fn with_part_size(mut self, size: usize) -> Self {
        self.part_size = size.max(MIN_PART_SIZE);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Number of parts `len` bytes split into (at least one)
    pub fn part_count(&self, len: usize) -> usize {
        let size = self.part_size.max(1);
        len.div_ceil(size).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presign_request_validation() {
        assert!(PresignRequest::new("photos", "a.jpg", 3600, true).validate().is_ok());
        assert!(matches!(
            PresignRequest::new("photos", "a.jpg", 604_801, true).validate(),
            Err(StorageError::InvalidExpiry(604_801))
        ));
        assert!(matches!(
            PresignRequest::new("photos", "", 60, false).validate(),
            Err(StorageError::InvalidObjectName(_))
        ));
        assert!(matches!(
            PresignRequest::new("", "a.jpg", 60, false).validate(),
            Err(StorageError::InvalidObjectName(_))
        ));
    }

    #[test]
    fn test_listing_body_maps_into_result() {
        let body = r#"{
            "contents": [
                {"key": "docs/a.txt", "size": 12, "etag": "\"abc\"", "lastModified": "2024-03-01T10:00:00Z"},
                {"key": "docs/b.txt", "size": 0}
            ],
            "isTruncated": true,
            "continuationToken": "next-page",
            "commonPrefixes": ["docs/sub/"]
        }"#;
        let parsed: ListObjectsBody = serde_json::from_str(body).unwrap();
        let result = parsed.into_result("bucket");

        assert_eq!(result.objects.len(), 2);
        assert_eq!(result.objects[0].bucket, "bucket");
        assert_eq!(result.objects[0].object, "docs/a.txt");
        assert_eq!(result.objects[0].size, 12);
        assert!(result.objects[0].last_modified.is_some());
        assert_eq!(result.objects[1].etag, None);
        assert!(result.is_truncated);
        assert_eq!(result.continuation_token.as_deref(), Some("next-page"));
        assert_eq!(result.common_prefixes, vec!["docs/sub/"]);
    }

    #[test]
    fn test_empty_listing_body() {
        let parsed: ListObjectsBody = serde_json::from_str("{}").unwrap();
        let result = parsed.into_result("bucket");
        assert!(result.objects.is_empty());
        assert!(!result.is_truncated);
    }

    #[test]
    fn test_bucket_list_body() {
        let body = r#"{"buckets":[{"name":"photos","createdAt":"2024-01-02T03:04:05Z"}]}"#;
        let parsed: BucketListBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.buckets[0].name, "photos");
        assert!(parsed.buckets[0].creation_date.is_some());
    }

    #[test]
    fn test_multipart_part_count() {
        let config = MultipartConfig::default().with_part_size(1);
        assert_eq!(config.part_size, MIN_PART_SIZE);
        assert_eq!(config.part_count(0), 1);
        assert_eq!(config.part_count(MIN_PART_SIZE), 1);
        assert_eq!(config.part_count(MIN_PART_SIZE + 1), 2);
        assert_eq!(MultipartConfig::default().with_concurrency(0).concurrency, 1);
    }
}
