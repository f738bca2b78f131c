//! Storage client with SigV4 signing and session authentication
//!
//! This module provides:
//! - AWS Signature Version 4 header signing and presigned URLs
//! - Session token caching and the authenticated request pipeline
//! - The presigned URL guardrail for browser-facing links
//! - Async bucket, object and multipart operations

pub mod client;
pub mod endpoint;
pub mod error;
pub mod guardrail;
pub mod pipeline;
pub mod session;
pub mod signer;
pub mod types;
pub mod xml;

// Re-export main types for convenience
pub use client::StorageClient;
pub use endpoint::{Endpoint, EndpointPair};
pub use error::{ErrorKind, Result, StorageError};
pub use guardrail::{AuditSink, PresignAudit, PresignGuardrail, TracingAuditSink};
pub use pipeline::{AuthMode, LoginCredentials, RequestPipeline};
pub use session::{fixed_margin, token_margin, ExpiryEstimator, SessionCache, SessionToken};
pub use signer::{Credentials, PresignParams, SigV4Signer, SigningContext};
pub use types::{
    Bucket, CompleteMultipartUploadResponse, CompletedPart, CopyObjectResult,
    CreateMultipartUploadResponse, DeleteError, DeleteObjectsResponse, DeletedObject,
    GetObjectResult, ListObjectsOptions, ListObjectsResult, MultipartConfig, ObjectMetadata,
    PresignRequest, PresignedUrlResult, PutObjectResult,
};
