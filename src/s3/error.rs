//! Error taxonomy for storage operations

use thiserror::Error;

use crate::s3::signer::MAX_PRESIGN_EXPIRY_SECS;
use crate::transport::TransportError;

/// Coarse classification for programmatic branching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Login rejected or malformed login response
    Authentication,
    /// The server answered with a status >= 400
    Server,
    /// No HTTP response could be obtained
    Transport,
    /// Input rejected before any network call, or a presigned URL rejected after signing
    Validation,
    /// The server answered successfully but the body could not be understood
    Response,
}

/// Storage client errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Bucket '{0}' not found.")]
    BucketNotFound(String),

    #[error("Bucket '{0}' already exists.")]
    BucketAlreadyExists(String),

    #[error("Object '{object}' not found in bucket '{bucket}'.")]
    ObjectNotFound { bucket: String, object: String },

    #[error("Object name '{0}' is invalid.")]
    InvalidObjectName(String),

    #[error("expiry must be between 1 and {max} seconds (7 days), got {0}", max = MAX_PRESIGN_EXPIRY_SECS)]
    InvalidExpiry(u64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid presigned URL: {0}")]
    InvalidUrl(String),

    #[error("presigned URL host '{0}' is internal and cannot be shared with browsers")]
    RejectedInternalHost(String),

    #[error("presigned URL host '{host}' does not match configured public host '{expected}'")]
    RejectedHostMismatch { host: String, expected: String },

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for StorageError {
    fn from(err: quick_xml::Error) -> Self {
        StorageError::XmlParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Build the generic error for a status >= 400
    pub fn from_status(status: u16, code: Option<String>) -> Self {
        if status == 403 {
            return StorageError::AccessDenied(match code {
                Some(code) if code != "AccessDenied" => code,
                _ => "Access denied".to_string(),
            });
        }
        let message = if status == 404 {
            "Resource not found".to_string()
        } else {
            format!("Request failed with status {}", status)
        };
        StorageError::Server {
            status,
            message,
            code,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::AuthenticationFailed(_) => ErrorKind::Authentication,
            StorageError::Server { .. }
            | StorageError::AccessDenied(_)
            | StorageError::BucketNotFound(_)
            | StorageError::BucketAlreadyExists(_)
            | StorageError::ObjectNotFound { .. } => ErrorKind::Server,
            StorageError::Transport(_) => ErrorKind::Transport,
            StorageError::InvalidObjectName(_)
            | StorageError::InvalidConfig(_)
            | StorageError::InvalidExpiry(_)
            | StorageError::InvalidUrl(_)
            | StorageError::RejectedInternalHost(_)
            | StorageError::RejectedHostMismatch { .. } => ErrorKind::Validation,
            StorageError::XmlParse(_)
            | StorageError::InvalidResponse(_)
            | StorageError::Json(_) => ErrorKind::Response,
        }
    }

    /// HTTP status associated with the error, where one applies
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StorageError::AuthenticationFailed(_) => Some(401),
            StorageError::Server { status, .. } => Some(*status),
            StorageError::AccessDenied(_) => Some(403),
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound { .. } => Some(404),
            StorageError::BucketAlreadyExists(_) => Some(409),
            _ => None,
        }
    }

    /// Machine-readable error code, where one applies
    pub fn error_code(&self) -> Option<&str> {
        match self {
            StorageError::AuthenticationFailed(_) => Some("InvalidCredentials"),
            StorageError::Server { code, .. } => code.as_deref(),
            StorageError::AccessDenied(_) => Some("AccessDenied"),
            StorageError::BucketNotFound(_) => Some("NoSuchBucket"),
            StorageError::BucketAlreadyExists(_) => Some("BucketAlreadyExists"),
            StorageError::ObjectNotFound { .. } => Some("NoSuchKey"),
            StorageError::InvalidExpiry(_) => Some("InvalidExpiry"),
            StorageError::RejectedInternalHost(_) => Some("RejectedInternalHost"),
            StorageError::RejectedHostMismatch { .. } => Some("RejectedHostMismatch"),
            _ => None,
        }
    }

    /// True for a server-side 404, whatever its specialization
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_is_access_denied() {
        let err = StorageError::from_status(403, Some("AccessDenied".into()));
        assert!(matches!(err, StorageError::AccessDenied(_)));
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(err.error_code(), Some("AccessDenied"));
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.to_string(), "access denied: Access denied");

        let err = StorageError::from_status(403, Some("SignatureDoesNotMatch".into()));
        assert_eq!(err.to_string(), "access denied: SignatureDoesNotMatch");
        assert_eq!(err.error_code(), Some("AccessDenied"));
    }

    #[test]
    fn test_not_found_message() {
        let err = StorageError::from_status(404, None);
        assert_eq!(err.to_string(), "server error 404: Resource not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_generic_status_message_keeps_code() {
        let err = StorageError::from_status(503, Some("SlowDown".to_string()));
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.error_code(), Some("SlowDown"));
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn test_invalid_expiry_mentions_limit() {
        let err = StorageError::InvalidExpiry(604801);
        assert!(err.to_string().contains("604800"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_domain_not_found_codes() {
        let err = StorageError::ObjectNotFound {
            bucket: "photos".into(),
            object: "a.jpg".into(),
        };
        assert_eq!(err.error_code(), Some("NoSuchKey"));
        assert!(err.is_not_found());
    }
}
