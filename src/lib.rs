//! omnix-storage - S3-compatible client with SigV4 signing and browser-safe presigned URLs

pub mod cli;
pub mod config;
pub mod s3;
pub mod transport;

pub use config::Config;
pub use s3::{StorageClient, StorageError};
