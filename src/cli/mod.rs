//! `omnix` command-line interface
//!
//! ```bash
//! omnix ls s3://bucket/prefix --recursive
//! omnix put ./photo.jpg s3://bucket/photos/photo.jpg
//! omnix get s3://bucket/photos/photo.jpg ./photo.jpg
//! omnix presign get s3://bucket/photos/photo.jpg --expires 900 --browser
//! ```

pub mod commands;

use std::fmt::Write as _;

/// Split `s3://bucket/key` (or mc-style `s3/bucket/key`) into bucket and key
pub fn parse_s3_path(path: &str) -> anyhow::Result<(String, Option<String>)> {
    let path = path.trim();

    let stripped = if let Some(p) = path.strip_prefix("s3://") {
        p
    } else if let Some(p) = path.strip_prefix("s3/") {
        p
    } else {
        anyhow::bail!("Invalid S3 path format. Expected: s3://bucket/key");
    };

    let (bucket, key) = match stripped.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (stripped, ""),
    };

    if bucket.is_empty() {
        anyhow::bail!("Bucket name cannot be empty");
    }

    let key = if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    };

    Ok((bucket.to_string(), key))
}

/// Format bytes in compact form (0B, 1.0KiB, 10MiB, ...)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    let mut buf = String::with_capacity(8);
    if exponent == 0 {
        let _ = write!(buf, "{}B", bytes);
    } else if value >= 10.0 {
        let _ = write!(buf, "{:.0}{}", value, UNITS[exponent]);
    } else {
        let _ = write!(buf, "{:.1}{}", value, UNITS[exponent]);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_path() {
        assert_eq!(
            parse_s3_path("s3://bucket/path/to/key").unwrap(),
            ("bucket".to_string(), Some("path/to/key".to_string()))
        );
        assert_eq!(
            parse_s3_path("s3/bucket").unwrap(),
            ("bucket".to_string(), None)
        );
        assert_eq!(
            parse_s3_path("s3://bucket/").unwrap(),
            ("bucket".to_string(), None)
        );
        assert!(parse_s3_path("s3://").is_err());
        assert!(parse_s3_path("/local/file").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1536), "1.5KiB");
        assert_eq!(format_bytes(20 * 1024 * 1024), "20MiB");
    }
}
