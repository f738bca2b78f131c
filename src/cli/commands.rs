use anyhow::{Context, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::cli::{format_bytes, parse_s3_path};
use crate::s3::{ListObjectsOptions, MultipartConfig, StorageClient};
use crate::transport::Transport;

/// Uploads at or above this size go through multipart
const MULTIPART_THRESHOLD: usize = 64 * 1024 * 1024;

fn require_key(path: &str, command: &str) -> Result<(String, String)> {
    let (bucket, key) = parse_s3_path(path)?;
    let key = key.ok_or_else(|| anyhow::anyhow!("Object key is required for {} command", command))?;
    Ok((bucket, key))
}

/// List objects; non-recursive listings group by `/`
pub async fn cmd_ls<T: Transport>(
    client: &StorageClient<T>,
    path: &str,
    recursive: bool,
    max_keys: usize,
) -> Result<()> {
    let (bucket, prefix) = parse_s3_path(path)?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let limit = if max_keys == 0 { usize::MAX } else { max_keys };

    let mut options = ListObjectsOptions {
        prefix,
        delimiter: (!recursive).then(|| "/".to_string()),
        ..ListObjectsOptions::default()
    };

    let mut shown = 0usize;
    loop {
        let page = client
            .list_objects(&bucket, &options)
            .await
            .with_context(|| format!("Failed to list s3://{}", bucket))?;

        for dir in &page.common_prefixes {
            if shown >= limit {
                break;
            }
            writeln!(out, "{:>26} {:>8} {}", "", "DIR", dir)?;
            shown += 1;
        }

        for obj in &page.objects {
            if shown >= limit {
                break;
            }
            let modified = obj
                .last_modified
                .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default();
            writeln!(out, "{:>26} {:>8} {}", modified, format_bytes(obj.size), obj.object)?;
            shown += 1;
        }

        match page.continuation_token {
            Some(token) if page.is_truncated && shown < limit => {
                options.continuation_token = Some(token);
            }
            _ => break,
        }
    }

    out.flush()?;
    drop(out);
    if shown == 0 {
        println!("No objects found");
    }
    Ok(())
}

pub async fn cmd_stat<T: Transport>(client: &StorageClient<T>, path: &str) -> Result<()> {
    let (bucket, key) = require_key(path, "stat")?;
    let meta = client.stat_object(&bucket, &key).await?;

    println!("Object: s3://{}/{}", meta.bucket, meta.object);
    println!("Size: {} ({})", format_bytes(meta.size), meta.size);
    match meta.last_modified {
        Some(modified) => println!("Last Modified: {}", modified.to_rfc3339()),
        None => println!("Last Modified: Unknown"),
    }
    if let Some(etag) = &meta.etag {
        println!("ETag: {}", etag);
    }
    if let Some(content_type) = &meta.content_type {
        println!("Content-Type: {}", content_type);
    }
    for (key, value) in &meta.metadata {
        println!("Metadata: {}={}", key, value);
    }
    Ok(())
}

/// Download an object to a local file
pub async fn cmd_get<T: Transport>(
    client: &StorageClient<T>,
    path: &str,
    destination: &Path,
) -> Result<()> {
    let (bucket, key) = require_key(path, "get")?;
    let object = client.get_object(&bucket, &key).await?;

    tokio::fs::write(destination, &object.data)
        .await
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    println!("s3://{}/{} -> {}", bucket, key, destination.display());
    println!("  {} downloaded", format_bytes(object.data.len() as u64));
    Ok(())
}

/// Upload a local file, switching to multipart for large files
pub async fn cmd_put<T: Transport>(
    client: &StorageClient<T>,
    source: &Path,
    path: &str,
    content_type: Option<&str>,
) -> Result<()> {
    let (bucket, key) = require_key(path, "put")?;
    let data = tokio::fs::read(source)
        .await
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let size = data.len();
    let data = Bytes::from(data);

    if size >= MULTIPART_THRESHOLD {
        let config = MultipartConfig::default();
        println!("{} -> s3://{}/{} (multipart)", source.display(), bucket, key);
        println!(
            "  {} parts of {} each, {} concurrent uploads",
            config.part_count(size),
            format_bytes(config.part_size as u64),
            config.concurrency
        );
        client.upload_multipart(&bucket, &key, data, &config).await?;
    } else {
        println!("{} -> s3://{}/{}", source.display(), bucket, key);
        client
            .put_object(&bucket, &key, data, content_type, &BTreeMap::new())
            .await?;
    }

    println!("  {} uploaded", format_bytes(size as u64));
    Ok(())
}

/// Remove one object, or every object under a prefix with `recursive`
pub async fn cmd_rm<T: Transport>(
    client: &StorageClient<T>,
    path: &str,
    recursive: bool,
) -> Result<()> {
    let (bucket, key) = parse_s3_path(path)?;

    if !recursive {
        let key = key.ok_or_else(|| anyhow::anyhow!("Object key is required for rm command"))?;
        client.remove_object(&bucket, &key).await?;
        println!("Deleted: s3://{}/{}", bucket, key);
        return Ok(());
    }

    let options = ListObjectsOptions {
        prefix: key,
        ..ListObjectsOptions::default()
    };

    // Always re-list the first page: deleted keys shift any continuation token
    let mut total_deleted = 0usize;
    let mut total_failed = 0usize;
    loop {
        let page = client.list_objects(&bucket, &options).await?;
        if page.objects.is_empty() {
            break;
        }
        let keys: Vec<String> = page.objects.into_iter().map(|o| o.object).collect();

        let result = client.remove_objects(&bucket, &keys).await?;
        for deleted in &result.deleted {
            println!("Deleted: {}", deleted.key);
        }
        for error in &result.errors {
            println!("Error deleting {}: {} - {}", error.key, error.code, error.message);
        }
        total_deleted += result.deleted.len();
        total_failed += result.errors.len();

        if result.deleted.is_empty() || !page.is_truncated {
            break;
        }
    }

    println!("Total deleted: {} objects", total_deleted);
    if total_failed > 0 {
        anyhow::bail!("{} objects could not be deleted", total_failed);
    }
    Ok(())
}

pub async fn cmd_mb<T: Transport>(client: &StorageClient<T>, path: &str) -> Result<()> {
    let (bucket, _) = parse_s3_path(path)?;
    client.make_bucket(&bucket).await?;
    println!("Bucket created successfully `{}`.", bucket);
    Ok(())
}

pub async fn cmd_rb<T: Transport>(client: &StorageClient<T>, path: &str) -> Result<()> {
    let (bucket, _) = parse_s3_path(path)?;
    client.remove_bucket(&bucket).await?;
    println!("Removed `{}` successfully.", bucket);
    Ok(())
}

/// Print a presigned GET or PUT URL
pub fn cmd_presign<T: Transport>(
    client: &StorageClient<T>,
    method: &str,
    path: &str,
    expires: u64,
    browser: bool,
) -> Result<()> {
    let (bucket, key) = require_key(path, "presign")?;
    let result = match method.to_ascii_lowercase().as_str() {
        "get" => client.presigned_get_object(&bucket, &key, expires, browser)?,
        "put" => client.presigned_put_object(&bucket, &key, expires, browser)?,
        other => anyhow::bail!("Unsupported presign method '{}'. Expected get or put", other),
    };

    println!("{}", result.url);
    eprintln!("Expires: {}", result.expires_at.to_rfc3339());
    Ok(())
}

pub async fn cmd_health<T: Transport>(client: &StorageClient<T>) -> Result<()> {
    if client.health().await {
        println!("OK: {}", client.endpoints().internal);
        Ok(())
    } else {
        anyhow::bail!("Server at {} is not healthy", client.endpoints().internal)
    }
}
