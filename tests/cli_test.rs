//! CLI commands driven against a scripted transport

mod common;

use tempfile::TempDir;

use common::{client_for, session_profile, ScriptedTransport};
use omnix_storage::cli::commands;

fn listing(keys: &[&str], next: Option<&str>) -> String {
    let contents: Vec<String> = keys
        .iter()
        .map(|k| format!(r#"{{"key":"{}","size":1}}"#, k))
        .collect();
    match next {
        Some(token) => format!(
            r#"{{"contents":[{}],"isTruncated":true,"continuationToken":"{}"}}"#,
            contents.join(","),
            token
        ),
        None => format!(r#"{{"contents":[{}],"isTruncated":false}}"#, contents.join(",")),
    }
}

fn deleted(keys: &[&str]) -> String {
    let entries: String = keys
        .iter()
        .map(|k| format!("<Deleted><Key>{}</Key></Deleted>", k))
        .collect();
    format!("<DeleteResult>{}</DeleteResult>", entries)
}

// =============================================================================
// ls
// =============================================================================

#[tokio::test]
async fn test_ls_follows_continuation_token() {
    let transport = ScriptedTransport::new();
    transport
        .login_ok("t1")
        .respond(200, &listing(&["docs/a.txt"], Some("p2")))
        .respond(200, &listing(&["docs/b.txt"], None));
    let client = client_for(&session_profile(), transport.clone());

    commands::cmd_ls(&client, "s3://docs/", true, 0).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(!requests[1].url.contains("continuation-token"));
    assert!(requests[2].url.contains("continuation-token=p2"));
    assert!(!requests[2].url.contains("delimiter"));
}

#[tokio::test]
async fn test_ls_stops_at_max_keys() {
    let transport = ScriptedTransport::new();
    transport
        .login_ok("t1")
        .respond(200, &listing(&["a.txt", "b.txt"], Some("p2")))
        .respond(200, &listing(&["c.txt"], None));
    let client = client_for(&session_profile(), transport.clone());

    commands::cmd_ls(&client, "s3://docs", false, 2).await.unwrap();

    assert_eq!(transport.request_count(), 2);
    assert_eq!(transport.remaining(), 1);
    assert!(transport.requests()[1].url.contains("delimiter=%2F"));
}

// =============================================================================
// rm
// =============================================================================

#[tokio::test]
async fn test_rm_recursive_relists_until_empty() {
    let transport = ScriptedTransport::new();
    transport
        .login_ok("t1")
        .respond(200, &listing(&["logs/1", "logs/2"], Some("p2")))
        .respond(200, &deleted(&["logs/1", "logs/2"]))
        .respond(200, &listing(&["logs/3"], None))
        .respond(200, &deleted(&["logs/3"]));
    let client = client_for(&session_profile(), transport.clone());

    commands::cmd_rm(&client, "s3://archive/logs/", true).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    for list in [&requests[1], &requests[3]] {
        assert_eq!(list.method, hyper::Method::GET);
        assert!(list.url.contains("prefix=logs%2F"));
        assert!(!list.url.contains("continuation-token"));
    }
    for delete in [&requests[2], &requests[4]] {
        assert_eq!(delete.method, hyper::Method::POST);
        assert!(delete.url.ends_with("/archive?delete="));
    }
    let second_batch = String::from_utf8(requests[4].body.to_vec()).unwrap();
    assert!(second_batch.contains("<Key>logs/3</Key>"));
    assert!(!second_batch.contains("<Key>logs/1</Key>"));
}

#[tokio::test]
async fn test_rm_recursive_stops_when_nothing_deletes() {
    let transport = ScriptedTransport::new();
    transport
        .login_ok("t1")
        .respond(200, &listing(&["logs/locked"], Some("p2")))
        .respond(
            200,
            "<DeleteResult><Error><Key>logs/locked</Key><Code>AccessDenied</Code>\
             <Message>denied</Message></Error></DeleteResult>",
        );
    let client = client_for(&session_profile(), transport.clone());

    let err = commands::cmd_rm(&client, "s3://archive/logs/", true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("1 objects could not be deleted"));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_rm_recursive_on_empty_prefix() {
    let transport = ScriptedTransport::new();
    transport.login_ok("t1").respond(200, &listing(&[], None));
    let client = client_for(&session_profile(), transport.clone());

    commands::cmd_rm(&client, "s3://archive/none/", true).await.unwrap();
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_rm_single_needs_key() {
    let transport = ScriptedTransport::new();
    let client = client_for(&session_profile(), transport.clone());

    let err = commands::cmd_rm(&client, "s3://archive", false).await.unwrap_err();
    assert!(err.to_string().contains("Object key is required"));
    assert_eq!(transport.request_count(), 0);
}

// =============================================================================
// presign, put, get
// =============================================================================

#[tokio::test]
async fn test_presign_rejects_unknown_method() {
    let transport = ScriptedTransport::new();
    let client = client_for(&session_profile(), transport.clone());

    let err = commands::cmd_presign(&client, "delete", "s3://photos/a.png", 60, false).unwrap_err();
    assert!(err.to_string().contains("Unsupported presign method 'delete'"));
    assert_eq!(transport.request_count(), 0);

    commands::cmd_presign(&client, "GET", "s3://photos/a.png", 60, false).unwrap();
    assert!(commands::cmd_presign(&client, "put", "s3://photos", 60, false).is_err());
}

#[tokio::test]
async fn test_put_then_get_through_files() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("note.txt");
    let destination = dir.path().join("copy.txt");
    std::fs::write(&source, b"hello storage").unwrap();

    let transport = ScriptedTransport::new();
    transport
        .login_ok("t1")
        .respond_with_headers(200, "", &[("etag", "\"e1\"")])
        .respond(200, "hello storage");
    let client = client_for(&session_profile(), transport.clone());

    commands::cmd_put(&client, &source, "s3://docs/note.txt", Some("text/plain"))
        .await
        .unwrap();
    commands::cmd_get(&client, "s3://docs/note.txt", &destination)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[1].method, hyper::Method::PUT);
    assert_eq!(requests[1].header("content-type"), Some("text/plain"));
    assert_eq!(&requests[1].body[..], b"hello storage");
    assert_eq!(std::fs::read(&destination).unwrap(), b"hello storage");
}

#[tokio::test]
async fn test_put_missing_source_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new();
    let client = client_for(&session_profile(), transport.clone());

    let err = commands::cmd_put(&client, &dir.path().join("absent"), "s3://docs/x", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
    assert_eq!(transport.request_count(), 0);
}
