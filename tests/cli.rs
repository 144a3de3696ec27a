use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREFIX: &str = "/custom/documents/api";

fn rdocs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rdocs"))
}

fn setup_config(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[server]
base_url = "{}"
timeout_secs = 5

[ui]
theme = "dark"

[upload]
refetch_delay_ms = 0
"#,
        base_url
    );
    let config_path = config_dir.join("rdocs.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_rdocs(config_path: &Path, args: &[&str], stdin: &str) -> (String, String, bool) {
    let binary = rdocs_binary();
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let stdin = stdin.to_string();

    tokio::task::spawn_blocking(move || {
        let mut child = Command::new(&binary)
            .arg("--config")
            .arg(&config_path)
            .args(&args)
            .env_remove("RDOCS_TOKEN")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap_or_else(|e| panic!("Failed to run rdocs binary at {:?}: {}", binary, e));

        if let Some(mut input) = child.stdin.take() {
            input.write_all(stdin.as_bytes()).unwrap();
        }
        let output = child.wait_with_output().unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    })
    .await
    .unwrap()
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/documents", PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "documents": [
                { "source": "a.pdf", "when": 100.0, "page_content_length": 1500, "chunk_index": 0, "preview": "alpha" },
                { "source": "a.pdf", "when": 100.0, "page_content_length": 300, "chunk_index": 1 },
                { "source": "b.txt", "when": 200.0, "page_content_length": 40 }
            ]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_prints_aggregated_table() {
    let server = backend().await;
    let (_tmp, config) = setup_config(&server.uri());

    let (stdout, stderr, success) = run_rdocs(&config, &["list"], "").await;
    assert!(success, "list failed: {}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("SOURCE"));
    assert!(lines[1].starts_with("b.txt"));
    assert!(lines[2].starts_with("a.pdf"));
    assert!(lines[2].contains("1.8 KB"));
    assert!(stdout.contains("2 documents"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_filter_without_match() {
    let server = backend().await;
    let (_tmp, config) = setup_config(&server.uri());

    let (stdout, _stderr, success) = run_rdocs(&config, &["list", "--filter", "zzz"], "").await;
    assert!(success);
    assert_eq!(stdout, "No documents match \"zzz\".\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_info_shows_chunks() {
    let server = backend().await;
    let (_tmp, config) = setup_config(&server.uri());

    let (stdout, stderr, success) = run_rdocs(&config, &["info", "a.pdf"], "").await;
    assert!(success, "info failed: {}", stderr);
    assert!(stdout.starts_with("a.pdf\n"));
    assert!(stdout.contains("Chunks:       2"));
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("(no preview)"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_info_unknown_source_fails() {
    let server = backend().await;
    let (_tmp, config) = setup_config(&server.uri());

    let (_stdout, stderr, success) = run_rdocs(&config, &["info", "missing.doc"], "").await;
    assert!(!success);
    assert!(stderr.contains("No document with source 'missing.doc'"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_with_yes() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/remove", PREFIX)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "message": "" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (_tmp, config) = setup_config(&server.uri());

    let (_stdout, stderr, success) = run_rdocs(&config, &["remove", "a.pdf", "--yes"], "").await;
    assert!(success, "remove failed: {}", stderr);
    assert!(stderr.contains("Removed \"a.pdf\""));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_declined_at_prompt() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/remove", PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;
    let (_tmp, config) = setup_config(&server.uri());

    let (_stdout, stderr, success) = run_rdocs(&config, &["remove", "b.txt"], "n\n").await;
    assert!(success);
    assert!(stderr.contains("Remove \"b.txt\" and all of its chunks? [y/N]"));
    assert!(stderr.contains("Cancelled."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_rejected_by_backend_fails() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/remove", PREFIX)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "message": "read-only" })),
        )
        .mount(&server)
        .await;
    let (_tmp, config) = setup_config(&server.uri());

    let (_stdout, stderr, success) = run_rdocs(&config, &["remove", "a.pdf"], "y\n").await;
    assert!(!success);
    assert!(stderr.contains("Could not remove \"a.pdf\": read-only"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_local_stats() {
    let server = backend().await;
    let (_tmp, config) = setup_config(&server.uri());

    let (stdout, stderr, success) = run_rdocs(&config, &["stats"], "").await;
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Documents:   2"));
    assert!(stdout.contains("Chunks:      3"));
    assert!(stdout.contains("2 small / 1 medium / 0 large"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_access_denied_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/documents", PREFIX)))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let (_tmp, config) = setup_config(&server.uri());

    let (_stdout, stderr, success) = run_rdocs(&config, &["list"], "").await;
    assert!(!success);
    assert!(stderr.contains("Access denied: administrator permissions are required"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_failure_is_reported_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/documents", PREFIX)))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let (_tmp, config) = setup_config(&server.uri());

    let (stdout, stderr, success) = run_rdocs(&config, &["stats"], "").await;
    assert!(!success);
    assert!(stdout.is_empty());
    assert_eq!(
        stderr,
        "✗ Access denied: administrator permissions are required\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/stats", PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "total_documents": 2,
            "total_chunks": 3,
            "total_characters": 1840,
            "sources": {
                "a.pdf": { "chunks": 2, "characters": 1800, "upload_date": 100.0 },
                "b.txt": { "chunks": 1, "characters": 40, "upload_date": 200.0 }
            },
            "upload_dates": [100.0, 100.0, 200.0],
            "chunk_size_distribution": { "small": 2, "medium": 1, "large": 0 },
            "estimated_memory_mb": 0.0,
            "last_update": "01/01/1970 00:03",
            "first_update": "01/01/1970 00:01"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (_tmp, config) = setup_config(&server.uri());

    let (stdout, stderr, success) = run_rdocs(&config, &["stats", "--server"], "").await;
    assert!(success, "stats --server failed: {}", stderr);
    assert!(stdout.contains("Documents:   2"));
    assert!(stdout.contains("2 small / 1 medium / 0 large"));
    assert!(stdout.contains("First:       01/01/1970 00:01"));
    assert!(stdout.contains("Last:        01/01/1970 00:03"));
    assert!(stdout.contains("a.pdf  2 chunks, 1800 chars"));
    assert!(stdout.contains("b.txt  1 chunk, 40 chars"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("rdocs.toml");
    fs::write(&config, "[upload]\nchunk_size = 10\nchunk_overlap = 20\n").unwrap();

    let (_stdout, stderr, success) = run_rdocs(&config, &["list"], "").await;
    assert!(!success);
    assert!(stderr.contains("chunk_overlap must be smaller than upload.chunk_size"));
}
