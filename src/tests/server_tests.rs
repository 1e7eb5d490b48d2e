//! End-to-end tests driving a running server over HTTP.

use std::path::Path;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use tempfile::TempDir;
use tokio::fs;
use tokio::time::{Duration, sleep};

use crate::logging::setup_test_logging;
use crate::server::Server;

async fn start_test_server(disable_auth: bool) -> (TempDir, tokio::task::JoinHandle<()>, u16) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let (server, port) = Server::test_mode(temp_dir.path().to_path_buf(), disable_auth)
        .await
        .expect("Failed to create test server");

    let handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server time to start
    sleep(Duration::from_millis(100)).await;

    (temp_dir, handle, port)
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build HTTP client")
}

fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .expect("Response should carry a Location header")
        .to_str()
        .expect("Location header should be valid UTF-8")
}

/// Path of an object inside the test server's container directory.
fn object_path(temp_dir: &Path, name: &str) -> std::path::PathBuf {
    temp_dir.join("files").join(name)
}

#[tokio::test]
async fn test_gated_routes_redirect_to_login() {
    setup_test_logging();
    let (temp_dir, handle, port) = start_test_server(false).await;

    // Seed an object so a bypassed gate would have something to destroy
    fs::create_dir_all(temp_dir.path().join("files"))
        .await
        .expect("Failed to create container dir");
    fs::write(object_path(temp_dir.path(), "keep.txt"), b"survives")
        .await
        .expect("Failed to seed object");

    let client = http_client();

    let response = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let response = client
        .get(url(port, "/download?filename=keep.txt"))
        .send()
        .await
        .expect("Download request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let response = client
        .post(url(port, "/upload"))
        .send()
        .await
        .expect("Upload request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let response = client
        .post(url(port, "/delete"))
        .form(&[("filenames", "keep.txt")])
        .send()
        .await
        .expect("Delete request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    // No storage call happened behind the gate
    assert!(object_path(temp_dir.path(), "keep.txt").exists());

    handle.abort();
}

#[tokio::test]
async fn test_disabled_gate_serves_guest() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let response = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("Guest"), "Expected guest placeholder name");
    assert!(body.contains("No files in the container yet."));

    handle.abort();
}

#[tokio::test]
async fn test_upload_download_roundtrip_with_overwrite() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"first contents".to_vec()).file_name("a.txt"),
    );
    let response = client
        .post(url(port, "/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Upload request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = client
        .get(url(port, "/download?filename=a.txt"))
        .send()
        .await
        .expect("Download request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .expect("Download should be an attachment")
        .to_str()
        .expect("Header should be valid UTF-8")
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("a.txt"));
    assert_eq!(
        response.text().await.expect("Failed to read body"),
        "first contents"
    );

    // Uploading the same name replaces the old content outright
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"replaced".to_vec()).file_name("a.txt"),
    );
    client
        .post(url(port, "/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Second upload failed");

    let response = client
        .get(url(port, "/download?filename=a.txt"))
        .send()
        .await
        .expect("Download request failed");
    assert_eq!(
        response.text().await.expect("Failed to read body"),
        "replaced"
    );

    // And the listing shows exactly one entry for it
    let body = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed")
        .text()
        .await
        .expect("Failed to read body");
    assert_eq!(body.matches("value=\"a.txt\"").count(), 1);

    handle.abort();
}

#[tokio::test]
async fn test_download_without_filename_redirects_to_index() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let response = client
        .get(url(port, "/download"))
        .send()
        .await
        .expect("Download request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = client
        .get(url(port, "/download?filename="))
        .send()
        .await
        .expect("Download request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    handle.abort();
}

#[tokio::test]
async fn test_upload_without_file_redirects_to_index() {
    setup_test_logging();
    let (temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    // Multipart body with the upload field left blank
    let form =
        reqwest::multipart::Form::new().part("file", reqwest::multipart::Part::bytes(Vec::new()));
    let response = client
        .post(url(port, "/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Upload request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let entries = std::fs::read_dir(temp_dir.path().join("files"))
        .expect("Container dir should exist")
        .count();
    assert_eq!(entries, 0, "Nothing should have been stored");

    handle.abort();
}

#[tokio::test]
async fn test_delete_tolerates_partial_failure() {
    setup_test_logging();
    let (temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"doomed".to_vec()).file_name("a.txt"),
    );
    client
        .post(url(port, "/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Upload request failed");

    let response = client
        .post(url(port, "/delete"))
        .form(&[("filenames", "a.txt"), ("filenames", "missing.txt")])
        .send()
        .await
        .expect("Delete request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    assert!(!object_path(temp_dir.path(), "a.txt").exists());

    let body = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed")
        .text()
        .await
        .expect("Failed to read body");
    assert!(body.contains("Could not delete missing.txt."));
    assert!(body.contains("Deleted 1 of 2 selected file(s)."));

    handle.abort();
}

#[tokio::test]
async fn test_delete_with_nothing_selected_shows_notice() {
    setup_test_logging();
    let (temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"untouched".to_vec()).file_name("keep.txt"),
    );
    client
        .post(url(port, "/upload"))
        .multipart(form)
        .send()
        .await
        .expect("Upload request failed");

    let response = client
        .post(url(port, "/delete"))
        .form(&Vec::<(&str, &str)>::new())
        .send()
        .await
        .expect("Delete request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    assert!(object_path(temp_dir.path(), "keep.txt").exists());

    let body = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed")
        .text()
        .await
        .expect("Failed to read body");
    assert!(body.contains("No files were selected for deletion."));

    handle.abort();
}

#[tokio::test]
async fn test_callback_without_code_leaves_session_empty() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(false).await;
    let client = http_client();

    let response = client
        .get(url(port, "/callback"))
        .send()
        .await
        .expect("Callback request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    // Still unauthenticated
    let response = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    handle.abort();
}

#[tokio::test]
async fn test_callback_with_mismatched_state_leaves_session_empty() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(false).await;
    let client = http_client();

    let response = client
        .get(url(port, "/callback?code=abc&state=forged"))
        .send()
        .await
        .expect("Callback request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = client
        .get(url(port, "/"))
        .send()
        .await
        .expect("Index request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    handle.abort();
}

#[tokio::test]
async fn test_logout_redirects_and_is_idempotent() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(false).await;
    let client = http_client();

    // The test issuer serves no end-session endpoint, so logout falls back
    // to the index redirect after clearing the session
    let response = client
        .get(url(port, "/logout"))
        .send()
        .await
        .expect("Logout request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = client
        .get(url(port, "/logout"))
        .send()
        .await
        .expect("Second logout request failed");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    handle.abort();
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let response = client
        .get(url(port, "/nope"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn test_static_stylesheet_is_served() {
    setup_test_logging();
    let (_temp_dir, handle, port) = start_test_server(true).await;
    let client = http_client();

    let response = client
        .get(url(port, "/static/style.css"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .expect("Stylesheet should carry a content type"),
        "text/css"
    );

    let response = client
        .get(url(port, "/static/../Cargo.toml"))
        .send()
        .await
        .expect("Request failed");
    assert_ne!(response.status(), StatusCode::OK);

    handle.abort();
}
