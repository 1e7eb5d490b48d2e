//! Multipart form parsing tests.

use crate::error::AppError;
use crate::multipart::extract_file;

const BOUNDARY: &str = "----testboundary1234";

fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

fn form_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[test]
fn test_extracts_submitted_file() {
    let body = form_body(&[("file", Some("a.txt"), b"hello world")]);

    let file = extract_file(Some(&content_type()), &body, "file")
        .expect("Body should parse")
        .expect("File should be present");
    assert_eq!(file.filename, "a.txt");
    assert_eq!(file.content, b"hello world");
}

#[test]
fn test_preserves_binary_content_with_crlf_bytes() {
    let content = b"line one\r\nline two\r\n\r\n--not-a-boundary";
    let body = form_body(&[("file", Some("data.bin"), content)]);

    let file = extract_file(Some(&content_type()), &body, "file")
        .expect("Body should parse")
        .expect("File should be present");
    assert_eq!(file.content, content);
}

#[test]
fn test_picks_named_field_among_others() {
    let body = form_body(&[
        ("comment", None, b"some text"),
        ("file", Some("a.txt"), b"payload"),
        ("other", Some("b.txt"), b"decoy"),
    ]);

    let file = extract_file(Some(&content_type()), &body, "file")
        .expect("Body should parse")
        .expect("File should be present");
    assert_eq!(file.filename, "a.txt");
    assert_eq!(file.content, b"payload");
}

#[test]
fn test_empty_filename_means_no_file() {
    // Browsers submit an empty part when the file input is left blank
    let body = form_body(&[("file", Some(""), b"")]);

    let file = extract_file(Some(&content_type()), &body, "file").expect("Body should parse");
    assert!(file.is_none());
}

#[test]
fn test_missing_field_means_no_file() {
    let body = form_body(&[("comment", None, b"just text")]);

    let file = extract_file(Some(&content_type()), &body, "file").expect("Body should parse");
    assert!(file.is_none());
}

#[test]
fn test_client_path_is_stripped_to_basename() {
    let body = form_body(&[("file", Some("C:\\Users\\alice\\report.pdf"), b"pdf")]);

    let file = extract_file(Some(&content_type()), &body, "file")
        .expect("Body should parse")
        .expect("File should be present");
    assert_eq!(file.filename, "report.pdf");
}

#[test]
fn test_quoted_boundary_parameter() {
    let body = form_body(&[("file", Some("a.txt"), b"quoted")]);
    let header = format!("multipart/form-data; boundary=\"{BOUNDARY}\"");

    let file = extract_file(Some(&header), &body, "file")
        .expect("Body should parse")
        .expect("File should be present");
    assert_eq!(file.content, b"quoted");
}

#[test]
fn test_missing_content_type_is_an_error() {
    let body = form_body(&[("file", Some("a.txt"), b"x")]);

    let err = extract_file(None, &body, "file").expect_err("Missing header should fail");
    assert!(matches!(err, AppError::Multipart(_)));
}

#[test]
fn test_non_multipart_content_type_is_an_error() {
    let err = extract_file(
        Some("application/x-www-form-urlencoded"),
        b"filenames=a.txt",
        "file",
    )
    .expect_err("Wrong content type should fail");
    assert!(matches!(err, AppError::Multipart(_)));
}

#[test]
fn test_content_type_without_boundary_is_an_error() {
    let body = form_body(&[("file", Some("a.txt"), b"x")]);

    let err = extract_file(Some("multipart/form-data"), &body, "file")
        .expect_err("Missing boundary should fail");
    assert!(matches!(err, AppError::Multipart(_)));
}

#[test]
fn test_body_without_boundary_is_an_error() {
    let err = extract_file(Some(&content_type()), b"not a multipart body", "file")
        .expect_err("Boundary-free body should fail");
    assert!(matches!(err, AppError::Multipart(_)));
}

#[test]
fn test_preamble_before_first_boundary_is_tolerated() {
    let mut body = b"ignore this preamble\r\n".to_vec();
    body.extend_from_slice(&form_body(&[("file", Some("a.txt"), b"after preamble")]));

    let file = extract_file(Some(&content_type()), &body, "file")
        .expect("Body should parse")
        .expect("File should be present");
    assert_eq!(file.content, b"after preamble");
}
