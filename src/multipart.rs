//! Parsing of `multipart/form-data` request bodies from the upload form.
//!
//! Only what the browser upload form needs: boundary extraction from the
//! Content-Type header, part splitting, and Content-Disposition name /
//! filename parameters. Bodies are already buffered by the handler.

use crate::error::AppError;

/// A file submitted through the upload form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// One decoded part of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormPart {
    pub(crate) name: String,
    pub(crate) filename: Option<String>,
    pub(crate) content: Vec<u8>,
}

/// Find the file submitted under `field`, if any.
///
/// A part with an empty filename counts as "no file": browsers submit one
/// for an upload form left blank.
pub fn extract_file(
    content_type: Option<&str>,
    body: &[u8],
    field: &str,
) -> Result<Option<UploadedFile>, AppError> {
    let content_type = content_type
        .ok_or_else(|| AppError::Multipart("request has no content-type header".to_string()))?;
    let boundary = boundary_from(content_type)?;
    let parts = parse_parts(&boundary, body)?;

    Ok(parts
        .into_iter()
        .find(|part| part.name == field)
        .and_then(|part| match part.filename {
            Some(filename) if !filename.is_empty() => {
                // Some browsers send a full client-side path
                let filename = filename
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(filename.as_str())
                    .to_string();
                Some(UploadedFile {
                    filename,
                    content: part.content,
                })
            }
            _ => None,
        })
        .filter(|file| !file.filename.is_empty()))
}

fn boundary_from(content_type: &str) -> Result<String, AppError> {
    if !content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(AppError::Multipart(format!(
            "unexpected content type '{content_type}'"
        )));
    }

    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|boundary| boundary.trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| AppError::Multipart("content type has no boundary parameter".to_string()))
}

fn parse_parts(boundary: &str, body: &[u8]) -> Result<Vec<FormPart>, AppError> {
    let delimiter = format!("--{boundary}");
    let terminator = format!("\r\n{delimiter}");

    let mut parts = Vec::new();
    let mut cursor = find(body, delimiter.as_bytes())
        .ok_or_else(|| AppError::Multipart("body contains no boundary".to_string()))?
        + delimiter.len();

    loop {
        if body[cursor..].starts_with(b"--") {
            // Closing delimiter
            break;
        }
        if !body[cursor..].starts_with(b"\r\n") {
            return Err(AppError::Multipart(
                "malformed boundary delimiter".to_string(),
            ));
        }
        cursor += 2;

        let end = find(&body[cursor..], terminator.as_bytes())
            .ok_or_else(|| AppError::Multipart("unterminated part".to_string()))?;
        parts.push(parse_part(&body[cursor..cursor + end])?);
        cursor += end + terminator.len();
    }

    Ok(parts)
}

fn parse_part(raw: &[u8]) -> Result<FormPart, AppError> {
    let header_end = find(raw, b"\r\n\r\n")
        .ok_or_else(|| AppError::Multipart("part has no header terminator".to_string()))?;
    let headers = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| AppError::Multipart("part headers are not valid UTF-8".to_string()))?;
    let content = raw[header_end + 4..].to_vec();

    let mut name = String::new();
    let mut filename = None;

    for line in headers.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if !header.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for param in value.split(';').map(str::trim) {
            if let Some(v) = param.strip_prefix("name=") {
                name = v.trim_matches('"').to_string();
            } else if let Some(v) = param.strip_prefix("filename=") {
                filename = Some(v.trim_matches('"').to_string());
            }
        }
    }

    Ok(FormPart {
        name,
        filename,
        content,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
