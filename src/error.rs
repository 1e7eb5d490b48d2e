//! Centralized error types for the blobshelf server.

use std::net::AddrParseError;

use askama::Template;
use http::{HeaderValue, Response, StatusCode, header::CONTENT_TYPE};
use http_body_util::Full;
use hyper::body::Bytes;

use crate::web::templates::ErrorTemplate;

#[derive(Debug)]
pub enum AppError {
    AuthFlow(String),
    Configuration(String),
    HttpResponse(String),
    Hyper(String),
    InvalidObjectName(String),
    Io(std::io::Error),
    Multipart(String),
    ObjectNotFound(String),
    OidcDiscovery(String),
    Reqwest(String),
    SerdeJson(serde_json::Error),
    Session(String),
    Storage(String),
    TemplateRendering(String),
    TokenExchange(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::AuthFlow(msg) => write!(f, "Login Flow Error: {}", msg),
            AppError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            AppError::HttpResponse(msg) => write!(f, "HTTP Response Error: {}", msg),
            AppError::Hyper(msg) => write!(f, "Hyper HTTP Error: {}", msg),
            AppError::InvalidObjectName(name) => {
                write!(f, "Invalid object name: '{}'", name)
            }
            AppError::Io(e) => write!(f, "IO Error: {}", e),
            AppError::Multipart(msg) => write!(f, "Multipart Parse Error: {}", msg),
            AppError::ObjectNotFound(name) => write!(f, "Object '{}' not found", name),
            AppError::OidcDiscovery(msg) => write!(f, "OIDC Discovery Error: {}", msg),
            AppError::Reqwest(msg) => write!(f, "Reqwest HTTP Error: {}", msg),
            AppError::SerdeJson(e) => write!(f, "Serde-JSON Error: {}", e),
            AppError::Session(msg) => write!(f, "Session Error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage Error: {}", msg),
            AppError::TemplateRendering(msg) => {
                write!(f, "Template Rendering Error: {}", msg)
            }
            AppError::TokenExchange(msg) => write!(f, "Token Exchange Error: {}", msg),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::TemplateRendering(err.to_string())
    }
}

impl From<http::Error> for AppError {
    fn from(err: http::Error) -> Self {
        AppError::HttpResponse(err.to_string())
    }
}

impl From<hyper::Error> for AppError {
    fn from(err: hyper::Error) -> Self {
        AppError::Hyper(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Reqwest(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerdeJson(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<AddrParseError> for AppError {
    fn from(err: AddrParseError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<AppError> for Box<dyn std::error::Error + Send + Sync> {
    fn from(val: AppError) -> Self {
        Box::new(std::io::Error::other(val.to_string()))
    }
}

impl From<AppError> for Response<Full<Bytes>> {
    fn from(err: AppError) -> Response<Full<Bytes>> {
        let template = ErrorTemplate {
            error_message: err.to_string(),
        };

        let html = template.render().unwrap_or_else(|render_err| {
            format!(
                "<html><body><h1>Error</h1><p>Failed to render error template: {}</p><p>Original error: {}</p></body></html>",
                render_err, err
            )
        });

        let mut res = Response::new(Full::new(Bytes::from(html)));

        *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        res.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        res
    }
}
