//! Route handlers for the file-management UI.
//!
//! Every storage-touching route runs the auth gate first and short-circuits
//! into a login redirect; the login, callback, and logout routes drive the
//! session lifecycle.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use askama::Template;
use http::{
    HeaderValue, Method,
    header::{
        CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION, REFERRER_POLICY,
        X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
    },
};
use http_body_util::{BodyExt, Full};
use hyper::{
    Request, Response, StatusCode,
    body::{Bytes, Incoming},
};
use mime_guess::MimeGuess;
use tower_sessions::Session;
use tracing::{debug, error, info, instrument, warn};

use crate::auth::{AuthDecision, AuthGate, OidcClient, generate_state_token};
use crate::constants::{GUEST_USER_NAME, UPLOAD_FIELD_NAME};
use crate::error::AppError;
use crate::multipart;
use crate::session;
use crate::storage::{self, ObjectStore};
use crate::web::templates::IndexTemplate;

/// Redirect into the login flow without touching storage.
fn login_redirect() -> Result<Response<Full<Bytes>>, AppError> {
    redirect_to("/login")
}

/// Redirect back to the file listing.
fn index_redirect() -> Result<Response<Full<Bytes>>, AppError> {
    redirect_to("/")
}

fn redirect_to(location: &str) -> Result<Response<Full<Bytes>>, AppError> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, location)
        .body(Full::new(Bytes::new()))
        .map_err(AppError::from)
}

/// Return with a 404 Not Found response
pub(crate) fn respond_404() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from("Not Found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Return with a 500 response
pub(crate) fn respond_500(msg: &impl ToString) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(msg.to_string())));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Handler for all UI routes.
pub struct WebHandler {
    gate: AuthGate,
    oidc: Option<Arc<OidcClient>>,
    store: Arc<dyn ObjectStore>,
    callback_path: String,
    public_url: String,
}

impl WebHandler {
    pub fn new(
        gate: AuthGate,
        oidc: Option<Arc<OidcClient>>,
        store: Arc<dyn ObjectStore>,
        callback_path: String,
        public_url: String,
    ) -> Self {
        Self {
            gate,
            oidc,
            store,
            callback_path,
            public_url,
        }
    }

    /// Main request handler - routes to the appropriate endpoint
    #[instrument(
        level = "info",
        skip_all,
        fields(method = %req.method(), path = %req.uri().path(), status_code = tracing::field::Empty)
    )]
    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
        session: Session,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let result = match (method, path.as_str()) {
            (Method::GET, "/") => self.get_index(session).await,
            (Method::GET, "/login") => self.get_login(session).await,
            (Method::GET, p) if p == self.callback_path => self.get_callback(req, session).await,
            (Method::GET, "/logout") => self.get_logout(session).await,
            (Method::GET, "/download") => self.get_download(req, session).await,
            (Method::POST, "/upload") => self.post_upload(req, session).await,
            (Method::POST, "/delete") => self.post_delete(req, session).await,
            (Method::GET, p) if p.starts_with("/static/") => self.get_static_file(&path).await,
            _ => Ok(respond_404()),
        };

        let span = tracing::Span::current();
        match result {
            Ok(response) => {
                span.record("status_code", response.status().as_u16());
                Ok(response)
            }
            Err(err) => {
                span.record("status_code", StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                error!(error = %err, "Request failed");
                Ok(err.into())
            }
        }
    }

    /// GET / - File listing
    async fn get_index(&self, session: Session) -> Result<Response<Full<Bytes>>, AppError> {
        if let AuthDecision::RedirectToLogin = self.gate.require_session(&session).await? {
            return login_redirect();
        }

        let claims = session::user_claims(&session).await?;
        let user_name = claims
            .as_ref()
            .and_then(|claims| claims.display_name())
            .unwrap_or(GUEST_USER_NAME)
            .to_string();

        let files = self.store.list_objects().await?;
        let notices = session::take_notices(&session).await?;

        self.build_html_response(IndexTemplate {
            user_name,
            files,
            notices,
        })
    }

    /// GET /login - Redirect to the identity provider
    async fn get_login(&self, session: Session) -> Result<Response<Full<Bytes>>, AppError> {
        let oidc = self.oidc.as_ref().ok_or_else(|| {
            AppError::Configuration("no identity provider is configured".to_string())
        })?;

        let state = generate_state_token();
        session::set_oauth_state(&session, &state).await?;

        let auth_url = oidc.authorization_url(&state).await?;
        debug!("Redirecting to identity provider");
        redirect_to(&auth_url)
    }

    /// GET {callback_path} - Complete the login flow
    ///
    /// Always lands back on the index: a failed exchange is logged and the
    /// session is left untouched, it never surfaces an error page.
    async fn get_callback(
        &self,
        req: Request<Incoming>,
        session: Session,
    ) -> Result<Response<Full<Bytes>>, AppError> {
        if let Err(err) = self.complete_login(req, &session).await {
            warn!(error = %err, "Login callback failed, redirecting to index");
        }
        index_redirect()
    }

    async fn complete_login(
        &self,
        req: Request<Incoming>,
        session: &Session,
    ) -> Result<(), AppError> {
        let oidc = self.oidc.as_ref().ok_or_else(|| {
            AppError::Configuration("no identity provider is configured".to_string())
        })?;

        let params: HashMap<String, String> =
            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                .into_owned()
                .collect();

        // The stored state is single-use: consume it before any other check
        let expected_state = session::take_oauth_state(session).await?;

        let code = params
            .get("code")
            .ok_or_else(|| AppError::AuthFlow("no authorization code in callback".to_string()))?;

        match (expected_state, params.get("state")) {
            (Some(expected), Some(received)) if &expected == received => {}
            _ => {
                return Err(AppError::AuthFlow(
                    "state parameter missing or mismatched".to_string(),
                ));
            }
        }

        let claims = oidc.exchange_code(code).await?;
        let user = claims.display_name().unwrap_or("<unknown>").to_string();
        session::set_user_claims(session, &claims).await?;
        info!(user = %user, "User authenticated");
        Ok(())
    }

    /// GET /logout - Clear the session, then send the browser to the provider
    ///
    /// The local session is gone before the redirect is issued, so a broken
    /// provider end-session endpoint still leaves the user signed out here.
    async fn get_logout(&self, session: Session) -> Result<Response<Full<Bytes>>, AppError> {
        session.flush().await?;
        info!("User logged out");

        let location = match &self.oidc {
            Some(oidc) => match oidc.end_session_url(&self.public_url).await {
                Ok(Some(url)) => url,
                Ok(None) => "/".to_string(),
                Err(err) => {
                    warn!(error = %err, "Could not resolve provider end-session endpoint");
                    "/".to_string()
                }
            },
            None => "/".to_string(),
        };
        redirect_to(&location)
    }

    /// GET /download?filename=X - Stream an object back as an attachment
    async fn get_download(
        &self,
        req: Request<Incoming>,
        session: Session,
    ) -> Result<Response<Full<Bytes>>, AppError> {
        if let AuthDecision::RedirectToLogin = self.gate.require_session(&session).await? {
            return login_redirect();
        }

        let filename = req
            .uri()
            .query()
            .and_then(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .find(|(key, _)| key == "filename")
                    .map(|(_, value)| value)
            })
            .filter(|filename| !filename.is_empty());

        let Some(filename) = filename else {
            debug!("Download without a filename, redirecting to index");
            return index_redirect();
        };

        let content = self.store.get_object(&filename).await?;
        let content_type = MimeGuess::from_path(&filename).first_or_octet_stream();
        let disposition = format!(
            "attachment; filename=\"{}\"",
            filename.replace(['"', '\\', '\r', '\n'], "_")
        );

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type.as_ref())
            .header(CONTENT_DISPOSITION, disposition)
            .body(Full::new(Bytes::from(content)))
            .map_err(AppError::from)
    }

    /// POST /upload - Store a submitted file under its own name
    async fn post_upload(
        &self,
        req: Request<Incoming>,
        session: Session,
    ) -> Result<Response<Full<Bytes>>, AppError> {
        if let AuthDecision::RedirectToLogin = self.gate.require_session(&session).await? {
            return login_redirect();
        }

        let (parts, body) = req.into_parts();
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body_bytes = body.collect().await?.to_bytes();

        let file = match multipart::extract_file(content_type.as_deref(), &body_bytes, UPLOAD_FIELD_NAME)
        {
            Ok(file) => file,
            Err(err) => {
                warn!(error = %err, "Discarding unparseable upload body");
                None
            }
        };
        let Some(file) = file else {
            debug!("Upload without a file, redirecting to index");
            return index_redirect();
        };

        // Existing objects of the same name are replaced unconditionally
        self.store.put_object(&file.filename, &file.content).await?;
        info!(filename = %file.filename, size = file.content.len(), "Stored uploaded file");

        index_redirect()
    }

    /// POST /delete - Delete the selected objects, tolerating per-file failures
    async fn post_delete(
        &self,
        req: Request<Incoming>,
        session: Session,
    ) -> Result<Response<Full<Bytes>>, AppError> {
        if let AuthDecision::RedirectToLogin = self.gate.require_session(&session).await? {
            return login_redirect();
        }

        let body_bytes = req.into_body().collect().await?.to_bytes();
        let filenames: Vec<String> = form_urlencoded::parse(&body_bytes)
            .into_owned()
            .filter(|(key, value)| key == "filenames" && !value.is_empty())
            .map(|(_, value)| value)
            .collect();

        if filenames.is_empty() {
            session::push_notice(&session, "No files were selected for deletion.").await?;
            return index_redirect();
        }

        let report = storage::delete_objects(self.store.as_ref(), &filenames).await;
        for failure in report.failures() {
            session::push_notice(&session, &format!("Could not delete {}.", failure.name)).await?;
        }
        session::push_notice(
            &session,
            &format!(
                "Deleted {} of {} selected file(s).",
                report.deleted(),
                report.total()
            ),
        )
        .await?;

        index_redirect()
    }

    /// Serve static files (CSS)
    async fn get_static_file(&self, path: &str) -> Result<Response<Full<Bytes>>, AppError> {
        use std::path::PathBuf;
        use tokio::fs;

        let file_path = path.strip_prefix("/static/").unwrap_or("");

        // Prevent directory traversal
        if file_path.contains("..") {
            return Response::builder()
                .status(StatusCode::FORBIDDEN)
                .body(Full::new(Bytes::from("Forbidden")))
                .map_err(AppError::from);
        }

        let static_dir = PathBuf::from("static");
        let absolute_path = static_dir.join(file_path);

        let content = match fs::read(&absolute_path).await {
            Ok(content) => content,
            Err(_) => return Ok(respond_404()),
        };

        let content_type = if file_path.ends_with(".css") {
            "text/css"
        } else if file_path.ends_with(".js") {
            "application/javascript"
        } else {
            "application/octet-stream"
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "public, max-age=3600")
            .body(Full::new(Bytes::from(content)))
            .map_err(AppError::from)
    }

    /// Helper: Build an HTML response with security headers
    fn build_html_response(
        &self,
        html: impl Template,
    ) -> Result<Response<Full<Bytes>>, AppError> {
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .header(
                "Content-Security-Policy",
                "default-src 'self'; script-src 'self'; style-src 'self'; img-src 'self' data:;",
            )
            .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
            .header(X_FRAME_OPTIONS, "DENY")
            .header(REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"))
            .body(Full::new(Bytes::from(html.render()?)))
            .map_err(AppError::from)
    }
}
