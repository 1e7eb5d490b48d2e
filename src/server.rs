//! HTTP server setup and lifecycle management.
//!
//! Wires configuration into the storage backend, identity provider client,
//! session layer, and web handler, then runs the accept loop.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::num::NonZeroU16;
use std::path::PathBuf;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use sha2::{Digest, Sha512};
use tokio::net::TcpListener;
use tower::util::BoxCloneService;
use tower::{Service, ServiceBuilder, ServiceExt};
use tower_sessions::cookie::Key;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{debug, info, warn};

use crate::auth::{AuthGate, OidcClient};
use crate::cli::Cli;
use crate::error::AppError;
use crate::storage::{FilesystemStore, ObjectStore, S3ObjectStore};
use crate::web::handlers::WebHandler;
use crate::web::service::WebService;

/// Web service with the session layer applied
pub type SessionedService =
    BoxCloneService<Request<Incoming>, Response<Full<Bytes>>, Infallible>;

/// Main server struct holding resolved configuration.
pub struct Server {
    bind_address: String,
    port: NonZeroU16,
    public_url: String,
    issuer: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_path: String,
    redirect_uri: String,
    storage_endpoint: Option<String>,
    container: String,
    storage_root: PathBuf,
    session_secret: Option<String>,
    session_ttl_seconds: i64,
    disable_auth: bool,
}

impl Server {
    pub fn new(cli: Cli) -> Result<Self, AppError> {
        if !cli.redirect_path.starts_with('/') {
            return Err(AppError::Configuration(format!(
                "redirect path '{}' must start with '/'",
                cli.redirect_path
            )));
        }
        if cli.session_ttl_seconds <= 0 {
            return Err(AppError::Configuration(
                "session TTL must be a positive number of seconds".to_string(),
            ));
        }
        if let Some(secret) = &cli.session_secret
            && secret.len() < 32
        {
            return Err(AppError::Configuration(
                "session secret must be at least 32 bytes".to_string(),
            ));
        }

        let public_url = cli
            .public_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", cli.host, cli.port));
        let redirect_uri = cli
            .redirect_uri
            .unwrap_or_else(|| format!("{}{}", public_url, cli.redirect_path));

        // An explicit issuer wins; a tenant id expands to the Entra issuer
        let issuer = cli.oidc_issuer.or_else(|| {
            cli.tenant_id
                .as_ref()
                .map(|tenant| format!("https://login.microsoftonline.com/{tenant}/v2.0"))
        });

        if !cli.disable_auth
            && (issuer.is_none() || cli.client_id.is_none() || cli.client_secret.is_none())
        {
            return Err(AppError::Configuration(
                "an issuer (or tenant id), client id, and client secret are required unless authentication is disabled"
                    .to_string(),
            ));
        }

        Ok(Self {
            bind_address: cli.host,
            port: cli.port,
            public_url,
            issuer,
            client_id: cli.client_id,
            client_secret: cli.client_secret,
            redirect_path: cli.redirect_path,
            redirect_uri,
            storage_endpoint: cli.storage_endpoint,
            container: cli.container,
            storage_root: cli.storage_root,
            session_secret: cli.session_secret,
            session_ttl_seconds: cli.session_ttl_seconds,
            disable_auth: cli.disable_auth,
        })
    }

    #[cfg(test)]
    /// Create a server instance for testing that binds to a random available port
    pub(crate) async fn test_mode(
        storage_root: PathBuf,
        disable_auth: bool,
    ) -> Result<(Self, u16), AppError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        drop(listener);

        let server = Server::new(Cli {
            host: "127.0.0.1".to_string(),
            port: NonZeroU16::try_from(port).map_err(|_| {
                AppError::Configuration(format!("Failed to convert port '{port}' to NonZeroU16"))
            })?,
            // Points at this server itself, which serves no discovery
            // document: gate behavior is testable without a provider
            oidc_issuer: Some(format!("http://127.0.0.1:{port}/test-issuer")),
            tenant_id: None,
            client_id: Some("test-client".to_string()),
            client_secret: Some("test-secret".to_string()),
            redirect_path: "/callback".to_string(),
            redirect_uri: None,
            public_url: None,
            storage_endpoint: None,
            container: "files".to_string(),
            storage_root,
            session_secret: Some("0123456789abcdef0123456789abcdef".to_string()),
            session_ttl_seconds: 3600,
            disable_auth,
        })?;
        Ok((server, port))
    }

    pub async fn run(self) -> Result<(), AppError> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        let addr: SocketAddr = addr.parse()?;

        let store: Arc<dyn ObjectStore> = match &self.storage_endpoint {
            Some(endpoint) => {
                info!(endpoint = %endpoint, container = %self.container, "Using S3-compatible storage backend");
                Arc::new(S3ObjectStore::new(endpoint, &self.container).await)
            }
            None => {
                let root = self.storage_root.join(&self.container);
                info!(root = ?root, "Using local filesystem storage backend");
                Arc::new(FilesystemStore::new(&root)?)
            }
        };

        let oidc = match (&self.issuer, &self.client_id, &self.client_secret) {
            (Some(issuer), Some(client_id), Some(client_secret)) => Some(Arc::new(
                OidcClient::new(issuer, client_id, client_secret, &self.redirect_uri)?,
            )),
            _ => None,
        };
        if self.disable_auth {
            warn!("Authentication is disabled; every request passes the auth gate");
        }

        let key = match &self.session_secret {
            Some(secret) => {
                // Stretch the configured secret to the 64 bytes a cookie key needs
                let digest = Sha512::digest(secret.as_bytes());
                Key::from(&digest)
            }
            None => Key::generate(),
        };
        let session_layer = SessionManagerLayer::new(MemoryStore::default())
            .with_secure(self.public_url.starts_with("https://"))
            .with_signed(key)
            .with_expiry(Expiry::OnInactivity(Duration::seconds(
                self.session_ttl_seconds,
            )));

        let gate = AuthGate::new(self.disable_auth);
        let web_handler = Arc::new(WebHandler::new(
            gate,
            oidc,
            store,
            self.redirect_path.clone(),
            self.public_url.clone(),
        ));
        let web_service = WebService::new(web_handler);

        let service = ServiceBuilder::new()
            .layer(session_layer)
            .service(web_service);
        let service: SessionedService = ServiceExt::boxed_clone(service);

        let listener = TcpListener::bind(addr).await?;
        info!(
            address = %addr,
            public_url = %self.public_url,
            container = %self.container,
            redirect_uri = %self.redirect_uri,
            auth_disabled = self.disable_auth,
            "Starting blobshelf..."
        );

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!(remote_addr = %remote_addr, "Accepted new connection");

            let io = TokioIo::new(stream);
            let service = service.clone();

            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(move |req| {
                            let mut service = service.clone();
                            async move { service.call(req).await }
                        }),
                    )
                    .await
                {
                    debug!(error = %err, remote_addr = %remote_addr, "Error serving connection");
                }
            });
        }
    }
}
