use std::num::NonZeroU16;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
pub struct Cli {
    #[clap(short, long, default_value = "8080", env = "BLOBSHELF_PORT")]
    pub port: NonZeroU16,

    #[clap(long, default_value = "127.0.0.1", env = "BLOBSHELF_HOST")]
    pub host: String,

    /// OIDC issuer URL, overrides --tenant-id when both are set
    #[clap(long, env = "BLOBSHELF_OIDC_ISSUER")]
    pub oidc_issuer: Option<String>,

    /// Microsoft Entra tenant id, expanded to the login.microsoftonline.com issuer
    #[clap(long, env = "BLOBSHELF_TENANT_ID")]
    pub tenant_id: Option<String>,

    #[clap(long, env = "BLOBSHELF_CLIENT_ID")]
    pub client_id: Option<String>,

    #[clap(long, env = "BLOBSHELF_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Path the identity provider redirects back to after login
    #[clap(long, default_value = "/callback", env = "BLOBSHELF_REDIRECT_PATH")]
    pub redirect_path: String,

    /// Full redirect URI registered with the provider, defaults to public URL + redirect path
    #[clap(long, env = "BLOBSHELF_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Externally visible base URL of this server
    #[clap(long, env = "BLOBSHELF_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// S3-compatible storage endpoint; the local filesystem backend is used when unset
    #[clap(long, env = "BLOBSHELF_STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,

    /// Container (bucket) holding the managed files
    #[clap(long, default_value = "files", env = "BLOBSHELF_CONTAINER")]
    pub container: String,

    /// Root directory for the local filesystem backend
    #[clap(long, default_value = "./data", env = "BLOBSHELF_STORAGE_ROOT")]
    pub storage_root: PathBuf,

    /// Secret used to sign session cookies, at least 32 bytes; random per process when unset
    #[clap(long, env = "BLOBSHELF_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    #[clap(long, default_value = "28800", env = "BLOBSHELF_SESSION_TTL_SECONDS")]
    pub session_ttl_seconds: i64,

    /// Skip the auth gate entirely (local development only)
    #[clap(long, default_value = "false", env = "BLOBSHELF_DISABLE_AUTH")]
    pub disable_auth: bool,
}
