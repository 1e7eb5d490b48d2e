use std::time::Duration;

/// Scopes requested from the identity provider during login.
pub(crate) const OIDC_SCOPES: &[&str] = &["openid", "profile"];

/// Length of the anti-forgery `state` parameter carried across the login round-trip.
pub(crate) const STATE_TOKEN_LENGTH: usize = 32;

/// Name shown when the auth gate is disabled and nobody is signed in.
pub(crate) const GUEST_USER_NAME: &str = "Guest";

/// Multipart field the upload form submits.
pub(crate) const UPLOAD_FIELD_NAME: &str = "file";

/// Timeout applied to outbound identity-provider and storage calls.
pub(crate) const OUTBOUND_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a fetched OIDC discovery document is reused.
pub(crate) const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Region used for the storage client when the environment provides none.
pub(crate) const DEFAULT_STORAGE_REGION: &str = "us-east-1";

/// Keys under which per-session values are stored.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SessionKey {
    UserClaims,
    OauthState,
    Notices,
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        match self {
            SessionKey::UserClaims => "user_claims",
            SessionKey::OauthState => "oauth_state",
            SessionKey::Notices => "notices",
        }
    }
}
