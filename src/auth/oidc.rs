//! OIDC client for the configured identity provider.
//!
//! Endpoints come from the provider's discovery document, which is cached
//! for [`DISCOVERY_CACHE_TTL`](crate::constants::DISCOVERY_CACHE_TTL).
//! Login identity is resolved by exchanging the authorization code at the
//! token endpoint and reading claims from the userinfo endpoint.

use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use urlencoding::encode;

use crate::constants::{DISCOVERY_CACHE_TTL, OIDC_SCOPES, OUTBOUND_REQUEST_TIMEOUT};
use crate::error::AppError;
use crate::session::UserClaims;

/// Endpoints advertised by the provider's discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

struct CachedDiscovery {
    document: DiscoveryDocument,
    fetched_at: Instant,
}

pub struct OidcClient {
    http_client: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    discovery_cache: RwLock<Option<CachedDiscovery>>,
}

impl OidcClient {
    pub fn new(
        issuer: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(OUTBOUND_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            issuer: issuer.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            discovery_cache: RwLock::new(None),
        })
    }

    async fn discovery(&self) -> Result<DiscoveryDocument, AppError> {
        {
            let cache = self.discovery_cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.fetched_at.elapsed() < DISCOVERY_CACHE_TTL
            {
                return Ok(cached.document.clone());
            }
        }

        let discovery_url = format!("{}/.well-known/openid-configuration", self.issuer);
        debug!(url = %discovery_url, "Fetching OIDC discovery document");
        let response = self.http_client.get(&discovery_url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::OidcDiscovery(format!(
                "discovery endpoint returned {}",
                response.status()
            )));
        }
        let document: DiscoveryDocument = response.json().await.map_err(|err| {
            AppError::OidcDiscovery(format!("invalid discovery document: {err}"))
        })?;

        let mut cache = self.discovery_cache.write().await;
        *cache = Some(CachedDiscovery {
            document: document.clone(),
            fetched_at: Instant::now(),
        });
        Ok(document)
    }

    /// Authorization URL for a login round-trip carrying `state`.
    pub async fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        let discovery = self.discovery().await?;

        Ok(format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            discovery.authorization_endpoint,
            encode(&self.client_id),
            encode(&self.redirect_uri),
            encode(&OIDC_SCOPES.join(" ")),
            encode(state),
        ))
    }

    /// Exchange an authorization code for the signed-in user's claims.
    ///
    /// One attempt, no retries; the caller decides what a failure means.
    pub async fn exchange_code(&self, code: &str) -> Result<UserClaims, AppError> {
        let discovery = self.discovery().await?;

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        let response = self
            .http_client
            .post(&discovery.token_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TokenExchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| AppError::TokenExchange(format!("invalid token response: {err}")))?;

        let response = self
            .http_client
            .get(&discovery.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::TokenExchange(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }
        let claims: serde_json::Map<String, Value> = response
            .json()
            .await
            .map_err(|err| AppError::TokenExchange(format!("invalid userinfo response: {err}")))?;

        Ok(UserClaims::from(claims))
    }

    /// Provider end-session URL, or None when the provider does not advertise one.
    pub async fn end_session_url(
        &self,
        post_logout_redirect: &str,
    ) -> Result<Option<String>, AppError> {
        let discovery = self.discovery().await?;

        Ok(discovery.end_session_endpoint.map(|endpoint| {
            format!(
                "{}?post_logout_redirect_uri={}",
                endpoint,
                encode(post_logout_redirect)
            )
        }))
    }
}
