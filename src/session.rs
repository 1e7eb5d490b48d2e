//! Typed access to the per-browser session state.
//!
//! The browser only ever holds an opaque signed cookie; identity claims,
//! the in-flight login state parameter, and flash notices all live
//! server-side under the keys in [`crate::constants::SessionKey`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;

use crate::constants::SessionKey;
use crate::error::AppError;

/// Identity claims returned by the provider, keyed by claim name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserClaims(serde_json::Map<String, Value>);

impl UserClaims {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// Best-effort human name: `name`, then `preferred_username`, then `sub`.
    pub fn display_name(&self) -> Option<&str> {
        ["name", "preferred_username", "sub"]
            .iter()
            .find_map(|claim| self.0.get(*claim).and_then(Value::as_str))
    }
}

impl From<serde_json::Map<String, Value>> for UserClaims {
    fn from(claims: serde_json::Map<String, Value>) -> Self {
        Self(claims)
    }
}

pub async fn user_claims(session: &Session) -> Result<Option<UserClaims>, AppError> {
    Ok(session.get(SessionKey::UserClaims.as_ref()).await?)
}

/// Overwrites any previously stored claims.
pub async fn set_user_claims(session: &Session, claims: &UserClaims) -> Result<(), AppError> {
    session
        .insert(SessionKey::UserClaims.as_ref(), claims)
        .await?;
    Ok(())
}

pub async fn set_oauth_state(session: &Session, state: &str) -> Result<(), AppError> {
    session
        .insert(SessionKey::OauthState.as_ref(), state)
        .await?;
    Ok(())
}

/// Removes and returns the stored login state parameter; it is single-use.
pub async fn take_oauth_state(session: &Session) -> Result<Option<String>, AppError> {
    Ok(session.remove(SessionKey::OauthState.as_ref()).await?)
}

/// Queue a notice for display on the next rendered page.
pub async fn push_notice(session: &Session, notice: &str) -> Result<(), AppError> {
    let mut notices: Vec<String> = session
        .get(SessionKey::Notices.as_ref())
        .await?
        .unwrap_or_default();
    notices.push(notice.to_string());
    session.insert(SessionKey::Notices.as_ref(), notices).await?;
    Ok(())
}

/// Drain all pending notices.
pub async fn take_notices(session: &Session) -> Result<Vec<String>, AppError> {
    Ok(session
        .remove(SessionKey::Notices.as_ref())
        .await?
        .unwrap_or_default())
}
