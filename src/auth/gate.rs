//! The authentication checkpoint shared by every storage-touching route.

use tower_sessions::Session;

use crate::error::AppError;
use crate::session;

/// What a gated route should do with the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    RedirectToLogin,
}

pub struct AuthGate {
    auth_disabled: bool,
}

impl AuthGate {
    /// The flag is fixed for the life of the process.
    pub fn new(auth_disabled: bool) -> Self {
        Self { auth_disabled }
    }

    /// Pure decision: no side effects, the caller issues the actual redirect.
    ///
    /// Allows everything when the gate is disabled; otherwise allows only
    /// sessions holding non-empty identity claims.
    pub async fn require_session(&self, session: &Session) -> Result<AuthDecision, AppError> {
        if self.auth_disabled {
            return Ok(AuthDecision::Allow);
        }
        match session::user_claims(session).await? {
            Some(claims) if !claims.is_empty() => Ok(AuthDecision::Allow),
            _ => Ok(AuthDecision::RedirectToLogin),
        }
    }
}
