//! Authentication: the per-request session gate and the OIDC provider client.

pub mod gate;
pub mod oidc;

pub use gate::{AuthDecision, AuthGate};
pub use oidc::OidcClient;

use rand::Rng;

use crate::constants::STATE_TOKEN_LENGTH;

/// Random alphanumeric `state` parameter for one login round-trip.
pub(crate) fn generate_state_token() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(STATE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
