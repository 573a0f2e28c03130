//! Authentication module
//!
//! Supports: OAuth2 refresh token, OAuth2 client credentials, service
//! account (signed JWT assertion), and pre-issued bearer tokens.
//!
//! The `Authenticator` owns the cached token and refreshes it when it is
//! absent or expired. Refresh failures propagate to the caller.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken, ServiceAccountKey, AD_MANAGER_SCOPE, DEFAULT_TOKEN_URL};
