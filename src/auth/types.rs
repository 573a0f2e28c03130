//! Auth configuration types
//!
//! These types represent the runtime credential configuration after the
//! tap config has been validated.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// Default Google OAuth2 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth2 scope for the Ad Manager API
pub const AD_MANAGER_SCOPE: &str = "https://www.googleapis.com/auth/admanager";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Pre-issued bearer token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 Client Credentials flow
    Oauth2ClientCredentials {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Requested scopes
        scopes: Vec<String>,
    },

    /// OAuth2 Refresh Token flow
    Oauth2Refresh {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
    },

    /// Service account: signed JWT assertion exchanged for an access token
    ServiceAccount {
        /// Service account email (iss claim)
        client_email: String,
        /// Private key for signing (PEM format)
        private_key: String,
        /// Token endpoint (aud claim and exchange URL)
        token_url: String,
        /// Requested scopes
        scopes: Vec<String>,
        /// User to impersonate (sub claim, optional)
        subject: Option<String>,
        /// Assertion lifetime in seconds
        token_lifetime_seconds: u64,
    },
}

impl AuthConfig {
    /// Build a service account config from a key file on disk
    pub fn service_account_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Ok(key.into_auth_config(vec![AD_MANAGER_SCOPE.to_string()]))
    }

    /// Check that every field the configured flow needs is present
    pub fn validate(&self) -> Result<()> {
        match self {
            AuthConfig::None => Ok(()),
            AuthConfig::Bearer { token } => require("access_token", token),
            AuthConfig::Oauth2ClientCredentials {
                token_url,
                client_id,
                client_secret,
                ..
            } => {
                require("token_url", token_url)?;
                require("client_id", client_id)?;
                require("client_secret", client_secret)
            }
            AuthConfig::Oauth2Refresh {
                token_url,
                client_id,
                client_secret,
                refresh_token,
            } => {
                require("token_url", token_url)?;
                require("client_id", client_id)?;
                require("client_secret", client_secret)?;
                require("refresh_token", refresh_token)
            }
            AuthConfig::ServiceAccount {
                client_email,
                private_key,
                token_url,
                ..
            } => {
                require("client_email", client_email)?;
                require("private_key", private_key)?;
                require("token_uri", token_url)
            }
        }
    }

    /// Whether this flow caches a token that must be refreshed
    pub fn is_refreshable(&self) -> bool {
        matches!(
            self,
            AuthConfig::Oauth2ClientCredentials { .. }
                | AuthConfig::Oauth2Refresh { .. }
                | AuthConfig::ServiceAccount { .. }
        )
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::missing_field(field))
    } else {
        Ok(())
    }
}

/// Google service account key file (the JSON downloaded from the console)
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email
    #[serde(default)]
    pub client_email: String,
    /// PEM encoded private key
    #[serde(default)]
    pub private_key: String,
    /// Token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl ServiceAccountKey {
    /// Read and parse a key file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read service account key file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a key from its JSON contents
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| Error::config(format!("Invalid service account key file: {e}")))
    }

    /// Convert into a runtime auth config
    pub fn into_auth_config(self, scopes: Vec<String>) -> AuthConfig {
        AuthConfig::ServiceAccount {
            client_email: self.client_email,
            private_key: self.private_key,
            token_url: self.token_uri,
            scopes,
            subject: None,
            token_lifetime_seconds: 3600,
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_inside_buffer_is_expired() {
        let token = CachedToken::expires_in("test".to_string(), 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
        assert!(!config.is_refreshable());
    }

    #[test]
    fn test_validate_refresh_missing_token() {
        let config = AuthConfig::Oauth2Refresh {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: String::new(),
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { field } if field == "refresh_token"));
    }

    #[test]
    fn test_service_account_key_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email": "tap@project.iam.gserviceaccount.com", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URL);

        let config = key.into_auth_config(vec![AD_MANAGER_SCOPE.to_string()]);
        assert!(config.is_refreshable());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_account_key_missing_email_fails_validation() {
        let key = ServiceAccountKey::from_json(r#"{"private_key": "pem"}"#).unwrap();
        let err = key.into_auth_config(vec![]).validate().unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { field } if field == "client_email"));
    }
}
