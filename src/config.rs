//! Tap configuration
//!
//! Loaded from a JSON or YAML file, or from inline JSON, and validated
//! before anything touches the network. Validation failures are
//! configuration errors and abort the run.

use crate::auth::{AuthConfig, AD_MANAGER_SCOPE, DEFAULT_TOKEN_URL};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig};
use crate::reports::{ReconcileConfig, ReportDefinition};
use crate::types::{JsonValue, OptionStringExt};
use chrono::DateTime;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default API root
pub const DEFAULT_API_URL: &str = "https://admanager.googleapis.com/v1/";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete tap configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TapConfig {
    /// Ad Manager network code
    #[serde(deserialize_with = "string_or_number")]
    pub network_id: String,

    /// OAuth client id
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: Option<String>,

    /// OAuth refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Service account JSON key file
    #[serde(default)]
    pub key_file_path: Option<String>,

    /// Pre-issued access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// `client_credentials` selects the client credentials flow
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Token endpoint override
    #[serde(default)]
    pub token_url: Option<String>,

    /// API root override
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Lower bound for incremental streams (RFC 3339)
    #[serde(default)]
    pub start_date: Option<String>,

    /// Display name → report specification
    #[serde(default)]
    pub reports: BTreeMap<String, JsonValue>,

    /// HTTP executor settings
    #[serde(default)]
    pub http: HttpSettings,

    /// Report workflow settings
    #[serde(default)]
    pub report_settings: ReportSettings,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::String(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP executor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Token bucket rate
    pub requests_per_second: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            requests_per_second: 10,
        }
    }
}

// ============================================================================
// Report Settings
// ============================================================================

/// Report workflow intervals and bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Listing re-fetches after creating a report
    pub confirm_attempts: u32,
    /// Seconds between confirmation fetches
    pub confirm_interval_secs: u64,
    /// Seconds between operation polls
    pub poll_interval_secs: u64,
    /// Seconds before a run operation is abandoned
    pub poll_timeout_secs: u64,
    /// Rows per fetchRows page
    pub rows_page_size: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        let defaults = ReconcileConfig::default();
        Self {
            confirm_attempts: defaults.confirm_attempts,
            confirm_interval_secs: defaults.confirm_interval.as_secs(),
            poll_interval_secs: defaults.poll_interval.as_secs(),
            poll_timeout_secs: defaults.poll_timeout.as_secs(),
            rows_page_size: defaults.rows_page_size,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl TapConfig {
    /// Load from a file; `.yaml` / `.yml` are read as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        debug!(path = %path.display(), yaml = is_yaml, "Loading config");
        if is_yaml {
            Self::from_yaml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Parse and validate JSON
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| Error::config(format!("Invalid config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.network_id.trim().is_empty() {
            return Err(Error::missing_field("network_id"));
        }

        url::Url::parse(&self.api_url)
            .map_err(|e| Error::invalid_value("api_url", e.to_string()))?;

        if let Some(start_date) = &self.start_date {
            DateTime::parse_from_rfc3339(start_date).map_err(|e| {
                Error::invalid_value("start_date", format!("expected RFC 3339 timestamp: {e}"))
            })?;
        }

        if self.http.requests_per_second == 0 {
            return Err(Error::invalid_value(
                "http.requests_per_second",
                "must be greater than zero",
            ));
        }
        if self.report_settings.rows_page_size == 0 {
            return Err(Error::invalid_value(
                "report_settings.rows_page_size",
                "must be greater than zero",
            ));
        }

        self.report_definitions()?;
        self.auth_config()?.validate()
    }

    // ========================================================================
    // Derived runtime configs
    // ========================================================================

    /// Resolve the credential flow
    ///
    /// A key file selects the service account flow; `grant_type:
    /// client_credentials` selects client credentials; otherwise a refresh
    /// token or a pre-issued access token is expected.
    pub fn auth_config(&self) -> Result<AuthConfig> {
        let token_url = self
            .token_url
            .clone()
            .none_if_empty()
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());

        if let Some(key_file) = self.key_file_path.clone().none_if_empty() {
            return AuthConfig::service_account_from_file(key_file);
        }

        let client_id = self.client_id.clone().unwrap_or_default();
        let client_secret = self.client_secret.clone().unwrap_or_default();

        match self.grant_type.as_deref() {
            Some("client_credentials") => {
                return Ok(AuthConfig::Oauth2ClientCredentials {
                    token_url,
                    client_id,
                    client_secret,
                    scopes: vec![AD_MANAGER_SCOPE.to_string()],
                })
            }
            Some("refresh_token") | None => {}
            Some(other) => {
                return Err(Error::invalid_value(
                    "grant_type",
                    format!("unsupported grant type '{other}'"),
                ))
            }
        }

        if let Some(refresh_token) = self.refresh_token.clone().none_if_empty() {
            return Ok(AuthConfig::Oauth2Refresh {
                token_url,
                client_id,
                client_secret,
                refresh_token,
            });
        }

        if let Some(token) = self.access_token.clone().none_if_empty() {
            return Ok(AuthConfig::Bearer { token });
        }

        if self.client_id.is_some() {
            return Err(Error::missing_field("refresh_token"));
        }
        Err(Error::config(
            "No credentials configured: set refresh_token, key_file_path or grant_type",
        ))
    }

    /// Declared reports, sorted by display name
    pub fn report_definitions(&self) -> Result<Vec<ReportDefinition>> {
        self.reports
            .iter()
            .map(|(name, spec)| match spec {
                JsonValue::Object(spec) => Ok(ReportDefinition::new(name, spec.clone())),
                other => Err(Error::invalid_value(
                    format!("reports.{name}"),
                    format!("expected an object, got {other}"),
                )),
            })
            .collect()
    }

    /// Executor settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig::builder()
            .base_url(self.api_url.clone())
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .max_retries(self.http.max_retries)
            .rate_limit(RateLimiterConfig::per_second(self.http.requests_per_second))
            .build()
    }

    /// Report workflow settings
    pub fn reconcile_config(&self) -> ReconcileConfig {
        let settings = &self.report_settings;
        ReconcileConfig {
            confirm_attempts: settings.confirm_attempts,
            confirm_interval: Duration::from_secs(settings.confirm_interval_secs),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            poll_timeout: Duration::from_secs(settings.poll_timeout_secs),
            rows_page_size: settings.rows_page_size,
        }
    }

    /// Build the authenticated executor
    pub fn build_client(&self) -> Result<HttpClient> {
        match self.auth_config()? {
            AuthConfig::None => HttpClient::with_config(self.http_client_config()),
            auth => {
                let authenticator = crate::auth::Authenticator::new(auth)?;
                HttpClient::with_auth(self.http_client_config(), authenticator)
            }
        }
    }
}

/// JSON Schema of the configuration, for the `spec` command
pub fn connection_specification() -> JsonValue {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Ad Manager",
        "type": "object",
        "required": ["network_id"],
        "properties": {
            "network_id": {"type": "string", "description": "Ad Manager network code"},
            "client_id": {"type": "string"},
            "client_secret": {"type": "string", "secret": true},
            "refresh_token": {"type": "string", "secret": true},
            "key_file_path": {"type": "string", "description": "Service account JSON key file"},
            "access_token": {"type": "string", "secret": true},
            "grant_type": {"type": "string", "enum": ["refresh_token", "client_credentials"]},
            "token_url": {"type": "string", "default": DEFAULT_TOKEN_URL},
            "api_url": {"type": "string", "default": DEFAULT_API_URL},
            "start_date": {"type": "string", "format": "date-time"},
            "reports": {
                "type": "object",
                "description": "Display name to report specification",
                "additionalProperties": {"type": "object"}
            },
            "http": {
                "type": "object",
                "properties": {
                    "timeout_secs": {"type": "integer", "default": 30},
                    "max_retries": {"type": "integer", "default": 3},
                    "requests_per_second": {"type": "integer", "default": 10}
                }
            },
            "report_settings": {
                "type": "object",
                "properties": {
                    "confirm_attempts": {"type": "integer", "default": 5},
                    "confirm_interval_secs": {"type": "integer", "default": 2},
                    "poll_interval_secs": {"type": "integer", "default": 5},
                    "poll_timeout_secs": {"type": "integer", "default": 300},
                    "rows_page_size": {"type": "integer", "default": 1000}
                }
            }
        }
    })
}
