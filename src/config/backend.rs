use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigValidationError;

/// Metering backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL, e.g. `http://ippm.internal:8080`
    pub url: String,

    /// Pre-issued bearer token, used verbatim when set
    #[serde(default)]
    pub access_token: Option<String>,

    /// Shared secret used to sign a bearer token when no token is configured
    #[serde(default)]
    pub access_secret: Option<String>,

    /// `user` claim of signed tokens
    pub token_subject: String,

    /// Lifetime of signed tokens
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    /// Upper bound for one backend call, including the body
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            access_token: None,
            access_secret: None,
            token_subject: "ipweb".to_string(),
            token_ttl: Duration::from_secs(100 * 24 * 60 * 60),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.url.is_empty() {
            return Err(ConfigValidationError::backend("url must not be empty"));
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigValidationError::backend(format!(
                "url {} must use http or https",
                self.url
            )));
        }

        let has_token = self.access_token.as_deref().is_some_and(|t| !t.is_empty());
        let has_secret = self.access_secret.as_deref().is_some_and(|s| !s.is_empty());
        if !has_token && !has_secret {
            return Err(ConfigValidationError::backend(
                "either access_token or access_secret must be set",
            ));
        }

        if has_secret && !has_token && self.token_ttl.is_zero() {
            return Err(ConfigValidationError::backend("token_ttl cannot be 0"));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigValidationError::backend("request_timeout cannot be 0"));
        }

        if self.connect_timeout.is_zero() {
            return Err(ConfigValidationError::backend("connect_timeout cannot be 0"));
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
