use std::time::Duration;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::BackendConfig, utils::unix_now, BackendError};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user: String,
    iat: i64,
    exp: i64,
}

/// Signs an HS256 bearer token for the metering backend
pub fn sign_access_token(
    secret: &str,
    subject: &str,
    ttl: Duration,
    now: i64,
) -> Result<String, BackendError> {
    let claims = Claims {
        user: subject.to_string(),
        iat: now,
        exp: now.saturating_add(ttl.as_secs() as i64),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Returns the configured token, or signs one from the configured secret
pub fn resolve_access_token(config: &BackendConfig) -> Result<String, BackendError> {
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    let secret = config
        .access_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(BackendError::MissingCredential)?;

    let now = unix_now();
    debug!(
        "Signing backend access token for {} valid {:?}",
        config.token_subject, config.token_ttl
    );
    sign_access_token(secret, &config.token_subject, config.token_ttl, now)
}
