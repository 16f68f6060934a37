use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call to the metering backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-200 answer, message is the response body or `status code N`
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid backend URL {url}: {details}")]
    InvalidUrl { url: String, details: String },

    #[error("Failed to sign backend access token: {0}")]
    Credential(#[from] jsonwebtoken::errors::Error),

    #[error("No backend credential configured")]
    MissingCredential,
}

impl BackendError {
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Builds a status failure, falling back to `status code N` for empty bodies
    pub fn status(status: StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("status code {}", status.as_u16())
        } else {
            body.to_string()
        };

        Self::Status {
            status: status.as_u16(),
            message,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_is_verbatim() {
        let err = BackendError::status(StatusCode::BAD_REQUEST, "user xyz not found");
        assert_eq!(err.to_string(), "user xyz not found");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_empty_status_body_fallback() {
        let err = BackendError::status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.to_string(), "status code 503");
    }
}
