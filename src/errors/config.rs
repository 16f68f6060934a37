use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend configuration error: {0}")]
    Backend(String),

    #[error("Fan-out configuration error: {0}")]
    Fanout(String),

    #[error("HTTP configuration error: {0}")]
    Http(String),

    #[error("Logging configuration error: {0}")]
    Logging(String),
}

impl ConfigValidationError {
    pub fn config(details: impl Into<String>) -> Self {
        Self::Config(details.into())
    }

    pub fn backend(details: impl Into<String>) -> Self {
        Self::Backend(details.into())
    }

    pub fn fanout(details: impl Into<String>) -> Self {
        Self::Fanout(details.into())
    }

    pub fn http(details: impl Into<String>) -> Self {
        Self::Http(details.into())
    }

    pub fn logging(details: impl Into<String>) -> Self {
        Self::Logging(details.into())
    }
}
