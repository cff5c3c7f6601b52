//! Service-level error types
//!
//! Errors raised while bootstrapping and running the service: configuration,
//! key setup, seed import and I/O. Request-level failures use
//! [`AppError`](crate::handlers::AppError) instead.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Service error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// JWT key or signing error
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file is not valid JSON
    #[error("Seed data error: {0}")]
    Seed(#[from] serde_json::Error),

    /// Storage rejected a write during bootstrap
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOperation;

    #[test]
    fn test_config_error_display() {
        let error: Error = figment::Error::from("missing field `secret`".to_string()).into();
        assert!(error.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let error: Error = StoreError::duplicate(StoreOperation::Create, "x").into();
        assert!(error.to_string().contains("duplicate"));
    }
}
