use thiserror::Error;

/// Errors surfaced by mapper registration, query building and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent mapper declaration, raised while registering.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller misuse detected at call time.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure reported by the driver, or a row that could not be decoded.
    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(..))
    }
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(..))
    }
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(..))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
