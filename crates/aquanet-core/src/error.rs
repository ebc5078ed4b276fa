use thiserror::Error;

/// Top-level error type for the Aquanet system.
///
/// Subsystem crates define their own error types and implement
/// `From<AquanetError>` so that the `?` operator works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AquanetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown task kind: {0}")]
    UnknownTaskKind(String),
}

impl From<toml::de::Error> for AquanetError {
    fn from(err: toml::de::Error) -> Self {
        AquanetError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AquanetError {
    fn from(err: toml::ser::Error) -> Self {
        AquanetError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AquanetError {
    fn from(err: serde_json::Error) -> Self {
        AquanetError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Aquanet operations.
pub type Result<T> = std::result::Result<T, AquanetError>;
