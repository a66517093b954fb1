//! Error types for mangrove

use thiserror::Error;

/// Result type alias for mangrove operations
pub type Result<T> = std::result::Result<T, MangroveError>;

/// Unified error type for all mangrove operations
#[derive(Error, Debug, Clone)]
pub enum MangroveError {
    #[error("MongoDB error: {0}")]
    MongoDB(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A single-document mutation matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MangroveError {
    /// Returns true if the server could not be reached or authenticated against
    pub fn is_connection_error(&self) -> bool {
        matches!(self, MangroveError::Connection(_))
    }

    /// Returns true if the operation matched no document
    pub fn is_not_found(&self) -> bool {
        matches!(self, MangroveError::NotFound(_))
    }
}

impl From<serde_json::Error> for MangroveError {
    fn from(err: serde_json::Error) -> Self {
        MangroveError::Serialization(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for MangroveError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::Authentication { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. } => MangroveError::Connection(err.to_string()),
            ErrorKind::BsonSerialization(_) => MangroveError::Serialization(err.to_string()),
            ErrorKind::BsonDeserialization(_) => MangroveError::Deserialization(err.to_string()),
            ErrorKind::InvalidArgument { .. } => MangroveError::Query(err.to_string()),
            _ => MangroveError::MongoDB(err.to_string()),
        }
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for MangroveError {
    fn from(err: bson::ser::Error) -> Self {
        MangroveError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for MangroveError {
    fn from(err: bson::de::Error) -> Self {
        MangroveError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}
