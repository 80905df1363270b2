//! Error types and result types for record store operations.
//!
//! Every fallible operation in the workspace returns [`RecordStoreResult<T>`]. The variants
//! that callers are expected to branch on (a missing record, an unresolvable collection, a
//! missing crypto secret) are distinct and have `is_*` helpers.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordStoreError {
    /// The servers could not be reached or the transport failed. The driver's message is kept
    /// verbatim.
    #[error("{0}")]
    Connection(String),
    /// The server address string could not be parsed.
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
    /// No document matched the requested identifier or filter.
    /// The argument is the collection name.
    #[error("Record not found in collection {0}")]
    RecordNotFound(String),
    /// The target collection handle could not be obtained.
    #[error("Collection could not be resolved: {0}")]
    CollectionNotResolved(String),
    /// A field is marked for encryption but the connection configuration carries no key.
    /// The argument is the field name.
    #[error("Missing crypto secret for field {0}")]
    MissingCryptoSecret(String),
    /// The cipher rejected the key or the data.
    #[error("Crypto error: {0}")]
    Crypto(String),
    /// The record identifier is unset or malformed.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// The connection configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Serialization/deserialization error when converting records to and from BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RecordStoreError {
    /// Returns `true` if this is a [`RecordStoreError::RecordNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordStoreError::RecordNotFound(_))
    }

    /// Returns `true` if this is a [`RecordStoreError::CollectionNotResolved`].
    pub fn is_collection_not_resolved(&self) -> bool {
        matches!(self, RecordStoreError::CollectionNotResolved(_))
    }

    /// Returns `true` if this is a [`RecordStoreError::MissingCryptoSecret`].
    pub fn is_missing_crypto_secret(&self) -> bool {
        matches!(self, RecordStoreError::MissingCryptoSecret(_))
    }

    /// Returns `true` for dial and transport failures.
    pub fn is_connection(&self) -> bool {
        matches!(self, RecordStoreError::Connection(_) | RecordStoreError::InvalidAddress(_))
    }
}

/// A specialized `Result` type for record store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

impl From<BsonError> for RecordStoreError {
    fn from(err: BsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_keep_the_driver_message() {
        let err = RecordStoreError::Connection("no reachable servers".to_string());
        assert_eq!(err.to_string(), "no reachable servers");
        assert!(err.is_connection());
        assert!(!err.is_not_found());
    }

    #[test]
    fn sentinels_are_distinguishable() {
        assert!(RecordStoreError::RecordNotFound("users".into()).is_not_found());
        assert!(RecordStoreError::CollectionNotResolved("users".into()).is_collection_not_resolved());
        assert!(RecordStoreError::MissingCryptoSecret("email".into()).is_missing_crypto_secret());
        assert!(!RecordStoreError::Crypto("bad key".into()).is_missing_crypto_secret());
    }
}
