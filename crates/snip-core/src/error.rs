use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Errors related to alias construction and generator configuration.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The alias string is malformed, or the constructor was given
    /// both or neither of its representations.
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    /// The configured range of new alias lengths cannot be used.
    #[error("invalid alias length: {0}")]
    InvalidAliasLength(String),
}

/// The unique key whose constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    /// The alias integer is already taken by another record.
    Alias,
    /// A record for the same target URL value already exists.
    Value,
    /// The backend reported a unique violation without naming the key.
    Unknown,
}

impl Display for UniqueKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueKey::Alias => f.write_str("alias"),
            UniqueKey::Value => f.write_str("value"),
            UniqueKey::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated. `value` is the target URL
    /// of the rejected row, when the backend can tell.
    #[error("unique constraint on {key} violated (value: {value:?})")]
    Conflict { key: UniqueKey, value: Option<String> },
    #[error("multiple records found for {0}")]
    MultipleRecordsFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Returns `true` for unique-constraint violations, the only storage
    /// failures that a retry with different data can resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("data integrity violated: {0}")]
    MultipleRecordsFound(String),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidAlias(message) => Self::InvalidAlias(message),
            CoreError::InvalidAliasLength(message) => Self::Configuration(message),
        }
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::MultipleRecordsFound(message) => Self::MultipleRecordsFound(message),
            other => Self::Storage(other),
        }
    }
}
