use crate::alias::Alias;
use crate::error::StorageError;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A persisted association between a target URL and its alias.
///
/// Both `value` and `alias` are unique keys. The backend enforces them at
/// commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUrlRecord {
    /// The target URL, as submitted.
    pub value: String,
    /// The alias assigned to the URL.
    pub alias: Alias,
    /// When the record was created. Kept for auditing only.
    pub created_at: Timestamp,
}

impl TargetUrlRecord {
    /// Creates a record stamped with the current time.
    ///
    /// The timestamp is truncated to whole microseconds, the finest
    /// precision backends keep, so a record reads back equal to itself.
    pub fn new(value: impl Into<String>, alias: Alias) -> Self {
        let now = Timestamp::now();
        Self {
            value: value.into(),
            alias,
            created_at: Timestamp::from_microsecond(now.as_microsecond()).unwrap_or(now),
        }
    }

    /// Returns the short URL redirecting to this target.
    pub fn short_url(&self, base_url: &str) -> String {
        self.alias.to_url(base_url)
    }

    /// Returns the URL of the preview page for this target.
    pub fn preview_url(&self, base_url: &str) -> String {
        format!(
            "{}/preview/{}",
            base_url.trim_end_matches('/'),
            self.alias
        )
    }
}

/// Point queries by either unique key.
///
/// A query matching more than one record must fail with
/// [`StorageError::MultipleRecordsFound`] rather than pick one.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the record carrying `alias`.
    async fn find_by_alias(&self, alias: &Alias) -> Result<Option<TargetUrlRecord>>;

    /// Retrieves the record whose target URL equals `value`.
    async fn find_by_value(&self, value: &str) -> Result<Option<TargetUrlRecord>>;
}

/// A transactional backend for target URL records.
#[async_trait]
pub trait Repository: ReadRepository {
    type Transaction: Transaction;

    /// Starts a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// A single write transaction.
///
/// Unique violations may surface from either [`insert`](Transaction::insert)
/// or [`commit`](Transaction::commit), as [`StorageError::Conflict`]. Every
/// other error means the backend itself failed. After a failed call the
/// transaction must be rolled back; rolling back a finished transaction is
/// a no-op.
#[async_trait]
pub trait Transaction: Send + 'static {
    /// Stages a new record.
    async fn insert(&mut self, record: &TargetUrlRecord) -> Result<()>;

    /// Makes every staged record durable, or none of them.
    async fn commit(&mut self) -> Result<()>;

    /// Discards every staged record.
    async fn rollback(&mut self) -> Result<()>;
}
