use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::error::{StorageError, UniqueKey};
use snip_core::repository::{ReadRepository, Repository, Result, TargetUrlRecord, Transaction};
use snip_core::Alias;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, Row};
use tracing::trace;

const SCHEMA: &str = include_str!("../ddl/mysql/target_urls.sql");
const VALUE_INDEX: &str = "uq_target_urls_value";

/// MySQL implementation of the repository contract.
///
/// Rows live in the `target_urls` table, keyed by the alias integer with a
/// unique index on the URL value. Both constraints are checked by MySQL on
/// insert, so concurrent writers racing for the same alias or URL see a
/// [`StorageError::Conflict`] naming the violated key.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `target_urls` table if it does not exist yet.
    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_row(row: &MySqlRow) -> Result<TargetUrlRecord> {
    let alias: u64 = row.try_get("alias").map_err(map_sqlx_error)?;
    let value: String = row.try_get("value").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    from_columns(alias, value, created_at)
}

/// Column values of a record. `created_at` is kept in microseconds since
/// the Unix epoch.
fn to_columns(record: &TargetUrlRecord) -> (u64, &str, i64) {
    (
        record.alias.integer(),
        record.value.as_str(),
        record.created_at.as_microsecond(),
    )
}

fn from_columns(alias: u64, value: String, created_at: i64) -> Result<TargetUrlRecord> {
    let alias = Alias::from_integer(alias)
        .map_err(|e| StorageError::InvalidData(format!("invalid alias column: {e}")))?;
    let created_at = Timestamp::from_microsecond(created_at).map_err(|e| {
        StorageError::InvalidData(format!("invalid created_at timestamp '{}': {e}", created_at))
    })?;

    Ok(TargetUrlRecord {
        value,
        alias,
        created_at,
    })
}

fn single(rows: Vec<MySqlRow>, key: impl FnOnce() -> String) -> Result<Option<TargetUrlRecord>> {
    match rows.as_slice() {
        [] => Ok(None),
        [row] => parse_row(row).map(Some),
        _ => Err(StorageError::MultipleRecordsFound(key())),
    }
}

fn violated_key(err: &sqlx::Error) -> Option<UniqueKey> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }

    // MySQL names the index in the message:
    // "Duplicate entry '...' for key 'target_urls.uq_target_urls_value'"
    let message = db_err.message();
    let key = if db_err.constraint() == Some(VALUE_INDEX) || message.contains(VALUE_INDEX) {
        UniqueKey::Value
    } else if message.contains("PRIMARY") {
        UniqueKey::Alias
    } else {
        UniqueKey::Unknown
    };
    Some(key)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn find_by_alias(&self, alias: &Alias) -> Result<Option<TargetUrlRecord>> {
        trace!(alias = %alias, "querying target url by alias");

        let rows = sqlx::query(
            r#"
            SELECT alias, value, created_at
            FROM target_urls
            WHERE alias = ?
            LIMIT 2
            "#,
        )
        .bind(alias.integer())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        single(rows, || format!("alias '{}'", alias))
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<TargetUrlRecord>> {
        trace!(value, "querying target url by value");

        let rows = sqlx::query(
            r#"
            SELECT alias, value, created_at
            FROM target_urls
            WHERE value = ?
            LIMIT 2
            "#,
        )
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        single(rows, || format!("value '{}'", value))
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    type Transaction = MySqlTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(MySqlTransaction { tx: Some(tx) })
    }
}

/// A MySQL transaction. Dropping it without committing rolls it back.
pub struct MySqlTransaction {
    tx: Option<sqlx::Transaction<'static, MySql>>,
}

fn finished() -> StorageError {
    StorageError::Operation("transaction already finished".to_string())
}

#[async_trait]
impl Transaction for MySqlTransaction {
    async fn insert(&mut self, record: &TargetUrlRecord) -> Result<()> {
        let tx = self.tx.as_mut().ok_or_else(finished)?;
        let (alias, value, created_at) = to_columns(record);
        let result = sqlx::query(
            r#"
            INSERT INTO target_urls (alias, value, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(alias)
        .bind(value)
        .bind(created_at)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match violated_key(&err) {
                Some(key) => Err(StorageError::Conflict {
                    key,
                    value: Some(record.value.clone()),
                }),
                None => Err(map_sqlx_error(err)),
            },
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or_else(finished)?;
        tx.commit().await.map_err(|err| match violated_key(&err) {
            Some(key) => StorageError::Conflict { key, value: None },
            None => map_sqlx_error(err),
        })
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(map_sqlx_error),
            None => Ok(()),
        }
    }
}
