use snip_core::error::{StorageError, UniqueKey};
use snip_core::repository::{Repository, Result, TargetUrlRecord, Transaction};
use snip_core::Alias;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of a single attempt at persisting the pending records.
#[derive(Debug)]
pub enum CommitAttempt {
    /// Every pending record is now durable.
    Committed,
    /// A uniqueness constraint rejected the batch. The transaction has been
    /// rolled back and the pending records are still staged.
    Conflict {
        key: UniqueKey,
        value: Option<String>,
    },
    /// The backend failed for a reason that retrying won't fix.
    Fatal(StorageError),
}

/// A unit of work scoped to a single request.
///
/// The session stages new records until they are flushed, and remembers
/// every record it has seen by URL value so that repeated lookups within
/// the same request don't go back to the backend. It must not be shared
/// between concurrent requests.
pub struct Session<R: Repository> {
    repository: Arc<R>,
    pending: Vec<TargetUrlRecord>,
    identity: HashMap<String, TargetUrlRecord>,
}

impl<R: Repository> Session<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            pending: Vec::new(),
            identity: HashMap::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the records staged but not yet committed.
    pub fn pending(&self) -> &[TargetUrlRecord] {
        &self.pending
    }

    /// Returns the record this session knows for `value`, staged or
    /// committed, without querying the backend.
    pub fn cached(&self, value: &str) -> Option<&TargetUrlRecord> {
        self.identity.get(value)
    }

    /// Finds the record for `value`, looking at the session first.
    pub async fn find_by_value(&mut self, value: &str) -> Result<Option<TargetUrlRecord>> {
        if let Some(record) = self.identity.get(value) {
            trace!(value, alias = %record.alias, "target url found in session");
            return Ok(Some(record.clone()));
        }

        let found = self.repository.find_by_value(value).await?;
        if let Some(record) = &found {
            self.identity.insert(record.value.clone(), record.clone());
        }
        Ok(found)
    }

    /// Finds the committed record carrying `alias`.
    pub async fn find_by_alias(&self, alias: &Alias) -> Result<Option<TargetUrlRecord>> {
        self.repository.find_by_alias(alias).await
    }

    /// Stages a new record for the next flush.
    pub fn add(&mut self, record: TargetUrlRecord) {
        self.identity.insert(record.value.clone(), record.clone());
        self.pending.push(record);
    }

    /// Replaces the alias of staged records, using `next` for each one.
    ///
    /// Only the record for `value` is changed if it is staged; otherwise
    /// every staged record gets a new alias. Returns how many were changed.
    pub fn reassign_aliases(&mut self, value: Option<&str>, mut next: impl FnMut() -> Alias) -> usize {
        let targeted = value.filter(|v| self.pending.iter().any(|record| record.value == *v));

        let mut reassigned = 0;
        for record in &mut self.pending {
            if targeted.is_some_and(|v| record.value != v) {
                continue;
            }
            record.alias = next();
            self.identity.insert(record.value.clone(), record.clone());
            reassigned += 1;
        }
        reassigned
    }

    /// Drops the staged record for `committed.value` in favour of the
    /// record another writer has already committed.
    pub fn adopt(&mut self, committed: TargetUrlRecord) {
        self.pending.retain(|record| record.value != committed.value);
        self.identity.insert(committed.value.clone(), committed);
    }

    /// Makes one attempt at committing every staged record.
    ///
    /// On any failure the transaction is rolled back and the staged records
    /// are kept, so the caller can fix them up and try again.
    pub async fn flush(&mut self) -> CommitAttempt {
        if self.pending.is_empty() {
            return CommitAttempt::Committed;
        }

        let mut tx = match self.repository.begin().await {
            Ok(tx) => tx,
            Err(err) => return CommitAttempt::Fatal(err),
        };

        match write_all(&mut tx, &self.pending).await {
            Ok(()) => {
                trace!(count = self.pending.len(), "pending target urls committed");
                self.pending.clear();
                CommitAttempt::Committed
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    return CommitAttempt::Fatal(rollback_err);
                }
                match err {
                    StorageError::Conflict { key, value } => {
                        debug!(%key, ?value, "commit rejected by unique constraint");
                        CommitAttempt::Conflict { key, value }
                    }
                    other => CommitAttempt::Fatal(other),
                }
            }
        }
    }
}

async fn write_all<T: Transaction>(tx: &mut T, records: &[TargetUrlRecord]) -> Result<()> {
    for record in records {
        tx.insert(record).await?;
    }
    tx.commit().await
}
