use async_trait::async_trait;
use parking_lot::Mutex;
use snip_core::error::{StorageError, UniqueKey};
use snip_core::repository::{ReadRepository, Repository, Result, TargetUrlRecord, Transaction};
use snip_core::Alias;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Committed rows, indexed by both unique keys.
#[derive(Debug, Default)]
struct Tables {
    by_alias: HashMap<u64, TargetUrlRecord>,
    alias_by_value: HashMap<String, u64>,
}

impl Tables {
    fn violation(&self, record: &TargetUrlRecord) -> Option<UniqueKey> {
        if self.by_alias.contains_key(&record.alias.integer()) {
            Some(UniqueKey::Alias)
        } else if self.alias_by_value.contains_key(&record.value) {
            Some(UniqueKey::Value)
        } else {
            None
        }
    }

    fn put(&mut self, record: TargetUrlRecord) {
        self.alias_by_value
            .insert(record.value.clone(), record.alias.integer());
        self.by_alias.insert(record.alias.integer(), record);
    }
}

/// In-memory implementation of the repository contract.
///
/// Both tables sit behind a single lock, so a commit checks and applies
/// all of its records atomically with respect to other commits. Clones
/// share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed records.
    pub fn len(&self) -> usize {
        self.tables.lock().by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn find_by_alias(&self, alias: &Alias) -> Result<Option<TargetUrlRecord>> {
        Ok(self.tables.lock().by_alias.get(&alias.integer()).cloned())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<TargetUrlRecord>> {
        let tables = self.tables.lock();
        Ok(tables
            .alias_by_value
            .get(value)
            .and_then(|alias| tables.by_alias.get(alias))
            .cloned())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        Ok(InMemoryTransaction {
            tables: Arc::clone(&self.tables),
            staged: Vec::new(),
        })
    }
}

/// A transaction buffering inserts until commit.
#[derive(Debug)]
pub struct InMemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    staged: Vec<TargetUrlRecord>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn insert(&mut self, record: &TargetUrlRecord) -> Result<()> {
        self.staged.push(record.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        let mut tables = self.tables.lock();

        // Check every row (against committed rows and earlier rows of this
        // batch) before touching the tables.
        let mut batch = Tables::default();
        for record in &staged {
            if let Some(key) = tables.violation(record).or_else(|| batch.violation(record)) {
                debug!(%key, value = %record.value, alias = %record.alias, "unique constraint violated");
                return Err(StorageError::Conflict {
                    key,
                    value: Some(record.value.clone()),
                });
            }
            batch.put(record.clone());
        }

        for record in staged {
            tables.put(record);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, alias: u64) -> TargetUrlRecord {
        TargetUrlRecord::new(url, Alias::from_integer(alias).unwrap())
    }

    async fn commit_all(repo: &InMemoryRepository, records: &[TargetUrlRecord]) -> Result<()> {
        let mut tx = repo.begin().await?;
        for record in records {
            tx.insert(record).await?;
        }
        tx.commit().await
    }

    #[tokio::test]
    async fn commit_and_find() {
        let repo = InMemoryRepository::new();

        commit_all(&repo, &[record("https://example.com", 42)])
            .await
            .unwrap();

        let by_alias = repo
            .find_by_alias(&Alias::from_integer(42).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_alias.value, "https://example.com");

        let by_value = repo
            .find_by_value("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_value.alias, Alias::from_integer(42).unwrap());
    }

    #[tokio::test]
    async fn find_nonexistent() {
        let repo = InMemoryRepository::new();

        assert!(repo.find_by_alias(&Alias::from_integer(1).unwrap()).await.unwrap().is_none());
        assert!(repo.find_by_value("https://nope.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn alias_conflict() {
        let repo = InMemoryRepository::new();
        commit_all(&repo, &[record("https://one.com", 7)]).await.unwrap();

        let err = commit_all(&repo, &[record("https://two.com", 7)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Conflict { key: UniqueKey::Alias, value: Some(ref v) } if v == "https://two.com"
        ));
    }

    #[tokio::test]
    async fn value_conflict() {
        let repo = InMemoryRepository::new();
        commit_all(&repo, &[record("https://one.com", 7)]).await.unwrap();

        let err = commit_all(&repo, &[record("https://one.com", 8)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Conflict { key: UniqueKey::Value, .. }
        ));
    }

    #[tokio::test]
    async fn conflict_within_batch() {
        let repo = InMemoryRepository::new();

        let err = commit_all(
            &repo,
            &[record("https://one.com", 1), record("https://two.com", 1)],
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Conflict { key: UniqueKey::Alias, .. }
        ));
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing() {
        let repo = InMemoryRepository::new();
        commit_all(&repo, &[record("https://taken.com", 5)]).await.unwrap();

        let result = commit_all(
            &repo,
            &[record("https://fresh.com", 6), record("https://other.com", 5)],
        )
        .await;

        assert!(result.is_err());
        assert_eq!(repo.len(), 1);
        assert!(repo.find_by_value("https://fresh.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rollback_discards_staged_records() {
        let repo = InMemoryRepository::new();

        let mut tx = repo.begin().await.unwrap();
        tx.insert(&record("https://example.com", 1)).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn concurrent_commits_keep_values_unique() {
        let repo = InMemoryRepository::new();
        let mut handles = vec![];

        for i in 0..10u64 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                commit_all(&repo, &[record("https://same.com", i)]).await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                committed += 1;
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(repo.len(), 1);
    }
}
