//! Test doubles for the persistence and observability seams.

use crate::committer::PressureSink;
use async_trait::async_trait;
use snip_core::error::StorageError;
use snip_core::repository::{ReadRepository, Repository, Result, TargetUrlRecord, Transaction};
use snip_core::Alias;
use snip_storage::memory::InMemoryTransaction;
use snip_storage::InMemoryRepository;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    commit_failures: VecDeque<StorageError>,
    duplicated_values: HashSet<String>,
    racing_records: VecDeque<TargetUrlRecord>,
}

#[derive(Default)]
struct Counters {
    begins: AtomicUsize,
    inserts: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    value_lookups: AtomicUsize,
}

/// An in-memory repository whose commits can be scripted to fail, and
/// which counts every call it receives.
#[derive(Clone, Default)]
pub(crate) struct ScriptedRepository {
    inner: InMemoryRepository,
    script: Arc<Mutex<Script>>,
    counters: Arc<Counters>,
}

impl ScriptedRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Commits `record` directly, bypassing the counters.
    pub(crate) async fn seed(&self, record: TargetUrlRecord) {
        let mut tx = self.inner.begin().await.expect("begin seed transaction");
        tx.insert(&record).await.expect("stage seed record");
        tx.commit().await.expect("commit seed record");
    }

    /// Makes the next commits fail with `errors`, one per commit.
    pub(crate) fn fail_next_commits(&self, errors: impl IntoIterator<Item = StorageError>) {
        self.script
            .lock()
            .expect("script lock should not be poisoned")
            .commit_failures
            .extend(errors);
    }

    /// Makes lookups of `value` report more than one match.
    pub(crate) fn duplicate_value(&self, value: &str) {
        self.script
            .lock()
            .expect("script lock should not be poisoned")
            .duplicated_values
            .insert(value.to_string());
    }

    /// Lets a concurrent writer commit `record` just before the next commit.
    pub(crate) fn race_next_commit(&self, record: TargetUrlRecord) {
        self.script
            .lock()
            .expect("script lock should not be poisoned")
            .racing_records
            .push_back(record);
    }

    pub(crate) fn inner(&self) -> &InMemoryRepository {
        &self.inner
    }

    pub(crate) fn begins(&self) -> usize {
        self.counters.begins.load(Ordering::SeqCst)
    }

    pub(crate) fn inserts(&self) -> usize {
        self.counters.inserts.load(Ordering::SeqCst)
    }

    pub(crate) fn commits(&self) -> usize {
        self.counters.commits.load(Ordering::SeqCst)
    }

    pub(crate) fn rollbacks(&self) -> usize {
        self.counters.rollbacks.load(Ordering::SeqCst)
    }

    pub(crate) fn value_lookups(&self) -> usize {
        self.counters.value_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadRepository for ScriptedRepository {
    async fn find_by_alias(&self, alias: &Alias) -> Result<Option<TargetUrlRecord>> {
        self.inner.find_by_alias(alias).await
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<TargetUrlRecord>> {
        self.counters.value_lookups.fetch_add(1, Ordering::SeqCst);
        let duplicated = self
            .script
            .lock()
            .expect("script lock should not be poisoned")
            .duplicated_values
            .contains(value);
        if duplicated {
            return Err(StorageError::MultipleRecordsFound(format!(
                "value '{}'",
                value
            )));
        }
        self.inner.find_by_value(value).await
    }
}

#[async_trait]
impl Repository for ScriptedRepository {
    type Transaction = ScriptedTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedTransaction {
            inner: self.inner.begin().await?,
            repository: self.clone(),
        })
    }
}

pub(crate) struct ScriptedTransaction {
    inner: InMemoryTransaction,
    repository: ScriptedRepository,
}

#[async_trait]
impl Transaction for ScriptedTransaction {
    async fn insert(&mut self, record: &TargetUrlRecord) -> Result<()> {
        self.repository.counters.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn commit(&mut self) -> Result<()> {
        self.repository.counters.commits.fetch_add(1, Ordering::SeqCst);
        let (failure, racer) = {
            let mut script = self
                .repository
                .script
                .lock()
                .expect("script lock should not be poisoned");
            (
                script.commit_failures.pop_front(),
                script.racing_records.pop_front(),
            )
        };
        if let Some(racer) = racer {
            self.repository.seed(racer).await;
        }
        match failure {
            Some(err) => Err(err),
            None => self.inner.commit().await,
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        self.repository
            .counters
            .rollbacks
            .fetch_add(1, Ordering::SeqCst);
        self.inner.rollback().await
    }
}

/// A sink recording every pressure warning as `(count, limit)`.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    events: Arc<Mutex<Vec<(u64, u64)>>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<(u64, u64)> {
        self.events
            .lock()
            .expect("sink lock should not be poisoned")
            .clone()
    }
}

impl PressureSink for RecordingSink {
    fn conflict_pressure(&self, count: u64, limit: u64) {
        self.events
            .lock()
            .expect("sink lock should not be poisoned")
            .push((count, limit));
    }
}
