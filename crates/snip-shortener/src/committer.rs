use crate::session::{CommitAttempt, Session};
use snip_core::error::{StorageError, UniqueKey};
use snip_core::repository::Repository;
use snip_core::{Alias, Generator};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

/// Receives a signal when alias collisions become frequent.
///
/// Frequent collisions mean a large share of the alias range is taken.
/// This isn't an error for the request, but operators should widen the
/// configured alias lengths before it gets worse.
pub trait PressureSink: Send + Sync + 'static {
    /// Called once per commit whose collision `count` exceeded `limit`.
    fn conflict_pressure(&self, count: u64, limit: u64);
}

/// Reports collision pressure as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PressureSink for TracingSink {
    fn conflict_pressure(&self, count: u64, limit: u64) {
        warn!(
            count,
            limit,
            "number of integrity errors exceeds the limit; consider widening the alias length range"
        );
    }
}

/// Configures a [`RetryingCommitter`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct CommitterSettings {
    /// Collisions tolerated in one commit before a warning is emitted.
    #[builder(default = 10)]
    pub integrity_error_limit: u64,
}

impl Default for CommitterSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Commits a session, resolving unique-constraint conflicts by retrying.
///
/// - An alias collision gets the colliding record a fresh alias.
/// - A URL value collision means another request committed the same URL
///   first; its record replaces the staged one.
/// - Any other failure is returned as is.
///
/// There is no cap on attempts: every retry draws a new alias, so a commit
/// only keeps failing while the alias range is nearly exhausted, which is
/// what the pressure warning is for.
pub struct RetryingCommitter<G, S = TracingSink> {
    generator: Arc<G>,
    settings: CommitterSettings,
    sink: S,
    total_conflicts: AtomicU64,
}

impl<G: Generator> RetryingCommitter<G, TracingSink> {
    pub fn new(generator: Arc<G>, settings: CommitterSettings) -> Self {
        Self::with_sink(generator, settings, TracingSink)
    }
}

impl<G: Generator, S: PressureSink> RetryingCommitter<G, S> {
    pub fn with_sink(generator: Arc<G>, settings: CommitterSettings, sink: S) -> Self {
        Self {
            generator,
            settings,
            sink,
            total_conflicts: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &CommitterSettings {
        &self.settings
    }

    /// Conflicts absorbed since this committer was created.
    pub fn total_conflicts(&self) -> u64 {
        self.total_conflicts.load(Ordering::Relaxed)
    }

    /// Commits every record staged in `session`.
    ///
    /// Returns the number of conflicts that were resolved on the way.
    pub async fn commit<R: Repository>(
        &self,
        session: &mut Session<R>,
    ) -> Result<u64, StorageError> {
        let mut conflicts: u64 = 0;

        loop {
            match session.flush().await {
                CommitAttempt::Committed => break,
                CommitAttempt::Fatal(err) => return Err(err),
                CommitAttempt::Conflict { key, value } => {
                    conflicts += 1;
                    self.total_conflicts.fetch_add(1, Ordering::Relaxed);
                    debug!(%key, ?value, attempt = conflicts, "retrying commit after conflict");

                    match key {
                        UniqueKey::Alias => {
                            self.reassign(session, value.as_deref());
                        }
                        UniqueKey::Value | UniqueKey::Unknown => {
                            if !self.adopt_committed(session, value.as_deref()).await? {
                                self.reassign(session, value.as_deref());
                            }
                        }
                    }
                }
            }
        }

        let limit = self.settings.integrity_error_limit;
        if conflicts > limit {
            self.sink.conflict_pressure(conflicts, limit);
        }
        Ok(conflicts)
    }

    fn reassign<R: Repository>(&self, session: &mut Session<R>, value: Option<&str>) {
        let generator = &self.generator;
        session.reassign_aliases(value, || Alias::create_random(generator.as_ref()));
    }

    /// Replaces staged records whose URL has been committed meanwhile by
    /// another writer. Returns `false` if none was found.
    async fn adopt_committed<R: Repository>(
        &self,
        session: &mut Session<R>,
        value: Option<&str>,
    ) -> Result<bool, StorageError> {
        let candidates: Vec<String> = match value {
            Some(value) => vec![value.to_string()],
            None => session
                .pending()
                .iter()
                .map(|record| record.value.clone())
                .collect(),
        };

        let mut adopted = false;
        for value in candidates {
            if let Some(committed) = session.repository().find_by_value(&value).await? {
                debug!(value = %committed.value, alias = %committed.alias, "adopting concurrently committed target url");
                session.adopt(committed);
                adopted = true;
            }
        }
        Ok(adopted)
    }
}
