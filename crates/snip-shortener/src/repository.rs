use crate::session::Session;
use snip_core::repository::{Repository, TargetUrlRecord};
use snip_core::{Alias, Generator, ShortenerError};
use std::sync::Arc;
use tracing::debug;

/// Looks up target URLs, creating missing ones with a random alias.
///
/// New records are only staged in the session; committing them is left to
/// the [`RetryingCommitter`](crate::RetryingCommitter).
#[derive(Debug)]
pub struct TargetUrlRepository<G> {
    generator: Arc<G>,
}

impl<G> Clone for TargetUrlRepository<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<G: Generator> TargetUrlRepository<G> {
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Finds the record behind an alias string.
    ///
    /// A malformed alias is reported as [`ShortenerError::InvalidAlias`];
    /// callers usually treat it as not found.
    pub async fn get<R: Repository>(
        &self,
        session: &Session<R>,
        alias: &str,
    ) -> Result<Option<TargetUrlRecord>, ShortenerError> {
        let alias = Alias::from_string(alias)?;
        Ok(session.find_by_alias(&alias).await?)
    }

    /// Returns the record for `value`, staging a new one if none exists.
    pub async fn get_or_create<R: Repository>(
        &self,
        session: &mut Session<R>,
        value: &str,
    ) -> Result<TargetUrlRecord, ShortenerError> {
        if let Some(record) = session.find_by_value(value).await? {
            return Ok(record);
        }

        let record = TargetUrlRecord::new(value, Alias::create_random(self.generator.as_ref()));
        debug!(value, alias = %record.alias, "staging new target url");
        session.add(record.clone());
        Ok(record)
    }
}
