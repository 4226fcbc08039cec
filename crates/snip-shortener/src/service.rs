use crate::committer::{CommitterSettings, PressureSink, RetryingCommitter, TracingSink};
use crate::repository::TargetUrlRepository;
use crate::session::Session;
use async_trait::async_trait;
use snip_core::repository::{Repository, TargetUrlRecord};
use snip_core::{Generator, Shortener, ShortenerError};
use snip_generator::RandomGenerator;
use std::sync::Arc;
use tracing::{debug, info};

/// Longest target URL that can be stored.
pub const MAX_URL_LENGTH: usize = 2083;

/// A concrete implementation of the `Shortener` trait.
///
/// Every call runs in its own [`Session`], so concurrent requests share
/// nothing but the backend, the generator and the committer counters.
pub struct ShortenerService<R, G, S = TracingSink> {
    backend: Arc<R>,
    repository: TargetUrlRepository<G>,
    committer: RetryingCommitter<G, S>,
}

impl<R: Repository, G: Generator> ShortenerService<R, G, TracingSink> {
    pub fn new(backend: R, generator: G, settings: CommitterSettings) -> Self {
        Self::with_sink(backend, generator, settings, TracingSink)
    }
}

impl<R: Repository> ShortenerService<R, RandomGenerator, TracingSink> {
    /// Creates a service drawing new aliases between the given lengths.
    ///
    /// # Errors
    ///
    /// Returns [`ShortenerError::Configuration`] if the lengths are unusable.
    pub fn configure(
        backend: R,
        min_new_alias_length: i64,
        max_new_alias_length: i64,
        settings: CommitterSettings,
    ) -> Result<Self, ShortenerError> {
        let generator = RandomGenerator::configure(min_new_alias_length, max_new_alias_length)?;
        Ok(Self::new(backend, generator, settings))
    }
}

impl<R: Repository, G: Generator, S: PressureSink> ShortenerService<R, G, S> {
    /// Creates a service reporting collision pressure to `sink`.
    pub fn with_sink(backend: R, generator: G, settings: CommitterSettings, sink: S) -> Self {
        let generator = Arc::new(generator);
        Self {
            backend: Arc::new(backend),
            repository: TargetUrlRepository::new(Arc::clone(&generator)),
            committer: RetryingCommitter::with_sink(generator, settings, sink),
        }
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn generator(&self) -> &G {
        self.repository.generator()
    }

    pub fn committer(&self) -> &RetryingCommitter<G, S> {
        &self.committer
    }

    /// Validates that the URL is storable and has an http(s) scheme and host.
    fn validate_url(url: &str) -> Result<(), ShortenerError> {
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL is longer than {} characters",
                MAX_URL_LENGTH
            )));
        }

        if !url.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must be printable ASCII without whitespace: {}",
                url.escape_debug()
            )));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        };

        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                scheme
            )));
        }

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl<R: Repository, G: Generator, S: PressureSink> Shortener for ShortenerService<R, G, S> {
    async fn shorten(&self, url: &str) -> Result<TargetUrlRecord, ShortenerError> {
        Self::validate_url(url)?;

        let mut session = Session::new(Arc::clone(&self.backend));
        let staged = self.repository.get_or_create(&mut session, url).await?;
        let conflicts = self.committer.commit(&mut session).await?;

        // Retries may have changed the alias or adopted another writer's
        // record; the session holds the final one.
        let record = session.cached(url).cloned().unwrap_or(staged);
        if conflicts > 0 {
            debug!(value = url, alias = %record.alias, conflicts, "target url committed after conflicts");
        } else {
            info!(value = url, alias = %record.alias, "target url shortened");
        }
        Ok(record)
    }

    async fn resolve(&self, alias: &str) -> Result<Option<TargetUrlRecord>, ShortenerError> {
        let session = Session::new(Arc::clone(&self.backend));
        match self.repository.get(&session, alias).await {
            Err(ShortenerError::InvalidAlias(reason)) => {
                debug!(alias, %reason, "malformed alias treated as not found");
                Ok(None)
            }
            other => other,
        }
    }
}
