use crate::repository::TargetUrlRecord;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Returns the record for `url`, creating and persisting it with a new
    /// alias if the URL has never been shortened.
    async fn shorten(&self, url: &str) -> Result<TargetUrlRecord>;

    /// Resolves an alias string to its stored record.
    /// Returns `None` if the alias is malformed or unknown.
    async fn resolve(&self, alias: &str) -> Result<Option<TargetUrlRecord>>;
}
