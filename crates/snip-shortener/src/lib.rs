//! URL shortener service implementation.
//!
//! This crate ties the alias generator to a storage backend: a [`Session`]
//! stages new records for one request, the [`TargetUrlRepository`] finds or
//! creates records inside it, and the [`RetryingCommitter`] persists them,
//! absorbing alias collisions. Core types are re-exported from `snip_core`.

pub mod committer;
pub mod repository;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use committer::{CommitterSettings, PressureSink, RetryingCommitter, TracingSink};
pub use repository::TargetUrlRepository;
pub use service::ShortenerService;
pub use session::{CommitAttempt, Session};
pub use snip_core::{Alias, ShortenerError, Shortener, TargetUrlRecord};
