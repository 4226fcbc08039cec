//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the alias numeral system, the [`Alias`] value type,
//! and the contracts implemented by generators, storage backends and the
//! shortener service.

pub mod alias;
pub mod codec;
pub mod error;
pub mod generator;
pub mod repository;
pub mod shortener;

pub use alias::Alias;
pub use error::{CoreError, ShortenerError, StorageError, UniqueKey};
pub use generator::Generator;
pub use repository::{ReadRepository, Repository, TargetUrlRecord, Transaction};
pub use shortener::Shortener;
