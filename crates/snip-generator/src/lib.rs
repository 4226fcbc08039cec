//! Alias integer generators.
//!
//! [`RandomGenerator`] is the production generator: it draws uniformly from
//! a range derived once from the configured alias lengths. [`SeqGenerator`]
//! hands out consecutive integers and is meant for fixtures and tests.

pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;
pub use snip_core::Generator;
