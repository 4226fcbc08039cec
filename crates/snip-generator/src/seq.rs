use snip_core::Generator;
use std::sync::atomic::{AtomicU64, Ordering};

/// A generator handing out consecutive integers.
///
/// Deterministic output makes collisions reproducible: seed a store with
/// the aliases `0..n` and a generator starting at zero collides exactly `n`
/// times before it draws a free alias.
#[derive(Debug, Default)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
        }
    }
}

impl SeqGenerator {
    /// Creates a generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator starting from a specific integer.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }
}

impl Generator for SeqGenerator {
    fn next_integer(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}
