use crate::alias::Alias;
use crate::codec::MAX_ALIAS_INTEGER;

/// Trait for drawing integers for new aliases.
///
/// Implementations are pure generators that don't interact with storage.
/// They don't promise uniqueness: a collision is detected when the record
/// carrying the alias is committed, and resolved there.
pub trait Generator: Send + Sync + 'static {
    /// Returns the integer for the next new alias, at most
    /// [`MAX_ALIAS_INTEGER`].
    fn next_integer(&self) -> u64;
}

impl<G: Generator + ?Sized> Generator for std::sync::Arc<G> {
    fn next_integer(&self) -> u64 {
        (**self).next_integer()
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn next_integer(&self) -> u64 {
        (**self).next_integer()
    }
}

impl Alias {
    /// Creates an alias from the next integer drawn by `generator`.
    ///
    /// Successive calls are independent draws and may repeat. Draws above
    /// [`MAX_ALIAS_INTEGER`] have their top bit cleared.
    pub fn create_random<G: Generator + ?Sized>(generator: &G) -> Self {
        Alias::in_range(generator.next_integer() & MAX_ALIAS_INTEGER)
    }
}
