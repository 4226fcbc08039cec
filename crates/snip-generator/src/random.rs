use rand::Rng;
use snip_core::codec::{self, MAX_ALIAS_INTEGER};
use snip_core::error::{CoreError, Result};
use snip_core::Generator;

/// The smallest upper bound a generator may draw up to.
///
/// Whatever lengths are configured, new aliases are drawn from at least the
/// range of a 32-bit unsigned integer, so a short `max_length` can't leave
/// the generator with only a handful of values to pick from.
pub const MIN_UPPER_BOUND: u64 = 0xFFFF_FFFF;

/// Draws alias integers uniformly from a range derived from alias lengths.
///
/// The only way to obtain a generator is [`RandomGenerator::configure`], so
/// there is no unconfigured state to guard against. Once built, the bounds
/// never change and the generator can be shared freely between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomGenerator {
    min_length: i64,
    max_length: i64,
    min_new_int: u64,
    max_new_int: u64,
}

impl RandomGenerator {
    /// Derives the draw range from the lengths of new alias strings.
    ///
    /// The lower bound is the smallest integer written with `min_length`
    /// digits (zero when `min_length` is at most one). The upper bound is
    /// the largest integer written with `max_length` digits, raised to
    /// [`MIN_UPPER_BOUND`] if smaller and capped at
    /// [`MAX_ALIAS_INTEGER`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAliasLength`] if either length is
    /// negative, if `min_length > max_length`, or if the shortest allowed
    /// alias already exceeds [`MAX_ALIAS_INTEGER`].
    pub fn configure(min_length: i64, max_length: i64) -> Result<Self> {
        if min_length < 0 || max_length < 0 || min_length > max_length {
            return Err(CoreError::InvalidAliasLength(format!(
                "the condition 0 <= min_length <= max_length is not fulfilled \
                 for min_length = {} and max_length = {}",
                min_length, max_length
            )));
        }

        let min_new_int = if min_length <= 1 {
            0
        } else {
            codec::base_pow(min_length as u64 - 1)
                .filter(|value| *value <= MAX_ALIAS_INTEGER)
                .ok_or_else(|| {
                    CoreError::InvalidAliasLength(format!(
                        "aliases of {} characters are too large to be stored",
                        min_length
                    ))
                })?
        };

        let max_new_int = codec::base_pow(max_length as u64)
            .map(|power| power - 1)
            .unwrap_or(u64::MAX)
            .max(MIN_UPPER_BOUND)
            .min(MAX_ALIAS_INTEGER);

        Ok(Self {
            min_length,
            max_length,
            min_new_int,
            max_new_int,
        })
    }

    pub fn min_length(&self) -> i64 {
        self.min_length
    }

    pub fn max_length(&self) -> i64 {
        self.max_length
    }

    /// The smallest integer this generator can draw.
    pub fn min_new_int(&self) -> u64 {
        self.min_new_int
    }

    /// The largest integer this generator can draw.
    pub fn max_new_int(&self) -> u64 {
        self.max_new_int
    }
}

impl Generator for RandomGenerator {
    fn next_integer(&self) -> u64 {
        rand::rng().random_range(self.min_new_int..=self.max_new_int)
    }
}
