//! Positional numeral system used to write alias integers as short strings.
//!
//! The digits are taken from [`ALPHABET`], so an alias string is simply the
//! base-[`BASE`] representation of its integer, most significant digit first.
//! Changing the alphabet changes the meaning of every alias ever issued.

use crate::error::{CoreError, Result};

/// Characters used as digits, in ascending digit value.
///
/// Digits and lowercase ASCII letters, without `l` which is too easily
/// confused with `1`. The characters are sorted by code point, which lets
/// [`decode`] look digits up with a binary search.
pub const ALPHABET: &str = "0123456789abcdefghijkmnopqrstuvwxyz";

/// The radix of the numeral system.
pub const BASE: u64 = ALPHABET.len() as u64;

/// The largest alias integer that can be stored.
///
/// Backends keep aliases in signed 64-bit columns.
pub const MAX_ALIAS_INTEGER: u64 = i64::MAX as u64;

const DIGITS: &[u8] = ALPHABET.as_bytes();

/// Writes `integer` as a numeral over [`ALPHABET`].
///
/// Zero is written as the first character of the alphabet; any other value
/// has no leading zero digits. Only integers up to [`MAX_ALIAS_INTEGER`]
/// are aliases, and only their numerals are accepted by [`decode`].
pub fn encode(mut integer: u64) -> String {
    let mut digits = Vec::with_capacity(13);
    loop {
        digits.push(DIGITS[(integer % BASE) as usize]);
        integer /= BASE;
        if integer == 0 {
            break;
        }
    }
    digits.iter().rev().map(|&digit| digit as char).collect()
}

/// Reads `string` as a numeral over [`ALPHABET`].
///
/// Leading zero digits are accepted and do not change the value.
///
/// # Errors
///
/// Returns [`CoreError::InvalidAlias`] if the string is empty, contains a
/// character outside the alphabet, or denotes a value above
/// [`MAX_ALIAS_INTEGER`].
pub fn decode(string: &str) -> Result<u64> {
    if string.is_empty() {
        return Err(CoreError::InvalidAlias(
            "alias cannot be empty".to_string(),
        ));
    }

    let mut value: u64 = 0;
    for character in string.chars() {
        let digit = digit_value(character).ok_or_else(|| {
            CoreError::InvalidAlias(format!(
                "the character '{}' is not used in aliases: '{}'",
                character, string
            ))
        })?;
        value = value
            .checked_mul(BASE)
            .and_then(|shifted| shifted.checked_add(digit))
            .filter(|value| *value <= MAX_ALIAS_INTEGER)
            .ok_or_else(|| {
                CoreError::InvalidAlias(format!("alias is out of range: '{}'", string))
            })?;
    }
    Ok(value)
}

/// Returns `true` if every character of `string` is an alias digit.
pub fn is_alias_string(string: &str) -> bool {
    !string.is_empty() && string.chars().all(|c| digit_value(c).is_some())
}

/// Returns `BASE` raised to `exponent`, or `None` on `u64` overflow.
pub fn base_pow(exponent: u64) -> Option<u64> {
    let exponent = u32::try_from(exponent).ok()?;
    BASE.checked_pow(exponent)
}

fn digit_value(character: char) -> Option<u64> {
    if !character.is_ascii() {
        return None;
    }
    DIGITS
        .binary_search(&(character as u8))
        .ok()
        .map(|index| index as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn alphabet_is_sorted_and_unique() {
        assert!(DIGITS.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(BASE, 35);
        assert!(!ALPHABET.contains('l'));
    }

    #[test]
    fn zero_is_first_character() {
        assert_eq!(encode(0), "0");
        assert_eq!(decode("0").unwrap(), 0);
    }

    #[test]
    fn encodes_positional_digits() {
        assert_eq!(encode(9), "9");
        assert_eq!(encode(10), "a");
        assert_eq!(encode(34), "z");
        assert_eq!(encode(35), "10");
        assert_eq!(encode(35 * 35 - 1), "zz");
    }

    #[test]
    fn skips_ambiguous_letter() {
        assert_eq!(encode(20), "k");
        assert_eq!(encode(21), "m");
        assert!(decode("l").is_err());
    }

    #[test]
    fn leading_zero_digits_are_ignored() {
        assert_eq!(decode("00a").unwrap(), decode("a").unwrap());
        assert_eq!(decode("000").unwrap(), 0);
    }

    #[test]
    fn rejects_empty_string() {
        assert!(matches!(decode(""), Err(CoreError::InvalidAlias(_))));
    }

    #[test]
    fn rejects_foreign_characters() {
        assert!(matches!(decode("ABC"), Err(CoreError::InvalidAlias(_))));
        assert!(matches!(decode("ab-c"), Err(CoreError::InvalidAlias(_))));
        assert!(matches!(decode("zß"), Err(CoreError::InvalidAlias(_))));
    }

    #[test]
    fn rejects_values_above_storable_maximum() {
        let largest = encode(MAX_ALIAS_INTEGER);
        assert_eq!(decode(&largest).unwrap(), MAX_ALIAS_INTEGER);
        assert!(matches!(
            decode(&"z".repeat(largest.len() + 1)),
            Err(CoreError::InvalidAlias(_))
        ));
    }

    #[test]
    fn base_pow_reports_overflow() {
        assert_eq!(base_pow(0), Some(1));
        assert_eq!(base_pow(2), Some(1225));
        assert_eq!(base_pow(64), None);
    }

    #[test]
    fn round_trips_small_integers() {
        for n in 0..100_000 {
            assert_eq!(decode(&encode(n)).unwrap(), n);
        }
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(n in 0..=MAX_ALIAS_INTEGER) {
            prop_assert_eq!(decode(&encode(n)).unwrap(), n);
        }

        #[test]
        fn encode_normalizes_decoded_strings(s in "[0-9a-km-z]{1,12}") {
            let value = decode(&s).unwrap();
            let normalized = encode(value);
            prop_assert_eq!(decode(&normalized).unwrap(), value);

            let trimmed = s.trim_start_matches('0');
            let expected = if trimmed.is_empty() { "0" } else { trimmed };
            prop_assert_eq!(normalized.as_str(), expected);
        }
    }
}
