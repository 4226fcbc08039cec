use crate::codec::{self, MAX_ALIAS_INTEGER};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

/// A short identifier of a target URL.
///
/// An alias has two representations: a canonical non-negative integer,
/// used for storage and comparison, and a string over
/// [`ALPHABET`](crate::codec::ALPHABET), used in short URLs. The string is
/// derived from the integer the first time it is needed and cached.
///
/// Equality, ordering and hashing only consider the integer.
#[derive(Clone)]
pub struct Alias {
    integer: u64,
    string: OnceLock<String>,
}

impl Alias {
    /// Creates an alias from exactly one of its representations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAlias`] if both or neither argument is
    /// given, if the string contains characters outside the alphabet, or if
    /// the integer is larger than [`MAX_ALIAS_INTEGER`].
    pub fn new(integer: Option<u64>, string: Option<&str>) -> Result<Self> {
        match (integer, string) {
            (Some(_), Some(_)) => Err(CoreError::InvalidAlias(
                "an alias is built from either an integer or a string, not both".to_string(),
            )),
            (None, None) => Err(CoreError::InvalidAlias(
                "the string and integer arguments cannot both be empty".to_string(),
            )),
            (Some(integer), None) => Self::from_integer(integer),
            (None, Some(string)) => Self::from_string(string),
        }
    }

    /// Creates an alias from its integer value.
    ///
    /// The string form is computed lazily.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAlias`] if the integer is larger than
    /// [`MAX_ALIAS_INTEGER`], since its string could not be decoded back.
    pub fn from_integer(integer: u64) -> Result<Self> {
        if integer > MAX_ALIAS_INTEGER {
            return Err(CoreError::InvalidAlias(format!(
                "alias integer {} is out of range",
                integer
            )));
        }
        Ok(Self::in_range(integer))
    }

    /// `integer` must not exceed [`MAX_ALIAS_INTEGER`].
    pub(crate) fn in_range(integer: u64) -> Self {
        debug_assert!(integer <= MAX_ALIAS_INTEGER);
        Self {
            integer,
            string: OnceLock::new(),
        }
    }

    /// Creates an alias by decoding its string form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAlias`] if the string is empty or is not
    /// a numeral over the alias alphabet.
    pub fn from_string(string: &str) -> Result<Self> {
        let integer = codec::decode(string)?;
        let alias = Self::in_range(integer);
        // Strings with leading zero digits are valid input, but the cached
        // form must stay canonical.
        if string == "0" || !string.starts_with('0') {
            let _ = alias.string.set(string.to_owned());
        }
        Ok(alias)
    }

    /// Returns the canonical integer value.
    pub fn integer(&self) -> u64 {
        self.integer
    }

    /// Returns the string form, computing it on first use.
    pub fn as_str(&self) -> &str {
        self.string.get_or_init(|| codec::encode(self.integer))
    }

    /// Generates the full short URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }
}

impl PartialEq for Alias {
    fn eq(&self, other: &Self) -> bool {
        self.integer == other.integer
    }
}

impl Eq for Alias {}

impl Hash for Alias {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.integer.hash(state);
    }
}

impl PartialOrd for Alias {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Alias {
    fn cmp(&self, other: &Self) -> Ordering {
        self.integer.cmp(&other.integer)
    }
}

impl std::fmt::Debug for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Alias")
            .field(&self.as_str())
            .field(&self.integer)
            .finish()
    }
}

impl Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alias {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl From<Alias> for u64 {
    fn from(alias: Alias) -> Self {
        alias.integer
    }
}

impl Serialize for Alias {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Alias {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Alias::from_string(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    struct Counter(AtomicU64);

    impl Generator for Counter {
        fn next_integer(&self) -> u64 {
            self.0.fetch_add(1, AtomicOrdering::SeqCst)
        }
    }

    #[test]
    fn requires_exactly_one_representation() {
        assert!(matches!(
            Alias::new(None, None),
            Err(CoreError::InvalidAlias(_))
        ));
        assert!(matches!(
            Alias::new(Some(1), Some("1")),
            Err(CoreError::InvalidAlias(_))
        ));
        assert_eq!(Alias::new(Some(35), None).unwrap().as_str(), "10");
        assert_eq!(Alias::new(None, Some("10")).unwrap().integer(), 35);
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(matches!(
            Alias::new(None, Some("ABC")),
            Err(CoreError::InvalidAlias(_))
        ));
        assert!(Alias::from_string("hello").is_err());
        assert!(Alias::from_string("").is_err());
    }

    #[test]
    fn rejects_out_of_range_integer() {
        assert!(Alias::new(Some(u64::MAX), None).is_err());
        assert!(matches!(
            Alias::from_integer(MAX_ALIAS_INTEGER + 1),
            Err(CoreError::InvalidAlias(_))
        ));
        assert!(Alias::from_integer(u64::MAX).is_err());
    }

    #[test]
    fn largest_alias_round_trips_through_its_string() {
        let largest = Alias::from_integer(MAX_ALIAS_INTEGER).unwrap();
        let decoded = Alias::from_string(largest.as_str()).unwrap();
        assert_eq!(decoded, largest);

        let json = serde_json::to_string(&largest).unwrap();
        assert_eq!(serde_json::from_str::<Alias>(&json).unwrap(), largest);
    }

    #[test]
    fn string_is_derived_lazily() {
        let alias = Alias::from_integer(12345).unwrap();
        assert!(alias.string.get().is_none());
        assert_eq!(alias.as_str(), "a2q");
        assert_eq!(alias.string.get().map(String::as_str), Some("a2q"));
    }

    #[test]
    fn leading_zeros_are_normalized() {
        let alias = Alias::from_string("00a2q").unwrap();
        assert_eq!(alias.integer(), 12345);
        assert_eq!(alias.as_str(), "a2q");
        assert_eq!(alias, Alias::from_integer(12345).unwrap());
    }

    #[test]
    fn equality_uses_integer() {
        let from_string = Alias::from_string("a2q").unwrap();
        let from_integer = Alias::from_integer(12345).unwrap();
        assert_eq!(from_string, from_integer);
        assert!(Alias::from_integer(1).unwrap() < Alias::from_integer(2).unwrap());
    }

    #[test]
    fn create_random_draws_from_generator() {
        let generator = Counter(AtomicU64::new(35));
        assert_eq!(Alias::create_random(&generator).as_str(), "10");
        assert_eq!(Alias::create_random(&generator).as_str(), "11");
    }

    #[test]
    fn create_random_keeps_draws_decodable() {
        let generator = Counter(AtomicU64::new(MAX_ALIAS_INTEGER + 1));
        assert_eq!(Alias::create_random(&generator).integer(), 0);
        assert_eq!(Alias::create_random(&generator).integer(), 1);
    }

    #[test]
    fn to_url_joins_base() {
        let alias = Alias::from_string("abc").unwrap();
        assert_eq!(alias.to_url("https://sn.ip"), "https://sn.ip/abc");
        assert_eq!(alias.to_url("https://sn.ip/"), "https://sn.ip/abc");
    }

    #[test]
    fn serde_uses_string_form() {
        let alias = Alias::from_integer(12345).unwrap();
        let json = serde_json::to_string(&alias).unwrap();
        assert_eq!(json, "\"a2q\"");
        let back: Alias = serde_json::from_str(&json).unwrap();
        assert_eq!(back, alias);
        assert!(serde_json::from_str::<Alias>("\"NOPE\"").is_err());
    }
}
