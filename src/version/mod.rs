//! Package versions and version ranges.
//!
//! A [`Version`] is a sequence of tokens separated by `.` or `-`, such as
//! `2.7.0`, `1.0-beta2` or `5`. The empty version denotes an unversioned
//! package and sorts below every other version.

mod range;

pub use range::VersionRange;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Invalid version range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("Invalid wildcard in '{0}'")]
    InvalidWildcard(String),
}

/// Alphabetic runs sort below numeric runs; numbers compare by value, then width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum SubToken {
    Alpha(String),
    Number(u64, usize),
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    parts: Vec<SubToken>,
}

impl Token {
    fn parse(text: &str) -> Option<Self> {
        if text.is_empty() || !text.chars().all(is_token_char) {
            return None;
        }

        let mut parts = Vec::new();
        let mut run = String::new();
        let mut numeric = false;
        for c in text.chars() {
            let digit = c.is_ascii_digit();
            if !run.is_empty() && digit != numeric {
                parts.push(Self::sub_token(&run, numeric)?);
                run.clear();
            }
            numeric = digit;
            run.push(c);
        }
        parts.push(Self::sub_token(&run, numeric)?);

        Some(Self {
            text: text.to_string(),
            parts,
        })
    }

    fn sub_token(run: &str, numeric: bool) -> Option<SubToken> {
        if numeric {
            let value = run.parse().ok()?;
            Some(SubToken::Number(value, run.len()))
        } else {
            Some(SubToken::Alpha(run.to_string()))
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn is_separator(c: char) -> bool {
    c == '.' || c == '-'
}

#[derive(Debug, Clone, Default)]
pub struct Version {
    tokens: Vec<Token>,
    // seps[i] sits between tokens[i] and tokens[i + 1]
    seps: Vec<char>,
}

impl Version {
    /// The empty version of an unversioned package.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidVersion(text.to_string());
        if text.is_empty() {
            return Ok(Self::empty());
        }

        let mut tokens = Vec::new();
        let mut seps = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if is_separator(c) {
                tokens.push(Token::parse(&current).ok_or_else(invalid)?);
                seps.push(c);
                current.clear();
            } else if is_token_char(c) {
                current.push(c);
            } else {
                return Err(invalid());
            }
        }
        tokens.push(Token::parse(&current).ok_or_else(invalid)?);

        Ok(Self { tokens, seps })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.text.as_str())
    }

    /// Keep the first `n` tokens.
    pub fn trim(&self, n: usize) -> Version {
        let n = n.min(self.tokens.len());
        Version {
            tokens: self.tokens[..n].to_vec(),
            seps: self.seps[..n.saturating_sub(1)].to_vec(),
        }
    }

    /// Drop the first `n` tokens.
    pub fn tail(&self, n: usize) -> Version {
        let n = n.min(self.tokens.len());
        Version {
            tokens: self.tokens[n..].to_vec(),
            seps: self.seps.get(n..).map(<[char]>::to_vec).unwrap_or_default(),
        }
    }

    /// True when `prefix` is a token-prefix of this version (including equality).
    pub fn starts_with(&self, prefix: &Version) -> bool {
        self.tokens.len() >= prefix.tokens.len()
            && self.tokens.iter().zip(&prefix.tokens).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.seps[i - 1])?;
            }
            f.write_str(&token.text)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for token in &self.tokens {
            token.parts.hash(state);
        }
        self.tokens.len().hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens.cmp(&other.tokens)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a version string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Version, E> {
                Version::parse(v).map_err(E::custom)
            }

            // YAML documents often spell single-token versions as bare integers
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Version, E> {
                Version::parse(&v.to_string()).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Version, E> {
                Version::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(VersionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(v("2.7.0").to_string(), "2.7.0");
        assert_eq!(v("1.0-beta2").to_string(), "1.0-beta2");
        assert_eq!(v("").to_string(), "");
        assert_eq!(v("2.7.0").len(), 3);
        assert!(v("").is_empty());
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["1..2", "1.", ".1", "1.*", "1 2", "a+b", "-"] {
            let err = Version::parse(text).unwrap_err();
            assert_eq!(err, VersionError::InvalidVersion(text.to_string()), "{}", text);
        }
        // Numbers that do not fit in a u64
        assert!(Version::parse("99999999999999999999999").is_err());
    }

    #[test]
    fn test_ordering() {
        let mut versions: Vec<Version> = ["2.7.0", "2.5.2", "", "2.6.8", "2.6.0", "10", "2", "2.6"]
            .iter()
            .map(|s| v(s))
            .collect();
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(
            sorted,
            vec!["", "2", "2.5.2", "2.6", "2.6.0", "2.6.8", "2.7.0", "10"]
        );
    }

    #[test]
    fn test_ordering_sub_tokens() {
        assert!(v("1.beta") < v("1.0"));
        assert!(v("1.alpha") < v("1.beta"));
        assert!(v("1.1") < v("1.01"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("1") < v("1.0"));
    }

    #[test]
    fn test_separators_do_not_affect_equality() {
        assert_eq!(v("1.0-2"), v("1.0.2"));
        assert_eq!(v("1.0-2").to_string(), "1.0-2");
    }

    #[test]
    fn test_trim_and_tail() {
        let version = v("2.1.5-rc1");
        assert_eq!(version.trim(2).to_string(), "2.1");
        assert_eq!(version.trim(10).to_string(), "2.1.5-rc1");
        assert_eq!(version.trim(0).to_string(), "");
        assert_eq!(version.tail(2).to_string(), "5-rc1");
        assert_eq!(version.tail(0).to_string(), "2.1.5-rc1");
        assert_eq!(version.tail(4).to_string(), "");
    }

    #[test]
    fn test_starts_with() {
        assert!(v("2.7.0").starts_with(&v("2.7")));
        assert!(v("2.7.0").starts_with(&v("2.7.0")));
        assert!(v("2.7.0").starts_with(&v("")));
        assert!(!v("2.70").starts_with(&v("2.7")));
        assert!(!v("2").starts_with(&v("2.7")));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("2.6.0")).unwrap();
        assert_eq!(json, "\"2.6.0\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("2.6.0"));

        let from_int: Version = serde_yaml::from_str("5").unwrap();
        assert_eq!(from_int, v("5"));
        assert!(serde_json::from_str::<Version>("\"1..2\"").is_err());
    }
}
