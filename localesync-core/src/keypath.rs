use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LocaleError;

/// Dot-separated address of one leaf, e.g. `Docs.sidebar.title`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Parse a dotted key.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::InvalidKeyPath`] for empty input or empty segments (`a..b`).
    pub fn parse(input: &str) -> Result<Self, LocaleError> {
        if input.is_empty() || input.split('.').any(str::is_empty) {
            return Err(LocaleError::InvalidKeyPath {
                input: input.to_string(),
            });
        }
        Ok(Self(input.split('.').map(str::to_string).collect()))
    }

    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final segment; the leaf's own name.
    #[must_use]
    pub fn last(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_vec()))
    }

    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyPath {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyPath> for String {
    fn from(value: KeyPath) -> Self {
        value.to_string()
    }
}

/// Ordered, de-duplicated key collection with constant-time membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    ordered: Vec<KeyPath>,
    index: HashSet<KeyPath>,
}

impl KeySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the key was already present.
    pub fn insert(&mut self, key: KeyPath) -> bool {
        if self.index.insert(key.clone()) {
            self.ordered.push(key);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, key: &KeyPath) -> bool {
        self.index.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPath> {
        self.ordered.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<KeyPath> {
        self.ordered
    }
}

impl FromIterator<KeyPath> for KeySet {
    fn from_iter<T: IntoIterator<Item = KeyPath>>(iter: T) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a KeyPath;
    type IntoIter = std::slice::Iter<'a, KeyPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    #[test]
    fn parse_and_display_round_trip_dotted_form() {
        let path = key("Docs.sidebar.quickLinks");
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), "quickLinks");
        assert_eq!(path.to_string(), "Docs.sidebar.quickLinks");
        assert_eq!(path.parent(), Some(key("Docs.sidebar")));
        assert_eq!(key("Docs").parent(), None);
    }

    #[test]
    fn parse_rejects_empty_segments() {
        for bad in ["", ".", "a..b", "a.", ".a"] {
            assert!(
                matches!(KeyPath::parse(bad), Err(LocaleError::InvalidKeyPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let path = key("Header.nav.docs");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"Header.nav.docs\"");
        let back: KeyPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<KeyPath>("\"a..b\"").is_err());
    }

    #[test]
    fn key_set_keeps_first_insertion_order() {
        let set: KeySet = ["b", "a", "b", "c"].into_iter().map(key).collect();
        let order: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert!(set.contains(&key("a")));
        assert!(!set.contains(&key("d")));
    }

    #[test]
    fn child_and_prefix() {
        let base = key("Docs");
        let nested = base.child("title");
        assert_eq!(nested, key("Docs.title"));
        assert!(nested.starts_with(&base));
        assert!(!base.starts_with(&nested));
    }
}
