//! In-memory locale documents and key extraction.
//!
//! A document is a tree of string leaves under named mappings. Key order is
//! the file's insertion order and survives a load/save cycle.

use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LocaleError, Result};
use crate::keypath::{KeyPath, KeySet};

/// How arrays found in a document are treated. Applied identically to every
/// document in a run so arrays never show up as spurious divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayPolicy {
    /// Arrays are a structural error.
    #[default]
    Reject,
    /// Arrays count as a single leaf and are never descended into.
    OpaqueLeaf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Leaf,
    Node,
}

pub(crate) fn classify(value: &Value, path: &str, policy: ArrayPolicy) -> Result<Shape> {
    match value {
        Value::String(_) => Ok(Shape::Leaf),
        Value::Object(_) => Ok(Shape::Node),
        Value::Array(_) if policy == ArrayPolicy::OpaqueLeaf => Ok(Shape::Leaf),
        Value::Array(_) => Err(LocaleError::structural(
            path,
            "arrays are not valid translation values",
        )),
        Value::Null => Err(LocaleError::structural(
            path,
            "null is not a valid translation value",
        )),
        Value::Bool(_) | Value::Number(_) => Err(LocaleError::structural(
            path,
            format!("expected a string or a mapping, found {value}"),
        )),
    }
}

/// Result of walking a key path through a document.
#[derive(Debug, PartialEq)]
pub enum Lookup<'a> {
    Leaf(&'a Value),
    Node(&'a Map<String, Value>),
    Absent,
    /// A leaf sits at `at` where the path needs a mapping.
    Blocked { at: KeyPath },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocaleDocument {
    tag: String,
    root: Map<String, Value>,
}

impl LocaleDocument {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            root: Map::new(),
        }
    }

    /// Wrap a parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns a structural error unless the value is a JSON object.
    pub fn from_value(tag: impl Into<String>, value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self {
                tag: tag.into(),
                root,
            }),
            _ => Err(LocaleError::structural(
                "",
                "document root must be a JSON object",
            )),
        }
    }

    /// Parse document text that did not come from a file.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::Parse`] for malformed JSON and a structural error
    /// for a non-object root.
    pub fn from_json_str(tag: impl Into<String>, text: &str) -> Result<Self> {
        let tag = tag.into();
        let value = serde_json::from_str(text).map_err(|source| LocaleError::Parse {
            path: PathBuf::from(format!("<{tag}>")),
            source,
        })?;
        Self::from_value(tag, value)
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Copy of this document's tree under another locale tag.
    #[must_use]
    pub fn retagged(&self, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            root: self.root.clone(),
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn lookup(&self, path: &KeyPath) -> Lookup<'_> {
        let segments = path.segments();
        let mut current = &self.root;
        for (depth, segment) in segments.iter().enumerate() {
            let Some(value) = current.get(segment) else {
                return Lookup::Absent;
            };
            if depth + 1 == segments.len() {
                return match value {
                    Value::Object(map) => Lookup::Node(map),
                    other => Lookup::Leaf(other),
                };
            }
            match value {
                Value::Object(map) => current = map,
                _ => {
                    return Lookup::Blocked {
                        at: KeyPath::from_segments(segments[..=depth].to_vec()),
                    };
                }
            }
        }
        Lookup::Absent
    }

    #[must_use]
    pub fn get(&self, path: &KeyPath) -> Option<&Value> {
        match self.lookup(path) {
            Lookup::Leaf(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn leaf_str(&self, path: &KeyPath) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Insert a string leaf, creating intermediate mappings.
    ///
    /// Returns `Ok(false)` when a leaf already exists at `path`; existing
    /// values are never replaced.
    ///
    /// # Errors
    ///
    /// Returns a structural error when a leaf blocks an intermediate segment or
    /// a mapping already occupies `path`.
    pub fn insert_leaf(&mut self, path: &KeyPath, value: impl Into<String>) -> Result<bool> {
        let (last, parent) = self.parent_map_mut(path)?;
        match parent.get(&last) {
            Some(Value::Object(_)) => Err(LocaleError::structural(
                path.to_string(),
                "a mapping already occupies this key; refusing to replace it with a string",
            )),
            Some(_) => Ok(false),
            None => {
                parent.insert(last, Value::String(value.into()));
                Ok(true)
            }
        }
    }

    /// Place an arbitrary subtree at an unoccupied path.
    ///
    /// # Errors
    ///
    /// Returns a structural error when anything already occupies `path` or a
    /// leaf blocks an intermediate segment.
    pub fn place(&mut self, path: &KeyPath, value: Value) -> Result<()> {
        let (last, parent) = self.parent_map_mut(path)?;
        if parent.contains_key(&last) {
            return Err(LocaleError::structural(
                path.to_string(),
                "destination is already occupied",
            ));
        }
        parent.insert(last, value);
        Ok(())
    }

    /// Remove the value at `path`, keeping the order of its siblings.
    pub fn remove(&mut self, path: &KeyPath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut current = &mut self.root;
        for segment in parents {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.shift_remove(last)
    }

    /// Rename the final segment of `path` in place, keeping its position.
    ///
    /// Returns `Ok(false)` when `path` does not exist.
    ///
    /// # Errors
    ///
    /// Returns a structural error when a sibling named `new_name` already exists.
    pub fn rename(&mut self, path: &KeyPath, new_name: &str) -> Result<bool> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Ok(false);
        };
        let mut current = &mut self.root;
        for segment in parents {
            match current.get_mut(segment).and_then(Value::as_object_mut) {
                Some(map) => current = map,
                None => return Ok(false),
            }
        }
        if !current.contains_key(last) {
            return Ok(false);
        }
        if last != new_name && current.contains_key(new_name) {
            let target = path.parent().map_or_else(
                || new_name.to_string(),
                |parent| parent.child(new_name).to_string(),
            );
            return Err(LocaleError::structural(target, "rename target already exists"));
        }
        let entries = std::mem::take(current);
        *current = entries
            .into_iter()
            .map(|(key, value)| {
                if &key == last {
                    (new_name.to_string(), value)
                } else {
                    (key, value)
                }
            })
            .collect();
        Ok(true)
    }

    fn parent_map_mut(&mut self, path: &KeyPath) -> Result<(String, &mut Map<String, Value>)> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(LocaleError::InvalidKeyPath {
                input: String::new(),
            });
        };
        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(map) => current = map,
                _ => {
                    return Err(LocaleError::structural(
                        parents[..=depth].join("."),
                        format!("a leaf blocks the mapping needed for '{path}'"),
                    ));
                }
            }
        }
        Ok((last.clone(), current))
    }

    /// Every leaf's key path, depth-first in insertion order.
    ///
    /// # Errors
    ///
    /// See [`extract_keys`].
    pub fn keys(&self, policy: ArrayPolicy) -> Result<Vec<KeyPath>> {
        extract_keys(self, policy)
    }

    /// # Errors
    ///
    /// See [`extract_keys`].
    pub fn key_set(&self, policy: ArrayPolicy) -> Result<KeySet> {
        Ok(self.keys(policy)?.into_iter().collect())
    }

    /// Copy with every mapping's keys sorted, recursively.
    #[must_use]
    pub fn sorted(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            root: sort_map(&self.root),
        }
    }

    /// Two-space indented JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::Serialize`] if `serde_json` rejects the tree.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut text =
            serde_json::to_string_pretty(&self.root).map_err(|source| LocaleError::Serialize {
                tag: self.tag.clone(),
                source,
            })?;
        text.push('\n');
        Ok(text)
    }
}

fn sort_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| {
            let value = match &map[key] {
                Value::Object(inner) => Value::Object(sort_map(inner)),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Enumerate every leaf of `doc` as a [`KeyPath`].
///
/// Empty mappings contribute nothing.
///
/// # Errors
///
/// Returns a structural error for null, boolean or numeric values, for arrays
/// under [`ArrayPolicy::Reject`], and for segments that are empty or contain
/// `.` (they cannot be addressed by a dotted path).
pub fn extract_keys(doc: &LocaleDocument, policy: ArrayPolicy) -> Result<Vec<KeyPath>> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    walk(&doc.root, &mut prefix, policy, &mut out)?;
    debug!("extracted {} keys from '{}'", out.len(), doc.tag);
    Ok(out)
}

pub(crate) fn walk(
    map: &Map<String, Value>,
    prefix: &mut Vec<String>,
    policy: ArrayPolicy,
    out: &mut Vec<KeyPath>,
) -> Result<()> {
    for (key, value) in map {
        prefix.push(key.clone());
        let path = prefix.join(".");
        if key.is_empty() || key.contains('.') {
            return Err(LocaleError::structural(
                path,
                "segment cannot be addressed by a dotted key path",
            ));
        }
        match classify(value, &path, policy)? {
            Shape::Leaf => out.push(KeyPath::from_segments(prefix.clone())),
            Shape::Node => {
                if let Value::Object(inner) = value {
                    walk(inner, prefix, policy, out)?;
                }
            }
        }
        prefix.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> LocaleDocument {
        LocaleDocument::from_value("en", value).unwrap()
    }

    fn key(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    fn names(keys: &[KeyPath]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn extraction_follows_insertion_order() {
        let d = doc(json!({
            "Zeta": {"b": "B", "a": "A"},
            "Alpha": "top",
            "Empty": {}
        }));
        let keys = d.keys(ArrayPolicy::Reject).unwrap();
        assert_eq!(names(&keys), vec!["Zeta.b", "Zeta.a", "Alpha"]);
    }

    #[test]
    fn extraction_rejects_null_and_numbers() {
        let err = doc(json!({"Docs": {"title": null}}))
            .keys(ArrayPolicy::Reject)
            .unwrap_err();
        assert!(err.to_string().contains("Docs.title"));

        let err = doc(json!({"count": 3})).keys(ArrayPolicy::OpaqueLeaf).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn array_policy_is_applied_as_configured() {
        let d = doc(json!({"list": ["a", "b"], "x": "y"}));
        assert!(d.keys(ArrayPolicy::Reject).is_err());
        let keys = d.keys(ArrayPolicy::OpaqueLeaf).unwrap();
        assert_eq!(names(&keys), vec!["list", "x"]);
    }

    #[test]
    fn extraction_rejects_dotted_segments() {
        let err = doc(json!({"a.b": "c"})).keys(ArrayPolicy::Reject).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn root_must_be_object() {
        assert!(LocaleDocument::from_value("en", json!(["x"])).is_err());
        assert!(matches!(
            LocaleDocument::from_json_str("en", "{not json"),
            Err(LocaleError::Parse { .. })
        ));
    }

    #[test]
    fn lookup_distinguishes_leaf_node_absent_and_blocked() {
        let d = doc(json!({"Docs": {"title": "Guide", "sidebar": {}}}));
        assert_eq!(d.lookup(&key("Docs.title")), Lookup::Leaf(&json!("Guide")));
        assert!(matches!(d.lookup(&key("Docs.sidebar")), Lookup::Node(_)));
        assert_eq!(d.lookup(&key("Docs.missing")), Lookup::Absent);
        assert_eq!(
            d.lookup(&key("Docs.title.deeper")),
            Lookup::Blocked {
                at: key("Docs.title")
            }
        );
    }

    #[test]
    fn insert_leaf_creates_parents_and_never_overwrites() {
        let mut d = doc(json!({"Docs": {"title": "Guide"}}));
        assert!(d.insert_leaf(&key("Docs.sidebar.quickLinks"), "Quick Links").unwrap());
        assert!(!d.insert_leaf(&key("Docs.title"), "Other").unwrap());
        assert_eq!(d.leaf_str(&key("Docs.title")), Some("Guide"));
        assert_eq!(
            d.leaf_str(&key("Docs.sidebar.quickLinks")),
            Some("Quick Links")
        );
    }

    #[test]
    fn insert_leaf_reports_collisions() {
        let mut d = doc(json!({"Docs": {"title": "Guide"}}));
        let err = d.insert_leaf(&key("Docs.title.sub"), "x").unwrap_err();
        assert!(err.to_string().contains("'Docs.title'"));
        let err = d.insert_leaf(&key("Docs"), "x").unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn remove_keeps_sibling_order() {
        let mut d = doc(json!({"a": "1", "b": "2", "c": "3"}));
        assert_eq!(d.remove(&key("a")), Some(json!("1")));
        assert_eq!(names(&d.keys(ArrayPolicy::Reject).unwrap()), vec!["b", "c"]);
        assert_eq!(d.remove(&key("zz.top")), None);
    }

    #[test]
    fn rename_keeps_position() {
        let mut d = doc(json!({"Nav": {"a": "1", "b": "2", "c": "3"}}));
        assert!(d.rename(&key("Nav.b"), "beta").unwrap());
        assert_eq!(
            names(&d.keys(ArrayPolicy::Reject).unwrap()),
            vec!["Nav.a", "Nav.beta", "Nav.c"]
        );
        assert!(!d.rename(&key("Nav.missing"), "x").unwrap());
        assert!(d.rename(&key("Nav.a"), "c").is_err());
    }

    #[test]
    fn sorted_orders_recursively() {
        let d = doc(json!({"b": {"z": "1", "y": "2"}, "a": "3"}));
        let sorted = d.sorted();
        assert_eq!(
            names(&sorted.keys(ArrayPolicy::Reject).unwrap()),
            vec!["a", "b.y", "b.z"]
        );
    }

    #[test]
    fn pretty_json_ends_with_newline() {
        let d = doc(json!({"a": "b"}));
        assert_eq!(d.to_pretty_json().unwrap(), "{\n  \"a\": \"b\"\n}\n");
    }
}
