//! CI gate: every statically known lookup must exist in the canonical document.

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Lookup, LocaleDocument};
use crate::error::{LocaleError, Result};
use crate::keypath::KeyPath;

/// Marker the source scanner prefixes to references it could not resolve.
pub const LITERAL_MARKER: &str = "__LITERAL__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// A literal dotted key known at scan time.
    #[default]
    Exact,
    /// Not statically resolvable; exempt from the gate.
    LiteralFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReference {
    pub key: String,
    #[serde(default)]
    pub kind: ReferenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl UsageReference {
    #[must_use]
    pub fn exact(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: ReferenceKind::Exact,
            file: None,
            line: None,
        }
    }

    #[must_use]
    pub fn literal(key: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::LiteralFallback,
            ..Self::exact(key)
        }
    }

    #[must_use]
    pub fn is_exempt(&self) -> bool {
        self.kind == ReferenceKind::LiteralFallback || self.key.starts_with(LITERAL_MARKER)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Wrapped { references: Vec<UsageReference> },
    Bare(Vec<UsageReference>),
}

/// Pre-extracted usage references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageManifest {
    pub references: Vec<UsageReference>,
}

impl UsageManifest {
    /// Accepts `{"references": [...]}` or a bare array.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when neither shape matches.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let references = match serde_json::from_str(json)? {
            ManifestFile::Wrapped { references } | ManifestFile::Bare(references) => references,
        };
        Ok(Self { references })
    }

    /// # Errors
    ///
    /// Returns [`LocaleError::MissingFile`], [`LocaleError::Io`] or
    /// [`LocaleError::Parse`] naming `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(LocaleError::MissingFile {
                tag: "usage manifest".to_string(),
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| LocaleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| LocaleError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub passed: bool,
    /// Dotted keys referenced as exact but not resolving to a canonical leaf,
    /// de-duplicated in manifest order.
    pub missing: Vec<String>,
    pub checked: usize,
    pub exempted: usize,
}

/// Only a string leaf renders as a message.
fn resolves(canonical: &LocaleDocument, key: &str) -> bool {
    KeyPath::parse(key)
        .is_ok_and(|path| matches!(canonical.lookup(&path), Lookup::Leaf(Value::String(_))))
}

/// Check every exact reference against the canonical document.
///
/// A key that walks to a mapping names a namespace, not a string, and is
/// reported as missing. So is a number, boolean or `null` leaf.
#[must_use]
pub fn gate(references: &[UsageReference], canonical: &LocaleDocument) -> GateResult {
    let mut seen = HashSet::new();
    let mut result = GateResult::default();
    for reference in references {
        if reference.is_exempt() {
            result.exempted += 1;
            continue;
        }
        result.checked += 1;
        if !resolves(canonical, &reference.key) && seen.insert(reference.key.as_str()) {
            debug!("missing canonical key '{}'", reference.key);
            result.missing.push(reference.key.clone());
        }
    }
    result.passed = result.missing.is_empty();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> LocaleDocument {
        LocaleDocument::from_value(
            "en",
            json!({"Docs": {"title": "Guide", "sidebar": {"quickLinks": "Quick Links"}}}),
        )
        .unwrap()
    }

    #[test]
    fn passes_when_all_exact_references_resolve() {
        let refs = vec![
            UsageReference::exact("Docs.title"),
            UsageReference::exact("Docs.sidebar.quickLinks"),
        ];
        let result = gate(&refs, &canonical());
        assert!(result.passed);
        assert!(result.missing.is_empty());
        assert_eq!(result.checked, 2);
    }

    #[test]
    fn non_string_leaves_do_not_satisfy_references() {
        let canonical = LocaleDocument::from_value(
            "en",
            json!({"Stats": {"count": 3, "empty": null, "on": true, "label": "Stats"}}),
        )
        .unwrap();
        let refs = vec![
            UsageReference::exact("Stats.count"),
            UsageReference::exact("Stats.empty"),
            UsageReference::exact("Stats.on"),
            UsageReference::exact("Stats.label"),
        ];
        let result = gate(&refs, &canonical);
        assert!(!result.passed);
        assert_eq!(result.missing, vec!["Stats.count", "Stats.empty", "Stats.on"]);
    }

    #[test]
    fn one_absent_exact_reference_fails() {
        let refs = vec![
            UsageReference::exact("Docs.title"),
            UsageReference::exact("Docs.footer"),
            UsageReference::exact("Docs.footer"),
        ];
        let result = gate(&refs, &canonical());
        assert!(!result.passed);
        assert_eq!(result.missing, vec!["Docs.footer"]);
    }

    #[test]
    fn literal_fallbacks_are_exempt() {
        let refs = vec![
            UsageReference::literal("title"),
            UsageReference::exact("__LITERAL__subtitle"),
        ];
        let result = gate(&refs, &canonical());
        assert!(result.passed);
        assert_eq!(result.exempted, 2);
        assert_eq!(result.checked, 0);
    }

    #[test]
    fn namespaces_and_blocked_paths_are_missing() {
        let refs = vec![
            UsageReference::exact("Docs.sidebar"),
            UsageReference::exact("Docs.title.more"),
            UsageReference::exact("Docs..title"),
        ];
        let result = gate(&refs, &canonical());
        assert_eq!(
            result.missing,
            vec!["Docs.sidebar", "Docs.title.more", "Docs..title"]
        );
    }

    #[test]
    fn manifest_accepts_wrapped_and_bare_shapes() {
        let wrapped = UsageManifest::from_json(
            r#"{"references": [{"key": "Docs.title", "kind": "exact", "file": "src/page.tsx", "line": 4}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.references[0].line, Some(4));

        let bare =
            UsageManifest::from_json(r#"[{"key": "x", "kind": "literal-fallback"}, {"key": "y"}]"#)
                .unwrap();
        assert_eq!(bare.references[0].kind, ReferenceKind::LiteralFallback);
        assert_eq!(bare.references[1].kind, ReferenceKind::Exact);
    }
}
