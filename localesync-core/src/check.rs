//! Key-set comparison between the canonical document and each target.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::LocaleConfig;
use crate::document::{ArrayPolicy, LocaleDocument};
use crate::error::Result;
use crate::keypath::{KeyPath, KeySet};
use crate::store::LocaleStore;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[TODO\]|TBD|\[MISSING\]|^\[TODO_TRANSLATE\]").expect("valid placeholder regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Diverged,
    Failed,
}

/// Keys the target lacks and keys only the target has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub missing: Vec<KeyPath>,
    pub orphaned: Vec<KeyPath>,
}

impl Divergence {
    /// Orphans are tolerated; only missing keys fail a locale.
    #[must_use]
    pub fn status(&self) -> CheckStatus {
        if self.missing.is_empty() {
            CheckStatus::Ok
        } else {
            CheckStatus::Diverged
        }
    }
}

/// `missing = canonical - target`, `orphaned = target - canonical`.
#[must_use]
pub fn check(canonical: &KeySet, target: &KeySet) -> Divergence {
    Divergence {
        missing: canonical
            .iter()
            .filter(|key| !target.contains(key))
            .cloned()
            .collect(),
        orphaned: target
            .iter()
            .filter(|key| !canonical.contains(key))
            .cloned()
            .collect(),
    }
}

/// Whether a leaf value still looks like a stand-in rather than a translation.
#[must_use]
pub fn is_placeholder(value: &str, key: &KeyPath) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || PLACEHOLDER.is_match(trimmed) || trimmed == key.last()
}

/// Keys of `doc` whose string value is a placeholder, in document order.
///
/// # Errors
///
/// Propagates structural errors from key extraction.
pub fn placeholder_keys(doc: &LocaleDocument, policy: ArrayPolicy) -> Result<Vec<KeyPath>> {
    Ok(doc
        .keys(policy)?
        .into_iter()
        .filter(|key| {
            doc.leaf_str(key)
                .is_some_and(|value| is_placeholder(value, key))
        })
        .collect())
}

/// Per-locale outcome of a consistency run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleCheck {
    pub tag: String,
    pub status: CheckStatus,
    pub missing: Vec<KeyPath>,
    pub orphaned: Vec<KeyPath>,
    pub untranslated: Vec<KeyPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocaleCheck {
    fn failed(tag: &str, error: String) -> Self {
        Self {
            tag: tag.to_string(),
            status: CheckStatus::Failed,
            missing: Vec::new(),
            orphaned: Vec::new(),
            untranslated: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyRun {
    pub canonical: String,
    pub canonical_keys: usize,
    pub locales: Vec<LocaleCheck>,
}

impl ConsistencyRun {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.locales.iter().all(LocaleCheck::passed)
    }
}

/// Compare one loaded target against canonical keys.
///
/// # Errors
///
/// Propagates structural errors from extracting the target's keys.
pub fn check_document(
    canonical: &KeySet,
    target: &LocaleDocument,
    policy: ArrayPolicy,
) -> Result<LocaleCheck> {
    let keys = target.key_set(policy)?;
    let divergence = check(canonical, &keys);
    let untranslated = placeholder_keys(target, policy)?;
    if !divergence.orphaned.is_empty() {
        warn!(
            "locale '{}' carries {} orphaned keys",
            target.tag(),
            divergence.orphaned.len()
        );
    }
    if !untranslated.is_empty() {
        warn!(
            "locale '{}' has {} placeholder values",
            target.tag(),
            untranslated.len()
        );
    }
    Ok(LocaleCheck {
        tag: target.tag().to_string(),
        status: divergence.status(),
        missing: divergence.missing,
        orphaned: divergence.orphaned,
        untranslated,
        error: None,
    })
}

/// Check every configured target. A broken target is reported as
/// [`CheckStatus::Failed`] and does not stop the others.
///
/// # Errors
///
/// Fails only when the canonical document itself cannot be loaded or is
/// structurally invalid.
pub fn check_locales(config: &LocaleConfig, store: &LocaleStore) -> Result<ConsistencyRun> {
    let canonical = store.load(&config.canonical)?;
    let canonical_keys = canonical.key_set(config.array_policy)?;
    debug!(
        "canonical '{}' has {} keys",
        config.canonical,
        canonical_keys.len()
    );

    let locales = config
        .targets
        .iter()
        .map(|tag| {
            store
                .load(tag)
                .and_then(|doc| check_document(&canonical_keys, &doc, config.array_policy))
                .unwrap_or_else(|err| LocaleCheck::failed(tag, err.to_string()))
        })
        .collect();

    Ok(ConsistencyRun {
        canonical: config.canonical.clone(),
        canonical_keys: canonical_keys.len(),
        locales,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(items: &[&str]) -> KeySet {
        items.iter().map(|k| KeyPath::parse(k).unwrap()).collect()
    }

    fn names(keys: &[KeyPath]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn missing_and_orphaned_are_set_differences() {
        let canonical = keys(&["a", "b.c", "b.d"]);
        let target = keys(&["b.d", "a", "legacy"]);
        let divergence = check(&canonical, &target);
        assert_eq!(names(&divergence.missing), vec!["b.c"]);
        assert_eq!(names(&divergence.orphaned), vec!["legacy"]);
        assert_eq!(divergence.status(), CheckStatus::Diverged);
    }

    #[test]
    fn identical_sets_are_ok() {
        let set = keys(&["x.y", "z"]);
        let divergence = check(&set, &set);
        assert!(divergence.missing.is_empty());
        assert!(divergence.orphaned.is_empty());
        assert_eq!(divergence.status(), CheckStatus::Ok);
    }

    #[test]
    fn orphans_alone_do_not_fail() {
        let divergence = check(&keys(&["a"]), &keys(&["a", "old"]));
        assert_eq!(divergence.status(), CheckStatus::Ok);
        assert_eq!(names(&divergence.orphaned), vec!["old"]);
    }

    #[test]
    fn placeholder_markers() {
        let key = KeyPath::parse("Docs.title").unwrap();
        for value in ["", "  ", "[TODO] translate", "TBD", "[MISSING]", "[TODO_TRANSLATE] Guide", "title"] {
            assert!(is_placeholder(value, &key), "{value:?} should be a placeholder");
        }
        for value in ["Guía", "Titre", "Title"] {
            assert!(!is_placeholder(value, &key), "{value:?} is a translation");
        }
    }

    #[test]
    fn check_document_reports_untranslated() {
        let canonical = keys(&["Docs.title", "Docs.body"]);
        let target = LocaleDocument::from_value(
            "es",
            json!({"Docs": {"title": "Guía", "body": "[TODO] cuerpo"}}),
        )
        .unwrap();
        let report = check_document(&canonical, &target, ArrayPolicy::Reject).unwrap();
        assert!(report.passed());
        assert_eq!(names(&report.untranslated), vec!["Docs.body"]);
    }
}
