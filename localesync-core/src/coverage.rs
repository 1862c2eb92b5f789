//! Translation coverage per locale.

use log::debug;
use serde::Serialize;

use crate::check::{is_placeholder, placeholder_keys};
use crate::config::LocaleConfig;
use crate::document::{ArrayPolicy, LocaleDocument};
use crate::error::Result;
use crate::keypath::{KeyPath, KeySet};
use crate::store::LocaleStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocaleCoverage {
    pub tag: String,
    /// Canonical keys present in this locale.
    pub present: usize,
    pub missing: Vec<KeyPath>,
    pub untranslated: Vec<KeyPath>,
    /// Keys whose value is byte-identical to the canonical value.
    pub identical_to_canonical: Vec<KeyPath>,
    pub coverage_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocaleCoverage {
    fn failed(tag: &str, error: String) -> Self {
        Self {
            tag: tag.to_string(),
            present: 0,
            missing: Vec::new(),
            untranslated: Vec::new(),
            identical_to_canonical: Vec::new(),
            coverage_pct: 0.0,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn translated(&self) -> usize {
        self.present - self.untranslated.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub canonical: String,
    pub canonical_keys: usize,
    /// Canonical values that are themselves placeholders.
    pub canonical_placeholders: Vec<KeyPath>,
    pub locales: Vec<LocaleCoverage>,
}

impl CoverageReport {
    /// Locales under `min_pct`, including any that failed to load.
    #[must_use]
    pub fn below(&self, min_pct: f64) -> Vec<&LocaleCoverage> {
        self.locales
            .iter()
            .filter(|locale| locale.error.is_some() || locale.coverage_pct < min_pct)
            .collect()
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = part as f64 / whole as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Coverage of one target against the canonical document.
///
/// # Errors
///
/// Propagates structural errors from the target.
pub fn locale_coverage(
    canonical: &LocaleDocument,
    canonical_keys: &KeySet,
    target: &LocaleDocument,
    policy: ArrayPolicy,
) -> Result<LocaleCoverage> {
    let target_keys = target.key_set(policy)?;
    let mut present = 0;
    let mut missing = Vec::new();
    let mut untranslated = Vec::new();
    let mut identical = Vec::new();
    for key in canonical_keys {
        if !target_keys.contains(key) {
            missing.push(key.clone());
            continue;
        }
        present += 1;
        let Some(value) = target.leaf_str(key) else {
            continue;
        };
        if is_placeholder(value, key) {
            untranslated.push(key.clone());
        } else if canonical.leaf_str(key) == Some(value) {
            identical.push(key.clone());
        }
    }
    let pct = percent(present - untranslated.len(), canonical_keys.len());
    debug!("locale '{}' coverage {pct}%", target.tag());
    Ok(LocaleCoverage {
        tag: target.tag().to_string(),
        present,
        missing,
        untranslated,
        identical_to_canonical: identical,
        coverage_pct: pct,
        error: None,
    })
}

/// # Errors
///
/// Fails only when the canonical document cannot be loaded or is malformed.
pub fn coverage_locales(config: &LocaleConfig, store: &LocaleStore) -> Result<CoverageReport> {
    let canonical = store.load(&config.canonical)?;
    let canonical_keys = canonical.key_set(config.array_policy)?;
    let canonical_placeholders = placeholder_keys(&canonical, config.array_policy)?;

    let locales = config
        .targets
        .iter()
        .map(|tag| {
            store
                .load(tag)
                .and_then(|doc| {
                    locale_coverage(&canonical, &canonical_keys, &doc, config.array_policy)
                })
                .unwrap_or_else(|err| LocaleCoverage::failed(tag, err.to_string()))
        })
        .collect();

    Ok(CoverageReport {
        canonical: config.canonical.clone(),
        canonical_keys: canonical_keys.len(),
        canonical_placeholders,
        locales,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc(tag: &str, value: Value) -> LocaleDocument {
        LocaleDocument::from_value(tag, value).unwrap()
    }

    #[test]
    fn counts_translated_missing_and_placeholders() {
        let en = doc(
            "en",
            json!({"Nav": {"home": "Home", "docs": "Docs", "blog": "Blog", "about": "About"}}),
        );
        let fr = doc(
            "fr",
            json!({"Nav": {"home": "Accueil", "docs": "Docs", "blog": "[TODO] blog"}}),
        );
        let keys = en.key_set(ArrayPolicy::Reject).unwrap();
        let cov = locale_coverage(&en, &keys, &fr, ArrayPolicy::Reject).unwrap();
        assert_eq!(cov.present, 3);
        assert_eq!(cov.translated(), 2);
        assert_eq!(cov.missing.len(), 1);
        assert_eq!(cov.untranslated[0].to_string(), "Nav.blog");
        assert_eq!(cov.identical_to_canonical[0].to_string(), "Nav.docs");
        assert!((cov.coverage_pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_canonical_is_fully_covered() {
        let en = doc("en", json!({}));
        let de = doc("de", json!({"extra": "x"}));
        let cov = locale_coverage(&en, &KeySet::new(), &de, ArrayPolicy::Reject).unwrap();
        assert!((cov.coverage_pct - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_rounds_to_two_places() {
        assert!((percent(1, 3) - 33.33).abs() < 1e-9);
        assert!((percent(0, 0) - 100.0).abs() < f64::EPSILON);
    }
}
