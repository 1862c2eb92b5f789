//! Bring target locales in line with the canonical document.
//!
//! Two explicit policies exist. `Fill` only adds what is missing and is the
//! default. `Overwrite` replaces a target wholesale and discards its
//! translations; it is logged as such every time it runs.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::LocaleConfig;
use crate::document::{ArrayPolicy, LocaleDocument, Shape, classify, walk};
use crate::error::{LocaleError, Result};
use crate::keypath::KeyPath;
use crate::store::LocaleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Insert missing keys with the canonical value; keep everything else.
    #[default]
    Fill,
    /// Replace the whole target with a copy of the canonical document.
    Overwrite,
}

impl Policy {
    #[must_use]
    pub const fn discards_translations(self) -> bool {
        matches!(self, Self::Overwrite)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagateOptions {
    pub sort_keys: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub document: LocaleDocument,
    pub added: Vec<KeyPath>,
}

/// Add every canonical key the target lacks, using the canonical value as a
/// placeholder. Existing target values are never touched, so running it again
/// adds nothing.
///
/// # Errors
///
/// Returns a structural error when either document is malformed or when the
/// two disagree on whether a path is a string or a mapping.
pub fn fill(
    canonical: &LocaleDocument,
    target: &LocaleDocument,
    policy: ArrayPolicy,
) -> Result<FillOutcome> {
    canonical.keys(policy)?;
    target.keys(policy)?;

    let mut merged = target.root().clone();
    let mut added = Vec::new();
    merge_missing(
        canonical.root(),
        &mut merged,
        &mut Vec::new(),
        target.tag(),
        policy,
        &mut added,
    )?;
    Ok(FillOutcome {
        document: LocaleDocument::from_value(target.tag(), Value::Object(merged))?,
        added,
    })
}

fn merge_missing(
    source: &Map<String, Value>,
    target: &mut Map<String, Value>,
    prefix: &mut Vec<String>,
    tag: &str,
    policy: ArrayPolicy,
    added: &mut Vec<KeyPath>,
) -> Result<()> {
    for (key, value) in source {
        prefix.push(key.clone());
        let path = prefix.join(".");
        let source_shape = classify(value, &path, policy)?;
        match target.get_mut(key) {
            None => {
                match value {
                    Value::Object(inner) => walk(inner, prefix, policy, added)?,
                    _ => added.push(KeyPath::from_segments(prefix.clone())),
                }
                target.insert(key.clone(), value.clone());
            }
            Some(existing) => match (source_shape, classify(existing, &path, policy)?) {
                (Shape::Node, Shape::Node) => {
                    if let (Value::Object(inner_source), Value::Object(inner_target)) =
                        (value, existing)
                    {
                        merge_missing(inner_source, inner_target, prefix, tag, policy, added)?;
                    }
                }
                (Shape::Leaf, Shape::Leaf) => {}
                (Shape::Node, Shape::Leaf) => {
                    return Err(LocaleError::structural(
                        path,
                        format!("canonical has a mapping here but locale '{tag}' has a string"),
                    ));
                }
                (Shape::Leaf, Shape::Node) => {
                    return Err(LocaleError::structural(
                        path,
                        format!("canonical has a string here but locale '{tag}' has a mapping"),
                    ));
                }
            },
        }
        prefix.pop();
    }
    Ok(())
}

/// Structural copy of the canonical document under `tag`. Destroys whatever
/// translations the target had.
#[must_use]
pub fn overwrite(canonical: &LocaleDocument, tag: &str) -> LocaleDocument {
    warn!(
        "overwrite policy: replacing locale '{tag}' with a copy of '{}'; existing translations are discarded",
        canonical.tag()
    );
    canonical.retagged(tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Updated,
    Unchanged,
    Failed,
}

/// What a batch run did to one locale document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub tag: String,
    pub status: OutcomeStatus,
    pub added: Vec<KeyPath>,
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetOutcome {
    pub(crate) fn failed(tag: &str, err: &LocaleError) -> Self {
        warn!("locale '{tag}' failed: {err}");
        Self {
            tag: tag.to_string(),
            status: OutcomeStatus::Failed,
            added: Vec::new(),
            notes: Vec::new(),
            error: Some(err.to_string()),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationSummary {
    pub policy: Policy,
    pub canonical: String,
    pub dry_run: bool,
    pub locales: Vec<TargetOutcome>,
}

impl PropagationSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.locales.iter().any(TargetOutcome::is_failure)
    }
}

/// Validate a finished document and write it unless this is a dry run.
pub(crate) fn commit(
    store: &LocaleStore,
    doc: &LocaleDocument,
    policy: ArrayPolicy,
    options: PropagateOptions,
) -> Result<()> {
    doc.keys(policy)?;
    if options.dry_run {
        info!("dry run: not writing '{}'", doc.tag());
        return Ok(());
    }
    store.save(doc, options.sort_keys)?;
    Ok(())
}

fn propagate_one(
    store: &LocaleStore,
    canonical: &LocaleDocument,
    tag: &str,
    policy: Policy,
    array_policy: ArrayPolicy,
    options: PropagateOptions,
) -> Result<TargetOutcome> {
    let mut notes = Vec::new();
    let (document, added, changed) = match policy {
        Policy::Fill => {
            let target = store.load(tag)?;
            let outcome = fill(canonical, &target, array_policy)?;
            let changed = !outcome.added.is_empty();
            (outcome.document, outcome.added, changed)
        }
        Policy::Overwrite => {
            let previous = match store.load(tag) {
                Ok(doc) => Some(doc),
                Err(LocaleError::MissingFile { .. }) => {
                    notes.push("bootstrapped new document".to_string());
                    None
                }
                Err(err) => {
                    notes.push(format!("replaced unreadable document ({err})"));
                    None
                }
            };
            let document = overwrite(canonical, tag);
            let added = match &previous {
                Some(prev) => {
                    let before = prev.key_set(array_policy).unwrap_or_default();
                    document
                        .keys(array_policy)?
                        .into_iter()
                        .filter(|key| !before.contains(key))
                        .collect()
                }
                None => document.keys(array_policy)?,
            };
            let changed = previous.as_ref() != Some(&document);
            if changed {
                notes.push("all values replaced with canonical content".to_string());
            }
            (document, added, changed)
        }
    };

    let status = if changed || options.sort_keys {
        commit(store, &document, array_policy, options)?;
        OutcomeStatus::Updated
    } else {
        OutcomeStatus::Unchanged
    };
    if status == OutcomeStatus::Unchanged {
        info!("locale '{tag}' already in sync");
    }
    Ok(TargetOutcome {
        tag: tag.to_string(),
        status,
        added,
        notes,
        error: None,
    })
}

/// Apply `policy` to every configured target. A failing locale is recorded and
/// the run continues with the next one.
///
/// # Errors
///
/// Fails only when the canonical document cannot be loaded or is malformed.
pub fn propagate(
    config: &LocaleConfig,
    store: &LocaleStore,
    policy: Policy,
    options: PropagateOptions,
) -> Result<PropagationSummary> {
    let canonical = store.load(&config.canonical)?;
    canonical.keys(config.array_policy)?;
    if policy.discards_translations() {
        warn!(
            "running destructive overwrite propagation over {} locales",
            config.targets.len()
        );
    }

    let locales = config
        .targets
        .iter()
        .map(|tag| {
            propagate_one(
                store,
                &canonical,
                tag,
                policy,
                config.array_policy,
                options,
            )
            .unwrap_or_else(|err| TargetOutcome::failed(tag, &err))
        })
        .collect();

    Ok(PropagationSummary {
        policy,
        canonical: config.canonical.clone(),
        dry_run: options.dry_run,
        locales,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(tag: &str, value: Value) -> LocaleDocument {
        LocaleDocument::from_value(tag, value).unwrap()
    }

    fn names(keys: &[KeyPath]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn fill_inserts_missing_subtrees_in_canonical_order() {
        let canonical = doc(
            "en",
            json!({"Docs": {"title": "Guide", "sidebar": {"quickLinks": "Quick Links", "more": "More"}}}),
        );
        let target = doc("es", json!({"Docs": {"title": "Guía"}}));
        let outcome = fill(&canonical, &target, ArrayPolicy::Reject).unwrap();
        assert_eq!(
            names(&outcome.added),
            vec!["Docs.sidebar.quickLinks", "Docs.sidebar.more"]
        );
        assert_eq!(
            outcome.document.into_value(),
            json!({"Docs": {"title": "Guía", "sidebar": {"quickLinks": "Quick Links", "more": "More"}}})
        );
    }

    #[test]
    fn fill_keeps_orphans() {
        let canonical = doc("en", json!({"a": "A"}));
        let target = doc("fr", json!({"legacy": "vieux"}));
        let outcome = fill(&canonical, &target, ArrayPolicy::Reject).unwrap();
        assert_eq!(outcome.document.into_value(), json!({"legacy": "vieux", "a": "A"}));
    }

    #[test]
    fn fill_refuses_shape_collisions() {
        let canonical = doc("en", json!({"Footer": {"copyright": {"_value": "(c)"}}}));
        let target = doc("de", json!({"Footer": {"copyright": "(c) DE"}}));
        let err = fill(&canonical, &target, ArrayPolicy::Reject).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("Footer.copyright"));

        let err = fill(&target.retagged("en"), &canonical.retagged("de"), ArrayPolicy::Reject)
            .unwrap_err();
        assert!(err.to_string().contains("has a mapping"));
    }

    #[test]
    fn fill_rejects_malformed_target_even_outside_canonical_paths() {
        let canonical = doc("en", json!({"a": "A"}));
        let target = doc("ja", json!({"junk": [1, 2]}));
        assert!(fill(&canonical, &target, ArrayPolicy::Reject).is_err());
        assert!(fill(&canonical, &target, ArrayPolicy::OpaqueLeaf).is_ok());
    }

    #[test]
    fn overwrite_copies_canonical_under_new_tag() {
        let canonical = doc("en", json!({"a": "A"}));
        let copy = overwrite(&canonical, "ko");
        assert_eq!(copy.tag(), "ko");
        assert_eq!(copy.root(), canonical.root());
    }

    #[test]
    fn only_overwrite_discards_translations() {
        assert!(Policy::Overwrite.discards_translations());
        assert!(!Policy::Fill.discards_translations());
        assert_eq!(Policy::default(), Policy::Fill);
    }
}
