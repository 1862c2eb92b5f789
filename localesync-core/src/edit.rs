//! Declarative structural edits applied uniformly to every locale document.
//!
//! A plan is written once and replayed against the canonical document and
//! each target, so every file receives the same shape of change.

use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LocaleConfig;
use crate::document::{ArrayPolicy, LocaleDocument, Lookup};
use crate::error::{LocaleError, Result};
use crate::keypath::KeyPath;
use crate::propagate::{OutcomeStatus, PropagateOptions, TargetOutcome, commit};
use crate::store::LocaleStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum EditOp {
    /// Add a leaf with a default value where it is absent.
    Insert {
        path: KeyPath,
        #[serde(alias = "defaultValue")]
        default: String,
    },
    /// Relocate a leaf or subtree. The source is removed before the
    /// destination is created, so `a.b` may move to `a.b._value`.
    Move { from: KeyPath, to: KeyPath },
    /// Rename the final segment of `path`, keeping its position.
    Rename { path: KeyPath, to: String },
    Remove { path: KeyPath },
}

impl EditOp {
    fn describe(&self) -> String {
        match self {
            Self::Insert { path, .. } => format!("insert {path}"),
            Self::Move { from, to } => format!("move {from} -> {to}"),
            Self::Rename { path, to } => format!("rename {path} -> {to}"),
            Self::Remove { path } => format!("remove {path}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct InsertSpec {
    path: KeyPath,
    #[serde(alias = "defaultValue")]
    default: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PlanFile {
    Plan(EditPlan),
    Operations(Vec<EditOp>),
    Inserts(Vec<InsertSpec>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    #[serde(default)]
    pub name: Option<String>,
    pub operations: Vec<EditOp>,
}

/// Per-document record of which operations took effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub inserted: Vec<KeyPath>,
}

impl EditPlan {
    #[must_use]
    pub fn new(name: impl Into<String>, operations: Vec<EditOp>) -> Self {
        Self {
            name: Some(name.into()),
            operations,
        }
    }

    /// Parse a plan object, a bare operation list, or a bare
    /// `[{path, defaultValue}]` insertion list.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when none of the accepted shapes match.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str(json)? {
            PlanFile::Plan(plan) => plan,
            PlanFile::Operations(operations) => Self {
                name: None,
                operations,
            },
            PlanFile::Inserts(inserts) => Self {
                name: None,
                operations: inserts
                    .into_iter()
                    .map(|spec| EditOp::Insert {
                        path: spec.path,
                        default: spec.default,
                    })
                    .collect(),
            },
        })
    }

    /// # Errors
    ///
    /// Returns [`LocaleError::Io`] or [`LocaleError::Parse`] naming `path`,
    /// or a validation error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LocaleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = Self::from_json(&text).map_err(|source| LocaleError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        plan.validate()?;
        Ok(plan)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed edit plan")
    }

    /// # Errors
    ///
    /// Returns [`LocaleError::InvalidKeyPath`] for a rename target that is not a
    /// single segment.
    pub fn validate(&self) -> Result<()> {
        for op in &self.operations {
            if let EditOp::Rename { path, to } = op
                && (to.is_empty() || to.contains('.'))
            {
                return Err(LocaleError::InvalidKeyPath {
                    input: format!("{path} -> {to}"),
                });
            }
        }
        Ok(())
    }

    /// Apply every operation to a copy of `doc`. Either all operations succeed
    /// and the edited copy is returned, or `doc` is left as the only version.
    ///
    /// # Errors
    ///
    /// Returns a structural error on any collision, and validation errors for
    /// the finished document.
    pub fn apply(
        &self,
        doc: &LocaleDocument,
        policy: ArrayPolicy,
    ) -> Result<(LocaleDocument, EditOutcome)> {
        self.validate()?;
        let mut working = doc.clone();
        let mut outcome = EditOutcome::default();
        for op in &self.operations {
            let took_effect = match op {
                EditOp::Insert { path, default } => {
                    let inserted = working.insert_leaf(path, default.clone())?;
                    if inserted {
                        outcome.inserted.push(path.clone());
                    }
                    inserted
                }
                EditOp::Move { from, to } if already_moved(&working, from, to) => false,
                EditOp::Move { from, to } => match working.remove(from) {
                    Some(Value::Object(_)) if to.starts_with(from) => {
                        return Err(LocaleError::structural(
                            to.to_string(),
                            format!("cannot move mapping '{from}' inside itself"),
                        ));
                    }
                    Some(value) => {
                        working.place(to, value)?;
                        true
                    }
                    None => false,
                },
                EditOp::Rename { path, to } => working.rename(path, to)?,
                EditOp::Remove { path } => working.remove(path).is_some(),
            };
            let description = op.describe();
            debug!(
                "{} on '{}': {}",
                description,
                doc.tag(),
                if took_effect { "applied" } else { "skipped" }
            );
            if took_effect {
                outcome.applied.push(description);
            } else {
                outcome.skipped.push(description);
            }
        }
        working.keys(policy)?;
        Ok((working, outcome))
    }
}

/// A leaf-to-mapping move that a previous run already performed: `from` is a
/// mapping and `to` resolves inside it.
fn already_moved(doc: &LocaleDocument, from: &KeyPath, to: &KeyPath) -> bool {
    to.starts_with(from)
        && matches!(doc.lookup(from), Lookup::Node(_))
        && matches!(doc.lookup(to), Lookup::Leaf(_) | Lookup::Node(_))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSummary {
    pub plan: String,
    pub dry_run: bool,
    pub canonical: TargetOutcome,
    pub locales: Vec<TargetOutcome>,
}

impl EditSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.canonical.is_failure() && !self.locales.iter().any(TargetOutcome::is_failure)
    }
}

fn edit_one(
    store: &LocaleStore,
    plan: &EditPlan,
    tag: &str,
    policy: ArrayPolicy,
    options: PropagateOptions,
) -> Result<TargetOutcome> {
    let doc = store.load(tag)?;
    let (edited, outcome) = plan.apply(&doc, policy)?;
    let changed = edited != doc;
    let status = if changed || options.sort_keys {
        commit(store, &edited, policy, options)?;
        OutcomeStatus::Updated
    } else {
        OutcomeStatus::Unchanged
    };
    let mut notes = outcome.applied;
    notes.extend(outcome.skipped.into_iter().map(|s| format!("{s} (no-op)")));
    Ok(TargetOutcome {
        tag: tag.to_string(),
        status,
        added: outcome.inserted,
        notes,
        error: None,
    })
}

/// Replay `plan` on the canonical document, then on every target.
///
/// # Errors
///
/// Fails when the canonical document cannot be edited; targets are never
/// touched in that case. Target failures are recorded per locale.
pub fn apply_plan(
    config: &LocaleConfig,
    store: &LocaleStore,
    plan: &EditPlan,
    options: PropagateOptions,
) -> Result<EditSummary> {
    plan.validate()?;
    info!(
        "applying '{}' ({} operations)",
        plan.label(),
        plan.operations.len()
    );
    let canonical = edit_one(store, plan, &config.canonical, config.array_policy, options)?;
    let locales = config
        .targets
        .iter()
        .map(|tag| {
            edit_one(store, plan, tag, config.array_policy, options)
                .unwrap_or_else(|err| TargetOutcome::failed(tag, &err))
        })
        .collect();
    Ok(EditSummary {
        plan: plan.label().to_string(),
        dry_run: options.dry_run,
        canonical,
        locales,
    })
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

    #[test]
    fn parses_all_plan_shapes() {
        let full = EditPlan::from_json(
            r#"{"name": "nav", "operations": [{"op": "insert", "path": "Header.nav.docs", "default": "Docs"}]}"#,
        )
        .unwrap();
        assert_eq!(full.label(), "nav");

        let ops = EditPlan::from_json(r#"[{"op": "remove", "path": "Old.key"}]"#).unwrap();
        assert_eq!(ops.operations, vec![EditOp::Remove { path: key("Old.key") }]);

        let inserts =
            EditPlan::from_json(r#"[{"path": "Docs.title", "defaultValue": "Guide"}]"#).unwrap();
        assert_eq!(
            inserts.operations,
            vec![EditOp::Insert {
                path: key("Docs.title"),
                default: "Guide".into()
            }]
        );
        assert!(EditPlan::from_json(r#"[{"path": "a..b", "defaultValue": "x"}]"#).is_err());
    }

    #[test]
    fn insert_does_not_clobber_translations() {
        let plan = EditPlan::new(
            "t",
            vec![EditOp::Insert {
                path: key("Docs.title"),
                default: "Guide".into(),
            }],
        );
        let target = doc(json!({"Docs": {"title": "Guía"}}));
        let (edited, outcome) = plan.apply(&target, ArrayPolicy::Reject).unwrap();
        assert_eq!(edited, target);
        assert_eq!(outcome.skipped, vec!["insert Docs.title"]);
    }

    #[test]
    fn move_converts_leaf_to_mapping() {
        let plan = EditPlan::new(
            "footer",
            vec![
                EditOp::Move {
                    from: key("Footer.copyright"),
                    to: key("Footer.copyright._value"),
                },
                EditOp::Insert {
                    path: key("Footer.copyright.footerDetails"),
                    default: "All rights reserved".into(),
                },
            ],
        );
        let (edited, outcome) = plan
            .apply(&doc(json!({"Footer": {"copyright": "(c) 2025"}})), ArrayPolicy::Reject)
            .unwrap();
        assert_eq!(
            edited.into_value(),
            json!({"Footer": {"copyright": {"_value": "(c) 2025", "footerDetails": "All rights reserved"}}})
        );
        assert_eq!(outcome.applied.len(), 2);
    }

    #[test]
    fn failed_operation_leaves_document_untouched() {
        let plan = EditPlan::new(
            "bad",
            vec![
                EditOp::Remove { path: key("a") },
                EditOp::Insert {
                    path: key("b.c"),
                    default: "x".into(),
                },
            ],
        );
        let original = doc(json!({"a": "1", "b": "leaf"}));
        let err = plan.apply(&original, ArrayPolicy::Reject).unwrap_err();
        assert!(err.is_structural());
        assert_eq!(original.root().len(), 2);
    }

    #[test]
    fn move_into_occupied_destination_fails() {
        let plan = EditPlan::new(
            "m",
            vec![EditOp::Move {
                from: key("a"),
                to: key("b"),
            }],
        );
        assert!(plan.apply(&doc(json!({"a": "1", "b": "2"})), ArrayPolicy::Reject).is_err());
        let (edited, outcome) = plan.apply(&doc(json!({"b": "2"})), ArrayPolicy::Reject).unwrap();
        assert_eq!(edited.into_value(), json!({"b": "2"}));
        assert_eq!(outcome.skipped, vec!["move a -> b"]);
    }

    #[test]
    fn mapping_cannot_move_into_itself() {
        let plan = EditPlan::new(
            "m",
            vec![EditOp::Move {
                from: key("a"),
                to: key("a._value"),
            }],
        );
        let err = plan
            .apply(&doc(json!({"a": {"other": "x"}})), ArrayPolicy::Reject)
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn leaf_to_mapping_plan_replays_as_no_op() {
        let plan = EditPlan::new(
            "footer",
            vec![
                EditOp::Move {
                    from: key("Footer.copyright"),
                    to: key("Footer.copyright._value"),
                },
                EditOp::Insert {
                    path: key("Footer.copyright.footerDetails"),
                    default: "All rights reserved".into(),
                },
            ],
        );
        let (once, _) = plan
            .apply(&doc(json!({"Footer": {"copyright": "(c) 2025"}})), ArrayPolicy::Reject)
            .unwrap();
        let (twice, outcome) = plan.apply(&once, ArrayPolicy::Reject).unwrap();
        assert_eq!(twice, once);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn rename_target_must_be_single_segment() {
        let plan = EditPlan::new(
            "r",
            vec![EditOp::Rename {
                path: key("a"),
                to: "b.c".into(),
            }],
        );
        assert!(plan.validate().is_err());
    }
}
