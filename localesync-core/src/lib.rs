//! Localesync Core
//!
//! Key extraction, consistency checking, propagation, structural edits and
//! usage gating for nested JSON message catalogs. The canonical locale is the
//! source of truth for which keys exist; every other locale is kept in line
//! with it. No terminal output happens here; results are returned as values
//! and progress is reported through `log`.

pub mod check;
pub mod config;
pub mod coverage;
pub mod document;
pub mod edit;
pub mod error;
pub mod gate;
pub mod keypath;
pub mod lookup;
pub mod propagate;
pub mod store;

// Re-export commonly used types
pub use check::{
    CheckStatus, ConsistencyRun, Divergence, LocaleCheck, check, check_document, check_locales,
    is_placeholder, placeholder_keys,
};
pub use config::{ConfigError, LocaleConfig, validate_tag};
pub use coverage::{CoverageReport, LocaleCoverage, coverage_locales, locale_coverage};
pub use document::{ArrayPolicy, LocaleDocument, Lookup, extract_keys};
pub use edit::{EditOp, EditOutcome, EditPlan, EditSummary, apply_plan};
pub use error::{LocaleError, Result};
pub use gate::{GateResult, LITERAL_MARKER, ReferenceKind, UsageManifest, UsageReference, gate};
pub use keypath::{KeyPath, KeySet};
pub use lookup::{MessagesTranslator, Translator, humanize_key, resolve};
pub use propagate::{
    FillOutcome, OutcomeStatus, Policy, PropagateOptions, PropagationSummary, TargetOutcome, fill,
    overwrite, propagate,
};
pub use store::LocaleStore;
