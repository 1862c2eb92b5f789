use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while loading, validating or persisting locale documents.
///
/// Divergence and gate failures are ordinary report values and never appear here.
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("structural error at '{path}': {reason}")]
    Structural { path: String, reason: String },
    #[error("locale '{tag}' has no document at {}", path.display())]
    MissingFile { tag: String, path: PathBuf },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize locale '{tag}': {source}")]
    Serialize {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid key path '{input}'")]
    InvalidKeyPath { input: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LocaleError {
    pub(crate) fn structural(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self::Structural {
            path: if path.is_empty() {
                "<root>".to_string()
            } else {
                path
            },
            reason: reason.into(),
        }
    }

    /// True for leaf/mapping shape violations that have to be resolved by hand.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }
}

pub type Result<T, E = LocaleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_error_names_root_when_path_empty() {
        let err = LocaleError::structural("", "document root must be an object");
        assert_eq!(
            err.to_string(),
            "structural error at '<root>': document root must be an object"
        );
        assert!(err.is_structural());
    }

    #[test]
    fn missing_file_mentions_tag_and_path() {
        let err = LocaleError::MissingFile {
            tag: "es".to_string(),
            path: PathBuf::from("messages/es.json"),
        };
        let text = err.to_string();
        assert!(text.contains("'es'"));
        assert!(text.contains("messages/es.json"));
        assert!(!err.is_structural());
    }

    #[test]
    fn serialize_error_names_the_locale() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LocaleError::Serialize {
            tag: "ja".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("cannot serialize locale 'ja'"));
    }
}
