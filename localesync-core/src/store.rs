//! On-disk layout: one `<tag>.json` per locale under a storage root.
//!
//! Reads and writes are whole-document. Writes go to a temporary file in the
//! same directory and are renamed over the target, so a reader never sees a
//! half-written document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::config::{LocaleConfig, validate_tag};
use crate::document::LocaleDocument;
use crate::error::{LocaleError, Result};

#[derive(Debug, Clone)]
pub struct LocaleStore {
    root: PathBuf,
}

impl LocaleStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn from_config(config: &LocaleConfig) -> Self {
        Self::new(config.storage_root.clone())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, tag: &str) -> PathBuf {
        self.root.join(format!("{tag}.json"))
    }

    #[must_use]
    pub fn exists(&self, tag: &str) -> bool {
        self.path_for(tag).is_file()
    }

    /// Read and parse one locale document.
    ///
    /// # Errors
    ///
    /// [`LocaleError::Config`] for a tag that is not a locale tag,
    /// [`LocaleError::MissingFile`] when the file does not exist, otherwise I/O,
    /// parse or root-shape errors.
    pub fn load(&self, tag: &str) -> Result<LocaleDocument> {
        validate_tag(tag)?;
        let path = self.path_for(tag);
        if !path.is_file() {
            return Err(LocaleError::MissingFile {
                tag: tag.to_string(),
                path,
            });
        }
        let text = fs::read_to_string(&path).map_err(|source| LocaleError::Io {
            path: path.clone(),
            source,
        })?;
        let value = serde_json::from_str(&text).map_err(|source| LocaleError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!("loaded {}", path.display());
        LocaleDocument::from_value(tag, value)
    }

    /// Persist a whole document atomically.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::Config`] for an invalid tag,
    /// [`LocaleError::Serialize`] if the document cannot be rendered, and
    /// [`LocaleError::Io`] if the temporary file cannot be written or renamed
    /// into place.
    pub fn save(&self, doc: &LocaleDocument, sort_keys: bool) -> Result<PathBuf> {
        validate_tag(doc.tag())?;
        let path = self.path_for(doc.tag());
        let io_err = |source| LocaleError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;

        let text = if sort_keys {
            doc.sorted().to_pretty_json()?
        } else {
            doc.to_pretty_json()?
        };
        let mut temp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        temp.write_all(text.as_bytes()).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&path).map_err(|e| io_err(e.error))?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}
