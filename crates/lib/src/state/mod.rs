//! Durable build state: settings, profiles, recent files and history.
//!
//! # Storage Layout
//!
//! ```text
//! {config_dir}/
//! ├── settings.json
//! ├── profiles.json
//! ├── recent.json
//! └── history.json
//! ```
//!
//! Each document is read from disk on every load and rewritten whole on
//! every save. Concurrent processes are not coordinated; the last writer
//! wins.

pub mod history;
pub mod profiles;
pub mod recent;
pub mod settings;
pub mod types;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::platform::paths::config_dir;

pub use history::{History, HistoryEntry};
pub use profiles::{BuildProfile, Profiles};
pub use recent::RecentFiles;
pub use settings::{PostBuildAction, Settings, Theme};
pub use types::{SettingError, StoreError};

/// A JSON document with a fixed file name and a default value.
pub trait Document: Serialize + DeserializeOwned + Default {
  const FILE_NAME: &'static str;

  /// Build the document from parsed JSON, tolerating whatever damage the
  /// document type can recover from. `None` means "use defaults".
  fn from_value(value: serde_json::Value) -> Option<Self> {
    serde_json::from_value(value).ok()
  }

  /// Repair invariants after loading.
  fn normalize(&mut self) {}
}

/// Reads and writes [`Document`]s under one directory.
#[derive(Debug, Clone)]
pub struct StateStore {
  base_path: PathBuf,
}

impl StateStore {
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  /// Store in the per-user configuration directory.
  pub fn default_store() -> Self {
    Self::new(config_dir())
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  pub fn path_of<D: Document>(&self) -> PathBuf {
    self.base_path.join(D::FILE_NAME)
  }

  fn ensure_dir(&self) -> Result<(), StoreError> {
    fs::create_dir_all(&self.base_path).map_err(StoreError::CreateDir)
  }

  /// Load a document.
  ///
  /// A missing file yields defaults, which are written out immediately. An
  /// unreadable or corrupt file yields defaults with a warning and is left
  /// untouched until the next explicit save.
  pub fn load<D: Document>(&self) -> D {
    let path = self.path_of::<D>();

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        let doc = D::default();
        if let Err(e) = self.save(&doc) {
          warn!(document = D::FILE_NAME, error = %e, "could not persist default document");
        } else {
          debug!(path = %path.display(), "materialized default document");
        }
        return doc;
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "could not read document, using defaults");
        return D::default();
      }
    };

    let mut doc = match serde_json::from_str(&content).ok().and_then(D::from_value) {
      Some(doc) => doc,
      None => {
        warn!(path = %path.display(), "corrupt document, using defaults");
        D::default()
      }
    };
    doc.normalize();
    doc
  }

  /// Rewrite a document atomically (write to temp, then rename).
  pub fn save<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
    self.ensure_dir()?;

    let path = self.path_of::<D>();
    let temp_path = self.base_path.join(format!("{}.tmp", D::FILE_NAME));

    let content = serde_json::to_string_pretty(doc).map_err(StoreError::Serialize)?;
    fs::write(&temp_path, &content).map_err(StoreError::Write)?;
    fs::rename(&temp_path, &path).map_err(StoreError::Write)?;

    debug!(path = %path.display(), "saved document");
    Ok(())
  }
}
