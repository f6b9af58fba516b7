//! Compilation history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::Document;
use crate::toolchain::ToolchainId;

/// Immutable record of one compilation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub timestamp: DateTime<Local>,
  pub source: PathBuf,
  pub output: PathBuf,
  pub toolchain: ToolchainId,
  pub success: bool,
  pub profile: String,
  /// Output size in bytes; 0 for failed builds.
  pub size: u64,
}

impl HistoryEntry {
  pub fn new(source: &Path, output: &Path, toolchain: ToolchainId, success: bool, profile: &str, size: u64) -> Self {
    Self {
      timestamp: Local::now(),
      source: source.to_path_buf(),
      output: output.to_path_buf(),
      toolchain,
      success,
      profile: profile.to_string(),
      size: if success { size } else { 0 },
    }
  }
}

/// Newest-first list of [`HistoryEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
  /// Insert at the front and evict beyond `cap`.
  pub fn record(&mut self, entry: HistoryEntry, cap: usize) {
    self.0.insert(0, entry);
    self.0.truncate(cap);
  }

  pub fn entries(&self) -> &[HistoryEntry] {
    &self.0
  }

  /// The newest `limit` entries.
  pub fn latest(&self, limit: usize) -> &[HistoryEntry] {
    &self.0[..limit.min(self.0.len())]
  }
}

impl Document for History {
  const FILE_NAME: &'static str = "history.json";
}
