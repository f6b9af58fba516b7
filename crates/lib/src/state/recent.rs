//! Recently opened source files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Document;

/// Most-recent-first list of source paths, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentFiles(Vec<PathBuf>);

impl RecentFiles {
  /// Put `path` at the front, dropping an earlier occurrence and anything
  /// beyond `cap`.
  pub fn add(&mut self, path: PathBuf, cap: usize) {
    self.0.retain(|p| p != &path);
    self.0.insert(0, path);
    self.0.truncate(cap);
  }

  /// Entries that still exist on disk, at most `cap`.
  pub fn existing(&self, cap: usize) -> Vec<PathBuf> {
    self.0.iter().filter(|p| p.exists()).take(cap).cloned().collect()
  }
}

impl Document for RecentFiles {
  const FILE_NAME: &'static str = "recent.json";
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::touch;
  use tempfile::TempDir;

  fn files(temp: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
      .iter()
      .map(|n| {
        let path = temp.path().join(n);
        touch(&path);
        path
      })
      .collect()
  }

  #[test]
  fn add_is_idempotent_and_moves_to_front() {
    let temp = TempDir::new().unwrap();
    let paths = files(&temp, &["a.py", "b.py", "c.py"]);
    let mut recent = RecentFiles::default();
    for p in &paths {
      recent.add(p.clone(), 10);
    }
    recent.add(paths[0].clone(), 10);
    recent.add(paths[0].clone(), 10);

    assert_eq!(recent.existing(10), vec![paths[0].clone(), paths[2].clone(), paths[1].clone()]);
  }

  #[test]
  fn add_respects_cap() {
    let temp = TempDir::new().unwrap();
    let paths = files(&temp, &["1.js", "2.js", "3.js", "4.js"]);
    let mut recent = RecentFiles::default();
    for p in &paths {
      recent.add(p.clone(), 3);
    }
    let listed = recent.existing(10);
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0], paths[3]);
  }

  #[test]
  fn vanished_files_are_filtered_on_read() {
    let temp = TempDir::new().unwrap();
    let paths = files(&temp, &["keep.go", "gone.go"]);
    let mut recent = RecentFiles::default();
    recent.add(paths[0].clone(), 10);
    recent.add(paths[1].clone(), 10);
    std::fs::remove_file(&paths[1]).unwrap();

    assert_eq!(recent.existing(10), vec![paths[0].clone()]);
  }
}
