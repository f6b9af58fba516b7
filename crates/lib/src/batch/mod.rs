//! Sequential batch compilation.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::buildlog::BuildLog;
use crate::compile::{CompileResult, Notice};

/// What the coordinator drives for each queued file.
pub trait BatchTarget {
  /// Whether `source` has a known, installed toolchain.
  fn available(&mut self, source: &Path) -> bool;

  fn compile_one(&mut self, source: &Path, output: &Path) -> CompileResult;

  fn notifications_enabled(&self) -> bool;
}

#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
  /// Files handed to the dispatcher, whatever their outcome.
  pub completed: usize,
  pub total: usize,
  pub succeeded: usize,
  pub skipped: Vec<PathBuf>,
  pub log: BuildLog,
  pub notice: Option<Notice>,
}

/// Output path used for batch builds: `<source dir>/<stem>.exe`.
pub fn batch_output(source: &Path) -> PathBuf {
  let stem = source
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "app".to_string());
  source.with_file_name(format!("{}.exe", stem))
}

#[derive(Debug, Default)]
pub struct BatchCoordinator {
  queue: Vec<PathBuf>,
}

impl BatchCoordinator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue `path` unless it is already queued.
  pub fn enqueue(&mut self, path: PathBuf) -> bool {
    if self.queue.contains(&path) {
      return false;
    }
    self.queue.push(path);
    true
  }

  pub fn queued(&self) -> &[PathBuf] {
    &self.queue
  }

  pub fn clear(&mut self) {
    self.queue.clear();
  }

  /// Compile every queued file in order, then empty the queue.
  pub fn run_all(&mut self, target: &mut impl BatchTarget) -> BatchResult {
    let queue = std::mem::take(&mut self.queue);
    let mut result = BatchResult {
      total: queue.len(),
      ..BatchResult::default()
    };
    result.log.info(format!("Batch compiling {} files", queue.len()));

    for source in queue {
      if !target.available(&source) {
        debug!(source = %source.display(), "skipping unavailable batch item");
        result.log.warning(format!("Skipped {}: no available toolchain", source.display()));
        result.skipped.push(source);
        continue;
      }

      let compiled = target.compile_one(&source, &batch_output(&source));
      result.completed += 1;
      if compiled.is_success() {
        result.succeeded += 1;
      }
      result.log.extend(compiled.log);
    }

    let summary = format!("Batch complete: {}/{} compiled", result.completed, result.total);
    if result.succeeded == result.completed {
      result.log.success(summary.clone());
    } else {
      result.log.warning(format!("{} ({} failed)", summary, result.completed - result.succeeded));
    }
    info!(completed = result.completed, total = result.total, succeeded = result.succeeded, "batch finished");

    if target.notifications_enabled() {
      result.notice = Some(Notice {
        title: "Batch complete".to_string(),
        body: format!("{}/{} files compiled", result.completed, result.total),
        success: result.succeeded == result.completed,
      });
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compile::{CompileFailure, CompileOptions, CompileRequest, Phase};

  struct ScriptedTarget {
    unavailable: Vec<PathBuf>,
    failing: Vec<PathBuf>,
    compiled: Vec<(PathBuf, PathBuf)>,
  }

  impl BatchTarget for ScriptedTarget {
    fn available(&mut self, source: &Path) -> bool {
      !self.unavailable.iter().any(|p| p == source)
    }

    fn compile_one(&mut self, source: &Path, output: &Path) -> CompileResult {
      self.compiled.push((source.to_path_buf(), output.to_path_buf()));
      let mut result = CompileResult::new(&CompileRequest {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        options: CompileOptions::default(),
      });
      if self.failing.iter().any(|p| p == source) {
        result.phase = Phase::Failed;
        result.failure = Some(CompileFailure::NoArtifact(output.to_path_buf()));
      } else {
        result.phase = Phase::Completed;
      }
      result
    }

    fn notifications_enabled(&self) -> bool {
      true
    }
  }

  #[test]
  fn counts_compiled_items_and_skips_unavailable() {
    let mut batch = BatchCoordinator::new();
    for name in ["a.ps1", "b.go", "c.py"] {
      batch.enqueue(PathBuf::from("/work").join(name));
    }
    let mut target = ScriptedTarget {
      unavailable: vec![PathBuf::from("/work/b.go")],
      failing: vec![PathBuf::from("/work/c.py")],
      compiled: Vec::new(),
    };

    let result = batch.run_all(&mut target);
    assert_eq!(result.completed, 2);
    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped, vec![PathBuf::from("/work/b.go")]);
    assert!(batch.queued().is_empty());
    assert!(!result.notice.unwrap().success);

    assert_eq!(
      target.compiled,
      vec![
        (PathBuf::from("/work/a.ps1"), PathBuf::from("/work/a.exe")),
        (PathBuf::from("/work/c.py"), PathBuf::from("/work/c.exe")),
      ]
    );
  }

  #[test]
  fn enqueue_deduplicates() {
    let mut batch = BatchCoordinator::new();
    assert!(batch.enqueue(PathBuf::from("x.py")));
    assert!(!batch.enqueue(PathBuf::from("x.py")));
    assert_eq!(batch.queued().len(), 1);
  }

  #[test]
  fn empty_queue_is_a_no_op() {
    let mut target = ScriptedTarget {
      unavailable: vec![],
      failing: vec![],
      compiled: vec![],
    };
    let result = BatchCoordinator::new().run_all(&mut target);
    assert_eq!((result.completed, result.total), (0, 0));
    assert!(target.compiled.is_empty());
  }

  #[test]
  fn output_sits_next_to_source() {
    assert_eq!(batch_output(Path::new("/a/b/tool.py")), PathBuf::from("/a/b/tool.exe"));
  }
}
