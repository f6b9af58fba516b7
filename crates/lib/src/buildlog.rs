//! User-visible build log.
//!
//! Separate from `tracing` diagnostics: these lines are what the front end
//! shows the user and what [`export_log`] writes to disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::consts::{APP_NAME, APP_VERSION};
use crate::platform::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
  Info,
  Success,
  Warning,
  Error,
}

impl Severity {
  pub fn tag(&self) -> &'static str {
    match self {
      Self::Info => "[*]",
      Self::Success => "[OK]",
      Self::Warning => "[!]",
      Self::Error => "[X]",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
  pub time: NaiveTime,
  pub severity: Severity,
  pub message: String,
}

impl fmt::Display for LogLine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} {}", self.time.format("%H:%M:%S"), self.severity.tag(), self.message)
  }
}

/// Ordered log lines of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildLog {
  lines: Vec<LogLine>,
}

impl BuildLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
    self.lines.push(LogLine {
      time: Local::now().time(),
      severity,
      message: message.into(),
    });
  }

  pub fn info(&mut self, message: impl Into<String>) {
    self.push(Severity::Info, message);
  }

  pub fn success(&mut self, message: impl Into<String>) {
    self.push(Severity::Success, message);
  }

  pub fn warning(&mut self, message: impl Into<String>) {
    self.push(Severity::Warning, message);
  }

  pub fn error(&mut self, message: impl Into<String>) {
    self.push(Severity::Error, message);
  }

  pub fn lines(&self) -> &[LogLine] {
    &self.lines
  }

  pub fn extend(&mut self, other: BuildLog) {
    self.lines.extend(other.lines);
  }

  pub fn has(&self, severity: Severity) -> bool {
    self.lines.iter().any(|l| l.severity == severity)
  }
}

impl fmt::Display for BuildLog {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{}", line)?;
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("failed to write log to {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Write `text` to a timestamped file on the user's desktop.
pub fn export_log(text: &str, source: &Path) -> Result<PathBuf, ExportError> {
  export_log_to(&paths::desktop_dir(), text, source)
}

/// Write `text` to `BuildLog_<stem>_<timestamp>.txt` under `dir`.
pub fn export_log_to(dir: &Path, text: &str, source: &Path) -> Result<PathBuf, ExportError> {
  let now = Local::now();
  let stem = source
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "build".to_string());
  let path = dir.join(format!("BuildLog_{}_{}.txt", stem, now.format("%Y-%m-%d_%H-%M-%S")));

  let mut content = String::new();
  content.push_str(&format!("{} {} build log\n", APP_NAME, APP_VERSION));
  content.push_str(&format!("Date: {}\n", now.format("%Y-%m-%d %H:%M:%S")));
  content.push_str(&format!("Source: {}\n", source.display()));
  content.push_str(&"=".repeat(60));
  content.push('\n');
  content.push_str(text);
  if !text.ends_with('\n') {
    content.push('\n');
  }

  let write = || -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(&path, &content)
  };
  write().map_err(|source| ExportError::Write {
    path: path.clone(),
    source,
  })?;

  info!(path = %path.display(), "exported build log");
  Ok(path)
}
