use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::buildlog::BuildLog;
use crate::sign::SignOutcome;
use crate::state::BuildProfile;
use crate::toolchain::{RegistryError, ToolchainId};

/// Dispatcher lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
  #[default]
  Idle,
  Preparing,
  Invoking,
  PostProcessing,
  Completed,
  Failed,
}

impl Phase {
  /// A compile is running.
  pub fn in_flight(&self) -> bool {
    matches!(self, Self::Preparing | Self::Invoking | Self::PostProcessing)
  }
}

/// Generic build options, mapped onto each tool's flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
  pub icon: Option<PathBuf>,
  pub profile_name: String,
  pub profile: BuildProfile,
  pub sign: bool,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      icon: None,
      profile_name: crate::state::profiles::DEFAULT_PROFILE.to_string(),
      profile: BuildProfile::default(),
      sign: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
  pub source: PathBuf,
  /// Full path of the executable to produce.
  pub output: PathBuf,
  pub options: CompileOptions,
}

#[derive(Debug, Error)]
pub enum CompileFailure {
  #[error("a compilation is already in progress")]
  Busy,

  #[error("source file not found: {}", .0.display())]
  SourceMissing(PathBuf),

  #[error("unsupported file type: {0}")]
  Unsupported(#[from] RegistryError),

  #[error("cannot create output directory {}: {message}", path.display())]
  OutputDirectory { path: PathBuf, message: String },

  #[error("{toolchain} is not installed{}", reason.as_ref().map(|r| format!(" ({})", r)).unwrap_or_default())]
  ToolchainMissing {
    toolchain: &'static str,
    reason: Option<String>,
  },

  #[error("could not prepare build: {0}")]
  Staging(String),

  #[error("failed to start {tool}: {message}")]
  Launch { tool: String, message: String },

  #[error("compiler exited with code {code:?}:\n{output}")]
  ToolFailed { code: Option<i32>, output: String },

  #[error("compiler reported success but produced no file at {}", .0.display())]
  NoArtifact(PathBuf),
}

/// Message for the presentation layer to show as a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
  pub title: String,
  pub body: String,
  pub success: bool,
}

/// Everything the caller needs to render one compile.
#[derive(Debug)]
pub struct CompileResult {
  pub phase: Phase,
  pub source: PathBuf,
  pub output: PathBuf,
  pub toolchain: Option<ToolchainId>,
  pub failure: Option<CompileFailure>,
  /// Size of the produced executable in bytes.
  pub size: Option<u64>,
  pub signing: Option<SignOutcome>,
  pub warnings: Vec<String>,
  pub notice: Option<Notice>,
  pub log: BuildLog,
}

impl CompileResult {
  pub(crate) fn new(request: &CompileRequest) -> Self {
    Self {
      phase: Phase::Idle,
      source: request.source.clone(),
      output: request.output.clone(),
      toolchain: None,
      failure: None,
      size: None,
      signing: None,
      warnings: Vec::new(),
      notice: None,
      log: BuildLog::new(),
    }
  }

  pub fn is_success(&self) -> bool {
    self.phase == Phase::Completed
  }

  pub(crate) fn warn(&mut self, message: impl Into<String>) {
    let message = message.into();
    self.log.warning(message.clone());
    self.warnings.push(message);
  }
}
