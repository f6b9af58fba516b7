use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of supported toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolchainId {
  #[serde(rename = "ps2exe")]
  Ps2Exe,
  #[serde(rename = "pyinstaller")]
  PyInstaller,
  #[serde(rename = "iexpress")]
  IExpress,
  #[serde(rename = "pkg")]
  Pkg,
  #[serde(rename = "ahk2exe")]
  Ahk2Exe,
  #[serde(rename = "csc")]
  Csc,
  #[serde(rename = "go")]
  GoBuild,
  #[serde(rename = "ocra")]
  Ocra,
}

impl ToolchainId {
  pub const ALL: [ToolchainId; 8] = [
    ToolchainId::Ps2Exe,
    ToolchainId::PyInstaller,
    ToolchainId::IExpress,
    ToolchainId::Pkg,
    ToolchainId::Ahk2Exe,
    ToolchainId::Csc,
    ToolchainId::GoBuild,
    ToolchainId::Ocra,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ps2Exe => "ps2exe",
      Self::PyInstaller => "pyinstaller",
      Self::IExpress => "iexpress",
      Self::Pkg => "pkg",
      Self::Ahk2Exe => "ahk2exe",
      Self::Csc => "csc",
      Self::GoBuild => "go",
      Self::Ocra => "ocra",
    }
  }
}

impl fmt::Display for ToolchainId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ToolchainId {
  type Err = RegistryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_lowercase();
    Self::ALL
      .into_iter()
      .find(|id| id.as_str() == wanted)
      .ok_or(RegistryError::UnknownToolchain(wanted))
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
  #[error("no toolchain handles '.{0}' files")]
  NotFound(String),

  #[error("file has no extension: {}", .0.display())]
  NoExtension(PathBuf),

  #[error("unknown toolchain: {0}")]
  UnknownToolchain(String),
}

/// Rough output size model: `base + source_len * multiplier`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeEstimate {
  pub base: u64,
  pub multiplier: f64,
}

impl SizeEstimate {
  pub const fn new(base: u64, multiplier: f64) -> Self {
    Self { base, multiplier }
  }

  pub fn estimate(&self, source_len: u64) -> u64 {
    self.base + (source_len as f64 * self.multiplier).round() as u64
  }
}
