//! Toolchain availability probing.
//!
//! Probing never fails: every problem (tool absent, prerequisite runtime
//! absent, listing command erroring) collapses to `installed = false`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::ToolchainDescriptor;
use super::host::HostEnv;
use crate::exec::ToolRunner;

/// Base runtimes that ecosystem-packaged toolchains depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Runtime {
  PowerShell,
  Python,
  Node,
  Ruby,
}

impl Runtime {
  /// Executables that provide this runtime, in preference order.
  pub fn binaries(&self) -> &'static [&'static str] {
    match self {
      Self::PowerShell => &["powershell", "pwsh"],
      Self::Python => &["python", "python3", "py"],
      Self::Node => &["npm"],
      Self::Ruby => &["gem"],
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      Self::PowerShell => "PowerShell",
      Self::Python => "Python",
      Self::Node => "Node.js (npm)",
      Self::Ruby => "Ruby (gem)",
    }
  }

  pub fn locate(&self, host: &HostEnv) -> Option<PathBuf> {
    host.find_any(self.binaries())
  }
}

/// A well-known install location, relative to a host root.
#[derive(Debug, Clone, Copy)]
pub enum Fallback {
  ProgramFiles(&'static str),
  ProgramFilesX86(&'static str),
  AppData(&'static str),
  LocalAppData(&'static str),
  /// Relative to the managed toolchain directory.
  Managed(&'static str),
}

impl Fallback {
  pub fn resolve(&self, host: &HostEnv) -> Option<PathBuf> {
    match *self {
      Self::ProgramFiles(rel) => host.program_files.as_ref().map(|root| root.join(rel)),
      Self::ProgramFilesX86(rel) => host.program_files_x86.as_ref().map(|root| root.join(rel)),
      Self::AppData(rel) => host.app_data.as_ref().map(|root| root.join(rel)),
      Self::LocalAppData(rel) => host.local_app_data.as_ref().map(|root| root.join(rel)),
      Self::Managed(rel) => Some(host.toolchains_dir.join(rel)),
    }
  }
}

/// A package listing run through the toolchain's runtime; the toolchain is
/// present when the output mentions `needle` (case-insensitive).
///
/// Text matching is version-fragile; a toolchain whose ecosystem offers a
/// structured query should replace its listing with one.
#[derive(Debug, Clone, Copy)]
pub struct Listing {
  pub args: &'static [&'static str],
  pub needle: &'static str,
}

/// How to decide whether a toolchain is present.
#[derive(Debug, Clone, Copy)]
pub enum ProbeSpec {
  /// Ships with Windows: present iff one of these files (relative to
  /// `%WINDIR%`) exists.
  SystemFile(&'static [&'static str]),
  /// Search path, then fallbacks, then the runtime's package listing.
  Tool {
    binaries: &'static [&'static str],
    fallbacks: &'static [Fallback],
    runtime: Option<Runtime>,
    listing: Option<Listing>,
  },
}

impl ProbeSpec {
  /// Locate the tool's executable without running anything.
  pub fn locate(&self, host: &HostEnv) -> Option<PathBuf> {
    match self {
      Self::SystemFile(candidates) => candidates
        .iter()
        .map(|rel| host.windir.join(rel))
        .find(|path| path.is_file()),
      Self::Tool {
        binaries, fallbacks, ..
      } => host.find_any(binaries).or_else(|| {
        fallbacks
          .iter()
          .filter_map(|f| f.resolve(host))
          .find(|path| path.is_file())
      }),
    }
  }
}

/// Result of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeStatus {
  pub installed: bool,
  /// Why the toolchain cannot be used or probed, when known.
  pub reason: Option<String>,
  /// Where the tool (or the runtime hosting it) was found.
  pub location: Option<PathBuf>,
}

impl ProbeStatus {
  pub fn installed_at(location: PathBuf) -> Self {
    Self {
      installed: true,
      reason: None,
      location: Some(location),
    }
  }

  pub fn missing() -> Self {
    Self {
      installed: false,
      reason: None,
      location: None,
    }
  }

  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self {
      installed: false,
      reason: Some(reason.into()),
      location: None,
    }
  }
}

/// Capability for checking toolchain availability.
pub trait Prober {
  fn probe(&self, descriptor: &ToolchainDescriptor, host: &HostEnv) -> ProbeStatus;
}

/// Probes the real machine, running listing commands through a [`ToolRunner`].
#[derive(Clone)]
pub struct SystemProber {
  runner: Arc<dyn ToolRunner>,
}

impl SystemProber {
  pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
    Self { runner }
  }

  fn probe_listing(&self, runtime_bin: PathBuf, listing: &Listing, host: &HostEnv) -> ProbeStatus {
    let command = host.command(&runtime_bin).args(listing.args.iter().copied());
    match self.runner.run(&command) {
      Ok(output) if output.success && output.stdout.to_lowercase().contains(listing.needle) => {
        ProbeStatus::installed_at(runtime_bin)
      }
      Ok(output) => {
        debug!(cmd = %command.display(), code = ?output.code, "listing did not mention package");
        ProbeStatus::missing()
      }
      Err(e) => {
        debug!(cmd = %command.display(), error = %e, "listing command failed to start");
        ProbeStatus::missing()
      }
    }
  }
}

impl Prober for SystemProber {
  fn probe(&self, descriptor: &ToolchainDescriptor, host: &HostEnv) -> ProbeStatus {
    let status = match &descriptor.probe {
      ProbeSpec::SystemFile(_) => match descriptor.probe.locate(host) {
        Some(path) => ProbeStatus::installed_at(path),
        None => ProbeStatus::unavailable(format!(
          "{} not found under {}",
          descriptor.display_name,
          host.windir.display()
        )),
      },
      ProbeSpec::Tool { runtime, listing, .. } => {
        if let Some(path) = descriptor.probe.locate(host) {
          ProbeStatus::installed_at(path)
        } else {
          match runtime.map(|rt| (rt, rt.locate(host))) {
            Some((rt, None)) => ProbeStatus::unavailable(format!("{} not found", rt.display_name())),
            Some((_, Some(runtime_bin))) => match listing {
              Some(listing) => self.probe_listing(runtime_bin, listing, host),
              None => ProbeStatus::missing(),
            },
            None => ProbeStatus::missing(),
          }
        }
      }
    };

    debug!(
      toolchain = %descriptor.id,
      installed = status.installed,
      reason = ?status.reason,
      "probed toolchain"
    );
    status
  }
}
