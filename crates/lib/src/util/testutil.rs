//! Test utilities for exeforge-lib.
//!
//! Cross-platform shell helpers for tests that spawn real processes, plus
//! recording fakes for the [`ToolRunner`], [`Prober`] and [`Installer`]
//! capabilities.

use std::collections::HashSet;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::exec::{ToolCommand, ToolOutput, ToolRunner};
use crate::toolchain::{HostEnv, InstallOutcome, Installer, ProbeStatus, Prober, ToolchainDescriptor, ToolchainId};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to echo a message.
///
/// On Unix, this uses /bin/echo directly.
/// On Windows, echo is a shell builtin, so we wrap it in cmd.exe.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

/// Create an empty file, including parent directories.
pub fn touch(path: &Path) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, b"").unwrap();
}

/// In-memory zip with the given `(name, content)` entries.
pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  for (name, content) in entries {
    writer
      .start_file(*name, zip::write::SimpleFileOptions::default().unix_permissions(0o755))
      .unwrap();
    writer.write_all(content.as_bytes()).unwrap();
  }
  writer.finish().unwrap().into_inner()
}

/// In-memory gzipped tarball with the given `(name, content)` entries.
pub fn tar_gz_archive(entries: &[(&str, &str)]) -> Vec<u8> {
  let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
  let mut builder = tar::Builder::new(encoder);
  for (name, content) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, name, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

type Responder = Box<dyn Fn(&ToolCommand) -> io::Result<ToolOutput> + Send + Sync>;

/// Records every command and answers with a scripted response.
pub struct FakeRunner {
  responder: Responder,
  commands: Mutex<Vec<ToolCommand>>,
  launched: Mutex<Vec<ToolCommand>>,
}

impl FakeRunner {
  /// Every command succeeds with empty output.
  pub fn new() -> Self {
    Self {
      responder: Box::new(|_| Ok(ToolOutput::ok(""))),
      commands: Mutex::new(Vec::new()),
      launched: Mutex::new(Vec::new()),
    }
  }

  pub fn respond(mut self, f: impl Fn(&ToolCommand) -> io::Result<ToolOutput> + Send + Sync + 'static) -> Self {
    self.responder = Box::new(f);
    self
  }

  pub fn commands(&self) -> Vec<ToolCommand> {
    self.commands.lock().unwrap().clone()
  }

  pub fn launched(&self) -> Vec<ToolCommand> {
    self.launched.lock().unwrap().clone()
  }
}

impl ToolRunner for FakeRunner {
  fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
    self.commands.lock().unwrap().push(command.clone());
    (self.responder)(command)
  }

  fn launch(&self, command: &ToolCommand) -> io::Result<()> {
    self.launched.lock().unwrap().push(command.clone());
    Ok(())
  }
}

/// Reports a fixed set of toolchains as installed.
#[derive(Default)]
pub struct FakeProber {
  installed: Mutex<HashSet<ToolchainId>>,
  probes: Mutex<Vec<ToolchainId>>,
}

impl FakeProber {
  pub fn with_installed(ids: &[ToolchainId]) -> Self {
    Self {
      installed: Mutex::new(ids.iter().copied().collect()),
      probes: Mutex::new(Vec::new()),
    }
  }

  pub fn set_installed(&self, id: ToolchainId) {
    self.installed.lock().unwrap().insert(id);
  }

  pub fn probe_count(&self) -> usize {
    self.probes.lock().unwrap().len()
  }
}

impl Prober for FakeProber {
  fn probe(&self, descriptor: &ToolchainDescriptor, _host: &HostEnv) -> ProbeStatus {
    self.probes.lock().unwrap().push(descriptor.id);
    if self.installed.lock().unwrap().contains(&descriptor.id) {
      ProbeStatus::installed_at(PathBuf::from(descriptor.id.as_str()))
    } else {
      ProbeStatus::missing()
    }
  }
}

/// Succeeds for every toolchain, marking it installed on a shared prober.
pub struct FakeInstaller {
  prober: Arc<FakeProber>,
  path_addition: Option<PathBuf>,
  installs: Mutex<Vec<ToolchainId>>,
}

impl FakeInstaller {
  pub fn new(prober: Arc<FakeProber>, path_addition: Option<PathBuf>) -> Self {
    Self {
      prober,
      path_addition,
      installs: Mutex::new(Vec::new()),
    }
  }

  pub fn installs(&self) -> Vec<ToolchainId> {
    self.installs.lock().unwrap().clone()
  }
}

impl Installer for FakeInstaller {
  fn install(&self, descriptor: &ToolchainDescriptor, _host: &HostEnv) -> InstallOutcome {
    self.installs.lock().unwrap().push(descriptor.id);
    self.prober.set_installed(descriptor.id);
    InstallOutcome::ok(format!("{} installed", descriptor.display_name), self.path_addition.clone())
  }
}
