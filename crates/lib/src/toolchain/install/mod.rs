//! Toolchain installation.
//!
//! Three recipes exist: unpacking a release archive into the managed
//! toolchain directory, running a vendor installer silently, and asking a
//! base runtime's package manager to add a package. Every outcome is a value;
//! nothing here panics or propagates errors to the caller.

pub mod envpath;
pub mod fetch;

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::host::HostEnv;
use super::probe::{Prober, Runtime, SystemProber};
use super::{ToolchainDescriptor, ToolchainId};
use crate::consts::TEMP_PREFIX;
use crate::exec::ToolRunner;
use crate::platform::Platform;
use crate::platform::os::Os;
use crate::platform::paths;

pub use fetch::FetchError;

/// Static install data attached to a registry entry.
#[derive(Debug, Clone, Copy)]
pub enum InstallSpec {
  /// Release archive. `url` may contain `{version}`, `{platform}` and `{ext}`.
  Archive {
    url: &'static str,
    version: &'static str,
    dir_name: &'static str,
    /// Path of the main executable inside the unpacked tree, without suffix.
    binary: &'static str,
    bin_dir: &'static str,
  },
  /// Vendor installer run unattended with a target directory (Windows only).
  SilentInstaller {
    url: &'static str,
    version: &'static str,
    args: &'static [&'static str],
    /// Prefix for the target directory argument, e.g. `/D=`.
    dir_flag: &'static str,
    dir_name: &'static str,
    binary: &'static str,
    bin_dir: &'static str,
  },
  /// Package installed through a base runtime's package manager.
  Package {
    runtime: Runtime,
    args: &'static [&'static str],
  },
}

impl InstallSpec {
  /// Resolve templates for a concrete host platform.
  pub fn resolve(&self, platform: Option<Platform>) -> Result<InstallRecipe, InstallError> {
    match *self {
      Self::Archive {
        url,
        version,
        dir_name,
        binary,
        bin_dir,
      } => {
        let platform = platform.ok_or_else(|| InstallError::UnsupportedPlatform("unknown host platform".into()))?;
        let url = url
          .replace("{version}", version)
          .replace("{platform}", &platform.release_pair())
          .replace("{ext}", platform.os.archive_ext());
        Ok(InstallRecipe::Archive {
          url,
          sha256: None,
          dir_name: dir_name.to_string(),
          binary: PathBuf::from(format!("{}{}", binary, platform.os.exe_suffix())),
          bin_dir: PathBuf::from(bin_dir),
        })
      }
      Self::SilentInstaller {
        url,
        version,
        args,
        dir_flag,
        dir_name,
        binary,
        bin_dir,
      } => {
        if !matches!(platform, Some(p) if p.os == Os::Windows) {
          return Err(InstallError::UnsupportedPlatform(
            "this installer only runs on Windows".into(),
          ));
        }
        Ok(InstallRecipe::SilentInstaller {
          url: url.replace("{version}", version),
          sha256: None,
          args: args.iter().map(|a| a.to_string()).collect(),
          dir_flag: dir_flag.to_string(),
          dir_name: dir_name.to_string(),
          binary: PathBuf::from(binary),
          bin_dir: PathBuf::from(bin_dir),
        })
      }
      Self::Package { runtime, args } => Ok(InstallRecipe::Package {
        runtime,
        args: args.iter().map(|a| a.to_string()).collect(),
      }),
    }
  }
}

/// A fully resolved install plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallRecipe {
  Archive {
    url: String,
    sha256: Option<String>,
    dir_name: String,
    binary: PathBuf,
    bin_dir: PathBuf,
  },
  SilentInstaller {
    url: String,
    sha256: Option<String>,
    args: Vec<String>,
    dir_flag: String,
    dir_name: String,
    binary: PathBuf,
    bin_dir: PathBuf,
  },
  Package {
    runtime: Runtime,
    args: Vec<String>,
  },
}

#[derive(Debug, Error)]
pub enum InstallError {
  #[error("{0} is required but was not found")]
  RuntimeMissing(&'static str),

  #[error("unsupported platform: {0}")]
  UnsupportedPlatform(String),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("installer exited with code {code:?}: {output}")]
  InstallerExit { code: Option<i32>, output: String },

  #[error("expected binary not found after install: {}", .0.display())]
  MissingBinary(PathBuf),

  #[error("{0}")]
  VerificationFailed(String),

  #[error("no install recipe for {0}")]
  NoRecipe(ToolchainId),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

/// Result of an install attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
  pub success: bool,
  pub message: String,
  /// Directory that should be prepended to the search path.
  pub path_addition: Option<PathBuf>,
}

impl InstallOutcome {
  pub fn ok(message: impl Into<String>, path_addition: Option<PathBuf>) -> Self {
    Self {
      success: true,
      message: message.into(),
      path_addition,
    }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: message.into(),
      path_addition: None,
    }
  }
}

/// Capability for installing toolchains.
pub trait Installer {
  fn install(&self, descriptor: &ToolchainDescriptor, host: &HostEnv) -> InstallOutcome;
}

/// Installs onto the real machine.
pub struct SystemInstaller {
  runner: Arc<dyn ToolRunner>,
  prober: SystemProber,
  recipes: HashMap<ToolchainId, InstallRecipe>,
  persist_path: bool,
  log_path: Option<PathBuf>,
}

impl SystemInstaller {
  pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
    Self {
      prober: SystemProber::new(runner.clone()),
      runner,
      recipes: HashMap::new(),
      persist_path: true,
      log_path: Some(paths::install_log_path()),
    }
  }

  /// Use `recipe` instead of the registry's spec for `id`.
  pub fn with_recipe(mut self, id: ToolchainId, recipe: InstallRecipe) -> Self {
    self.recipes.insert(id, recipe);
    self
  }

  /// Where to append install log lines; `None` disables the log.
  pub fn with_log_path(mut self, path: Option<PathBuf>) -> Self {
    self.log_path = path;
    self
  }

  /// Skip writing the user's persistent `PATH`.
  pub fn without_path_persistence(mut self) -> Self {
    self.persist_path = false;
    self
  }

  fn log(&self, message: &str) {
    if let Some(path) = &self.log_path {
      append_install_log(path, message);
    }
  }

  fn recipe_for(&self, descriptor: &ToolchainDescriptor, host: &HostEnv) -> Result<InstallRecipe, InstallError> {
    if let Some(recipe) = self.recipes.get(&descriptor.id) {
      return Ok(recipe.clone());
    }
    descriptor
      .install
      .as_ref()
      .ok_or(InstallError::NoRecipe(descriptor.id))?
      .resolve(host.platform)
  }

  fn run_recipe(
    &self,
    descriptor: &ToolchainDescriptor,
    recipe: InstallRecipe,
    host: &HostEnv,
  ) -> Result<Option<PathBuf>, InstallError> {
    match recipe {
      InstallRecipe::Package { runtime, args } => {
        let runtime_bin = runtime
          .locate(host)
          .ok_or(InstallError::RuntimeMissing(runtime.display_name()))?;
        let command = host.command(runtime_bin).args(args);
        self.log(&format!("Running: {}", command.display()));
        let output = self.runner.run(&command)?;
        if !output.success {
          return Err(InstallError::InstallerExit {
            code: output.code,
            output: output.combined(),
          });
        }
        if !self.prober.probe(descriptor, host).installed {
          return Err(InstallError::VerificationFailed(format!(
            "{} is still not detected after installation",
            descriptor.display_name
          )));
        }
        Ok(None)
      }

      InstallRecipe::Archive {
        url,
        sha256,
        dir_name,
        binary,
        bin_dir,
      } => {
        let staging = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()?;
        self.log(&format!("Downloading {}", url));
        let archive = fetch::download(&url, sha256.as_deref(), staging.path())?;

        let dest = host.toolchains_dir.join(&dir_name);
        clear_stale(&dest)?;
        fetch::unpack_archive(&archive, &dest)?;

        verify_binary(&dest.join(&binary))?;
        Ok(Some(dest.join(bin_dir)))
      }

      InstallRecipe::SilentInstaller {
        url,
        sha256,
        args,
        dir_flag,
        dir_name,
        binary,
        bin_dir,
      } => {
        let staging = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()?;
        self.log(&format!("Downloading {}", url));
        let installer = fetch::download(&url, sha256.as_deref(), staging.path())?;

        let dest = host.toolchains_dir.join(&dir_name);
        let command = host
          .command(installer.to_path_buf())
          .args(args)
          .arg(format!("{}{}", dir_flag, dest.display()));
        self.log(&format!("Running: {}", command.display()));
        let output = self.runner.run(&command)?;
        if !output.success {
          return Err(InstallError::InstallerExit {
            code: output.code,
            output: output.combined(),
          });
        }

        verify_binary(&dest.join(&binary))?;
        Ok(Some(dest.join(bin_dir)))
      }
    }
  }
}

impl Installer for SystemInstaller {
  fn install(&self, descriptor: &ToolchainDescriptor, host: &HostEnv) -> InstallOutcome {
    let name = descriptor.display_name;

    if descriptor.built_in {
      return InstallOutcome::ok(format!("{} is built into Windows", name), None);
    }

    if self.prober.probe(descriptor, host).installed {
      debug!(toolchain = %descriptor.id, "already installed");
      return InstallOutcome::ok(format!("{} is already installed", name), None);
    }

    info!(toolchain = %descriptor.id, "installing toolchain");
    self.log(&format!("Installing {}", name));

    let result = self
      .recipe_for(descriptor, host)
      .and_then(|recipe| self.run_recipe(descriptor, recipe, host));

    let outcome = match result {
      Ok(Some(bin_dir)) => {
        let mut message = format!("{} installed to {}", name, bin_dir.display());
        if self.persist_path
          && let Err(e) = envpath::persist_user_path(&bin_dir, self.runner.as_ref(), host)
        {
          warn!(dir = %bin_dir.display(), error = %e, "could not persist PATH");
          message.push_str(&format!(" (PATH not persisted: {})", e));
        }
        InstallOutcome::ok(message, Some(bin_dir))
      }
      Ok(None) => InstallOutcome::ok(format!("{} installed", name), None),
      Err(e) => {
        warn!(toolchain = %descriptor.id, error = %e, "install failed");
        InstallOutcome::failed(format!("Failed to install {}: {}", name, e))
      }
    };

    self.log(&outcome.message);
    outcome
  }
}

fn clear_stale(dest: &Path) -> io::Result<()> {
  if dest.exists() {
    debug!(dir = %dest.display(), "removing incomplete previous install");
    std::fs::remove_dir_all(dest)?;
  }
  Ok(())
}

fn verify_binary(path: &Path) -> Result<(), InstallError> {
  if path.is_file() {
    Ok(())
  } else {
    Err(InstallError::MissingBinary(path.to_path_buf()))
  }
}

/// Append a timestamped line to the install log. Failures are ignored.
pub fn append_install_log(path: &Path, message: &str) {
  let line = format!("[{}] {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), message);
  let write = || -> io::Result<()> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)?.write_all(line.as_bytes())
  };
  if let Err(e) = write() {
    debug!(path = %path.display(), error = %e, "install log not written");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exec::ToolOutput;
  use crate::platform::arch::Arch;
  use crate::toolchain::descriptor;
  use crate::util::testutil::{FakeRunner, touch, zip_archive};
  use tempfile::TempDir;

  fn exe(name: &str) -> String {
    if cfg!(windows) { format!("{}.exe", name) } else { name.to_string() }
  }

  fn installer(runner: Arc<FakeRunner>, temp: &TempDir) -> SystemInstaller {
    SystemInstaller::new(runner)
      .with_log_path(Some(temp.path().join("install.log")))
      .without_path_persistence()
  }

  #[test]
  fn archive_url_is_templated_per_platform() {
    let spec = descriptor(ToolchainId::GoBuild).install.unwrap();

    let windows = spec.resolve(Some(Platform::new(Arch::X86_64, Os::Windows))).unwrap();
    let InstallRecipe::Archive { url, binary, .. } = windows else {
      panic!("expected archive recipe");
    };
    assert_eq!(url, "https://go.dev/dl/go1.22.5.windows-amd64.zip");
    assert_eq!(binary, PathBuf::from("bin/go.exe"));

    let linux = spec.resolve(Some(Platform::new(Arch::Aarch64, Os::Linux))).unwrap();
    let InstallRecipe::Archive { url, binary, .. } = linux else {
      panic!("expected archive recipe");
    };
    assert_eq!(url, "https://go.dev/dl/go1.22.5.linux-arm64.tar.gz");
    assert_eq!(binary, PathBuf::from("bin/go"));
  }

  #[test]
  fn silent_installer_requires_windows() {
    let spec = descriptor(ToolchainId::Ahk2Exe).install.unwrap();
    assert!(matches!(
      spec.resolve(Some(Platform::new(Arch::X86_64, Os::Linux))),
      Err(InstallError::UnsupportedPlatform(_))
    ));
    let recipe = spec.resolve(Some(Platform::new(Arch::X86_64, Os::Windows))).unwrap();
    assert!(matches!(recipe, InstallRecipe::SilentInstaller { ref url, .. } if url.ends_with("AutoHotkey_1.1.37.02_setup.exe")));
  }

  #[test]
  fn built_in_toolchain_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let host = HostEnv::isolated(temp.path());
    let runner = Arc::new(FakeRunner::new());

    let outcome = installer(runner.clone(), &temp).install(descriptor(ToolchainId::IExpress), &host);
    assert!(outcome.success);
    assert!(runner.commands().is_empty());
  }

  #[test]
  fn package_install_fails_fast_without_runtime() {
    let temp = TempDir::new().unwrap();
    let host = HostEnv::isolated(temp.path());
    let runner = Arc::new(FakeRunner::new());

    let outcome = installer(runner.clone(), &temp).install(descriptor(ToolchainId::Ocra), &host);
    assert!(!outcome.success);
    assert!(outcome.message.contains("Ruby (gem) is required"), "{}", outcome.message);
    assert!(runner.commands().is_empty());
  }

  #[test]
  fn package_install_runs_runtime_then_reprobes() {
    let temp = TempDir::new().unwrap();
    let mut host = HostEnv::isolated(temp.path());
    let bin = temp.path().join("bin");
    touch(&bin.join(exe("gem")));
    host.search_path.prepend(bin);

    // First listing reports nothing, install succeeds, second listing finds it.
    let runner = Arc::new(FakeRunner::new().respond(|cmd| {
      let args = cmd.args_lossy();
      Ok(match args.first().map(String::as_str) {
        Some("install") => ToolOutput::ok("Successfully installed ocra-1.3.11"),
        _ => ToolOutput::ok(""),
      })
    }));
    let outcome = installer(runner.clone(), &temp).install(descriptor(ToolchainId::Ocra), &host);
    assert!(!outcome.success, "listing never reports ocra, so verification must fail");
    assert!(outcome.message.contains("still not detected"));

    let runner = Arc::new(FakeRunner::new().respond(|cmd| {
      let args = cmd.args_lossy();
      Ok(match args.first().map(String::as_str) {
        Some("install") => ToolOutput::ok("Successfully installed ocra-1.3.11"),
        _ => ToolOutput::ok("ocra (1.3.11)"),
      })
    }));
    // Listing already reports ocra: idempotent success without running install.
    let outcome = installer(runner.clone(), &temp).install(descriptor(ToolchainId::Ocra), &host);
    assert!(outcome.success);
    assert!(outcome.message.contains("already installed"));
    assert!(runner.commands().iter().all(|c| c.args_lossy()[0] != "install"));
  }

  #[test]
  fn package_install_reports_runtime_failure() {
    let temp = TempDir::new().unwrap();
    let mut host = HostEnv::isolated(temp.path());
    let bin = temp.path().join("bin");
    touch(&bin.join(exe("npm")));
    host.search_path.prepend(bin);

    let runner = Arc::new(FakeRunner::new().respond(|_| Ok(ToolOutput::failed(243, "EACCES"))));
    let outcome = installer(runner, &temp).install(descriptor(ToolchainId::Pkg), &host);
    assert!(!outcome.success);
    assert!(outcome.message.contains("EACCES"));
  }

  #[test]
  fn archive_install_unpacks_into_managed_dir() {
    let temp = TempDir::new().unwrap();
    let host = HostEnv::isolated(temp.path());
    let mut server = mockito::Server::new();
    let mock = server
      .mock("GET", "/go.zip")
      .with_body(zip_archive(&[("go/bin/go", "binary"), ("go/bin/go.exe", "binary")]))
      .create();

    let recipe = InstallRecipe::Archive {
      url: format!("{}/go.zip", server.url()),
      sha256: None,
      dir_name: "go".into(),
      binary: PathBuf::from(exe("bin/go")),
      bin_dir: PathBuf::from("bin"),
    };
    let runner = Arc::new(FakeRunner::new());
    let installer = installer(runner, &temp).with_recipe(ToolchainId::GoBuild, recipe);

    let outcome = installer.install(descriptor(ToolchainId::GoBuild), &host);
    mock.assert();
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.path_addition, Some(host.toolchains_dir.join("go/bin")));
    assert!(host.toolchains_dir.join("go/bin").join(exe("go")).is_file());

    // Second run probes the managed directory and does nothing.
    let again = installer.install(descriptor(ToolchainId::GoBuild), &host);
    assert!(again.success);
    assert!(again.message.contains("already installed"));
    assert_eq!(again.path_addition, None);

    let log = std::fs::read_to_string(temp.path().join("install.log")).unwrap();
    assert!(log.contains("] Installing Go"));
    assert!(log.contains("] Go installed to"));
  }

  #[test]
  fn archive_without_expected_binary_fails() {
    let temp = TempDir::new().unwrap();
    let host = HostEnv::isolated(temp.path());
    let mut server = mockito::Server::new();
    server.mock("GET", "/go.zip").with_body(zip_archive(&[("go/README", "hi")])).create();

    let recipe = InstallRecipe::Archive {
      url: format!("{}/go.zip", server.url()),
      sha256: None,
      dir_name: "go".into(),
      binary: PathBuf::from("bin/go"),
      bin_dir: PathBuf::from("bin"),
    };
    let outcome = installer(Arc::new(FakeRunner::new()), &temp)
      .with_recipe(ToolchainId::GoBuild, recipe)
      .install(descriptor(ToolchainId::GoBuild), &host);
    assert!(!outcome.success);
    assert!(outcome.message.contains("expected binary not found"));
  }

  #[test]
  fn download_failure_is_reported() {
    let temp = TempDir::new().unwrap();
    let host = HostEnv::isolated(temp.path());
    let mut server = mockito::Server::new();
    server.mock("GET", "/go.zip").with_status(500).create();

    let recipe = InstallRecipe::Archive {
      url: format!("{}/go.zip", server.url()),
      sha256: None,
      dir_name: "go".into(),
      binary: PathBuf::from("bin/go"),
      bin_dir: PathBuf::from("bin"),
    };
    let outcome = installer(Arc::new(FakeRunner::new()), &temp)
      .with_recipe(ToolchainId::GoBuild, recipe)
      .install(descriptor(ToolchainId::GoBuild), &host);
    assert!(!outcome.success);
    assert!(outcome.message.starts_with("Failed to install Go"));
    assert!(!host.toolchains_dir.join("go").exists());
  }

  #[test]
  fn silent_installer_receives_target_dir() {
    let temp = TempDir::new().unwrap();
    let host = HostEnv::isolated(temp.path());
    let mut server = mockito::Server::new();
    server.mock("GET", "/setup.exe").with_body("MZ").create();

    let runner = Arc::new(FakeRunner::new().respond(|cmd| {
      let target = cmd
        .args_lossy()
        .into_iter()
        .find_map(|a| a.strip_prefix("/D=").map(PathBuf::from))
        .unwrap();
      touch(&target.join("Compiler/Ahk2Exe.exe"));
      Ok(ToolOutput::ok(""))
    }));
    let recipe = InstallRecipe::SilentInstaller {
      url: format!("{}/setup.exe", server.url()),
      sha256: None,
      args: vec!["/S".into()],
      dir_flag: "/D=".into(),
      dir_name: "AutoHotkey".into(),
      binary: PathBuf::from("Compiler/Ahk2Exe.exe"),
      bin_dir: PathBuf::from("Compiler"),
    };

    let outcome = installer(runner.clone(), &temp)
      .with_recipe(ToolchainId::Ahk2Exe, recipe)
      .install(descriptor(ToolchainId::Ahk2Exe), &host);
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.path_addition, Some(host.toolchains_dir.join("AutoHotkey/Compiler")));

    let commands = runner.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].args_lossy()[0], "/S");
    assert!(commands[0].program_name().ends_with("-setup.exe"));
  }

  #[test]
  fn install_log_lines_are_timestamped() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("logs/install.log");
    append_install_log(&log, "first");
    append_install_log(&log, "second");

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] first"));
    assert_eq!(lines[0].find(']'), Some(20));
  }
}
