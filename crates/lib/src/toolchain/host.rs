//! Host environment: the search path and well-known install roots that
//! probes, installers and compile strategies consult.
//!
//! This is an explicit value owned by the orchestrator rather than ambient
//! process state. Installers extend [`SearchPath`] here and every spawned
//! tool receives it as its `PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::exec::ToolCommand;
use crate::platform::Platform;
use crate::platform::paths;

/// Ordered list of directories searched for executables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
  dirs: Vec<PathBuf>,
}

impl SearchPath {
  pub fn new(dirs: Vec<PathBuf>) -> Self {
    Self { dirs }
  }

  /// Snapshot of the current process `PATH`.
  pub fn from_env() -> Self {
    let dirs = std::env::var_os("PATH")
      .map(|path| std::env::split_paths(&path).collect())
      .unwrap_or_default();
    Self { dirs }
  }

  pub fn dirs(&self) -> &[PathBuf] {
    &self.dirs
  }

  /// Put `dir` first, removing any later duplicate.
  pub fn prepend(&mut self, dir: PathBuf) {
    self.dirs.retain(|d| d != &dir);
    self.dirs.insert(0, dir);
  }

  pub fn to_os_string(&self) -> OsString {
    std::env::join_paths(&self.dirs).unwrap_or_else(|_| {
      // A directory containing the separator cannot be represented; drop it.
      let usable: Vec<_> = self
        .dirs
        .iter()
        .filter(|d| std::env::join_paths([d]).is_ok())
        .collect();
      std::env::join_paths(usable).unwrap_or_default()
    })
  }

  /// Locate `name` in the search path.
  pub fn find(&self, name: &str) -> Option<PathBuf> {
    self.dirs.iter().find_map(|dir| {
      executable_candidates(name)
        .into_iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
    })
  }
}

#[cfg(windows)]
fn executable_candidates(name: &str) -> Vec<String> {
  if Path::new(name).extension().is_some() {
    return vec![name.to_string()];
  }
  [".exe", ".cmd", ".bat", ""]
    .iter()
    .map(|suffix| format!("{}{}", name, suffix))
    .collect()
}

#[cfg(not(windows))]
fn executable_candidates(name: &str) -> Vec<String> {
  vec![name.to_string()]
}

/// Well-known locations on the host machine.
#[derive(Debug, Clone)]
pub struct HostEnv {
  pub search_path: SearchPath,
  pub windir: PathBuf,
  pub program_files: Option<PathBuf>,
  pub program_files_x86: Option<PathBuf>,
  pub app_data: Option<PathBuf>,
  pub local_app_data: Option<PathBuf>,
  /// Managed directory where the installer unpacks toolchains.
  pub toolchains_dir: PathBuf,
  pub platform: Option<Platform>,
}

impl HostEnv {
  /// Read the current process environment.
  pub fn detect() -> Self {
    let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);
    Self {
      search_path: SearchPath::from_env(),
      windir: var("WINDIR").unwrap_or_else(|| PathBuf::from("C:\\Windows")),
      program_files: var("ProgramFiles"),
      program_files_x86: var("ProgramFiles(x86)"),
      app_data: var("APPDATA"),
      local_app_data: var("LOCALAPPDATA"),
      toolchains_dir: paths::toolchains_dir(),
      platform: Platform::current(),
    }
  }

  /// An environment rooted entirely under `root`, with an empty search path.
  pub fn isolated(root: &Path) -> Self {
    Self {
      search_path: SearchPath::default(),
      windir: root.join("Windows"),
      program_files: Some(root.join("Program Files")),
      program_files_x86: Some(root.join("Program Files (x86)")),
      app_data: Some(root.join("AppData").join("Roaming")),
      local_app_data: Some(root.join("AppData").join("Local")),
      toolchains_dir: root.join("toolchains"),
      platform: Platform::current(),
    }
  }

  /// Start a command that sees this environment's search path.
  pub fn command(&self, program: impl Into<PathBuf>) -> ToolCommand {
    ToolCommand::new(program).env("PATH", self.search_path.to_os_string())
  }

  /// First of `names` found on the search path.
  pub fn find_any(&self, names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| self.search_path.find(name))
  }

  pub fn exe_suffix(&self) -> &'static str {
    self.platform.map(|p| p.os.exe_suffix()).unwrap_or("")
  }

  pub fn targets_windows(&self) -> bool {
    matches!(self.platform, Some(p) if p.os == crate::platform::os::Os::Windows)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
  }

  #[test]
  fn prepend_moves_existing_entry_to_front() {
    let mut path = SearchPath::new(vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    path.prepend(PathBuf::from("/b"));
    assert_eq!(path.dirs(), &[PathBuf::from("/b"), PathBuf::from("/a")]);

    path.prepend(PathBuf::from("/c"));
    assert_eq!(path.dirs()[0], PathBuf::from("/c"));
    assert_eq!(path.dirs().len(), 3);
  }

  #[test]
  fn find_returns_first_match_in_order() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    let name = format!("tool{}", if cfg!(windows) { ".exe" } else { "" });
    touch(&first.join(&name));
    touch(&second.join(&name));

    let path = SearchPath::new(vec![first.clone(), second]);
    assert_eq!(path.find("tool"), Some(first.join(&name)));
    assert_eq!(path.find("missing"), None);
  }

  #[test]
  fn find_ignores_directories() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("tool")).unwrap();
    let path = SearchPath::new(vec![temp.path().to_path_buf()]);
    assert_eq!(path.find("tool"), None);
  }

  #[test]
  fn command_carries_search_path() {
    let temp = TempDir::new().unwrap();
    let mut host = HostEnv::isolated(temp.path());
    host.search_path.prepend(temp.path().join("bin"));

    let cmd = host.command("go");
    let path = cmd.env.get("PATH").unwrap();
    let dirs: Vec<_> = std::env::split_paths(path).collect();
    assert_eq!(dirs, vec![temp.path().join("bin")]);
  }
}
