use crate::consts::{APP_NAME, HOME_ENV, INSTALL_LOG_FILENAME, TOOLCHAINS_DIR};
use std::path::PathBuf;

/// Returns the user's home directory
pub fn home_dir() -> PathBuf {
  dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

/// Returns the desktop directory, falling back to the home directory
pub fn desktop_dir() -> PathBuf {
  dirs::desktop_dir().unwrap_or_else(home_dir)
}

/// Returns the directory holding the persisted build-state documents
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  if let Some(root) = home_override() {
    return root.join("config");
  }
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory holding the persisted build-state documents
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  if let Some(root) = home_override() {
    return root.join("config");
  }
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for machine-local data (managed toolchains, install log)
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  if let Some(root) = home_override() {
    return root.join("data");
  }
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
    .join(APP_NAME)
}

/// Returns the directory for machine-local data (managed toolchains, install log)
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  if let Some(root) = home_override() {
    return root.join("data");
  }
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Directory into which the installer places downloaded toolchains.
pub fn toolchains_dir() -> PathBuf {
  data_dir().join(TOOLCHAINS_DIR)
}

pub fn install_log_path() -> PathBuf {
  data_dir().join(INSTALL_LOG_FILENAME)
}

fn home_override() -> Option<PathBuf> {
  std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()).map(PathBuf::from)
}
