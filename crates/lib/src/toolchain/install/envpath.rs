//! Persisting a directory onto the user's `PATH` for future sessions.
//!
//! On Windows the user-scoped environment variable is updated through
//! PowerShell. Elsewhere an `export` line is appended to `~/.profile`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::consts::APP_NAME;
use crate::exec::{ToolRunner, ps_quote_path};
use crate::toolchain::host::HostEnv;

/// Add `dir` to the persistent user `PATH` if it is not already present.
pub fn persist_user_path(dir: &Path, runner: &dyn ToolRunner, host: &HostEnv) -> Result<(), String> {
  if cfg!(windows) {
    persist_windows(dir, runner, host)
  } else {
    let profile = crate::platform::paths::home_dir().join(".profile");
    persist_in_profile(&profile, dir).map(|_| ()).map_err(|e| e.to_string())
  }
}

fn persist_windows(dir: &Path, runner: &dyn ToolRunner, host: &HostEnv) -> Result<(), String> {
  let script = windows_path_script(dir);
  let command = host.command("powershell").args(["-NoProfile", "-Command"]).arg(script);
  let output = runner.run(&command).map_err(|e| format!("failed to start PowerShell: {}", e))?;
  if !output.success {
    return Err(format!("failed to update user PATH: {}", output.combined()));
  }
  info!(dir = %dir.display(), "added to user PATH");
  Ok(())
}

/// PowerShell snippet that prepends `dir` to the user `Path` unless present.
pub(crate) fn windows_path_script(dir: &Path) -> String {
  format!(
    "$dir = {}; \
     $current = [Environment]::GetEnvironmentVariable('Path', 'User'); \
     $parts = @($current -split ';' | Where-Object {{ $_ }}); \
     if ($parts -notcontains $dir) {{ \
     [Environment]::SetEnvironmentVariable('Path', (@($dir) + $parts) -join ';', 'User') }}",
    ps_quote_path(dir)
  )
}

/// Append an `export PATH` line for `dir` to a shell profile.
///
/// Returns `false` when the line was already there.
pub fn persist_in_profile(profile: &Path, dir: &Path) -> io::Result<bool> {
  let line = format!("export PATH=\"{}:$PATH\"", dir.display());
  let existing = match fs::read_to_string(profile) {
    Ok(text) => text,
    Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
    Err(e) => return Err(e),
  };

  if existing.lines().any(|l| l.trim() == line) {
    debug!(profile = %profile.display(), "PATH entry already present");
    return Ok(false);
  }

  if let Some(parent) = profile.parent() {
    fs::create_dir_all(parent)?;
  }
  let mut file = OpenOptions::new().create(true).append(true).open(profile)?;
  if !existing.is_empty() && !existing.ends_with('\n') {
    writeln!(file)?;
  }
  writeln!(file, "# added by {}", APP_NAME)?;
  writeln!(file, "{}", line)?;

  info!(profile = %profile.display(), dir = %dir.display(), "added to PATH in profile");
  Ok(true)
}
