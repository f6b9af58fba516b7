//! External process execution.
//!
//! Every toolchain probe, install step, compile, signing run and post-build
//! launch goes through [`ToolRunner`]. The real implementation wraps
//! `std::process::Command`; tests substitute a recording fake.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::consts::SECRET_MASK;

/// A fully described external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
  pub program: PathBuf,
  pub args: Vec<OsString>,
  pub cwd: Option<PathBuf>,
  pub env: BTreeMap<String, OsString>,
  /// Indices into `args` that [`ToolCommand::display`] masks.
  pub secrets: BTreeSet<usize>,
}

impl ToolCommand {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: BTreeMap::new(),
      secrets: BTreeSet::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Appends an argument that is passed to the process but never shown in
  /// [`ToolCommand::display`].
  pub fn secret_arg(mut self, arg: impl Into<OsString>) -> Self {
    self.secrets.insert(self.args.len());
    self.args.push(arg.into());
    self
  }

  /// Appends `arg` only when `cond` holds.
  pub fn arg_if(self, cond: bool, arg: impl Into<OsString>) -> Self {
    if cond { self.arg(arg) } else { self }
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: &str, value: impl Into<OsString>) -> Self {
    self.env.insert(key.to_string(), value.into());
    self
  }

  /// Arguments as lossy strings, for logging and assertions.
  pub fn args_lossy(&self) -> Vec<String> {
    self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
  }

  /// File name of the program without directories.
  pub fn program_name(&self) -> String {
    self
      .program
      .file_name()
      .unwrap_or(self.program.as_os_str())
      .to_string_lossy()
      .into_owned()
  }

  /// Human-readable command line with secret arguments masked.
  pub fn display(&self) -> String {
    let mut line = self.program.display().to_string();
    for (i, arg) in self.args.iter().enumerate() {
      line.push(' ');
      if self.secrets.contains(&i) {
        line.push_str(SECRET_MASK);
      } else {
        line.push_str(&quote_for_display(arg));
      }
    }
    line
  }
}

fn quote_for_display(arg: &OsStr) -> String {
  let s = arg.to_string_lossy();
  if s.is_empty() || s.contains(char::is_whitespace) {
    format!("\"{}\"", s)
  } else {
    s.into_owned()
  }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
  pub code: Option<i32>,
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

impl ToolOutput {
  /// A successful exit with the given stdout.
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      code: Some(0),
      success: true,
      stdout: stdout.into(),
      stderr: String::new(),
    }
  }

  /// A failed exit with the given code and stderr.
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      success: false,
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  /// Stdout followed by stderr, trimmed.
  pub fn combined(&self) -> String {
    let mut text = String::new();
    let stdout = self.stdout.trim();
    let stderr = self.stderr.trim();
    text.push_str(stdout);
    if !stdout.is_empty() && !stderr.is_empty() {
      text.push('\n');
    }
    text.push_str(stderr);
    text
  }
}

/// Capability for running external processes.
pub trait ToolRunner {
  /// Run to completion, capturing output. An `Err` means the process could
  /// not be started at all.
  fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;

  /// Start detached without waiting (post-build "open" / "run" actions).
  fn launch(&self, command: &ToolCommand) -> io::Result<()>;
}

/// Runs processes on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
  fn build(command: &ToolCommand) -> Command {
    let mut process = Command::new(&command.program);
    process.args(&command.args).envs(&command.env);
    if let Some(cwd) = &command.cwd {
      process.current_dir(cwd);
    }
    hide_console_window(&mut process);
    process
  }
}

impl ToolRunner for SystemRunner {
  fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
    info!(program = %command.program.display(), "running tool");
    debug!(cmd = %command.display(), cwd = ?command.cwd, "spawning process");

    let output = Self::build(command).stdin(Stdio::null()).output()?;

    let result = ToolOutput {
      code: output.status.code(),
      success: output.status.success(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.stderr.trim().is_empty() {
      debug!(stderr = %result.stderr.trim(), "tool stderr");
    }
    debug!(code = ?result.code, "tool exited");

    Ok(result)
  }

  fn launch(&self, command: &ToolCommand) -> io::Result<()> {
    info!(cmd = %command.display(), "launching");
    Self::build(command)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()
      .map(|_| ())
  }
}

#[cfg(windows)]
fn hide_console_window(process: &mut Command) {
  use std::os::windows::process::CommandExt;
  const CREATE_NO_WINDOW: u32 = 0x0800_0000;
  process.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_process: &mut Command) {}

/// Quote a value for a single-quoted PowerShell string literal.
pub fn ps_quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', "''"))
}

/// Same as [`ps_quote`] for paths.
pub fn ps_quote_path(path: &Path) -> String {
  ps_quote(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{echo_msg, shell_cmd};

  fn command(parts: (&'static str, Vec<String>)) -> ToolCommand {
    ToolCommand::new(parts.0).args(parts.1)
  }

  #[test]
  fn run_captures_stdout() {
    let output = SystemRunner.run(&command(echo_msg("hello"))).unwrap();
    assert!(output.success);
    assert_eq!(output.stdout.trim(), "hello");
  }

  #[test]
  fn run_reports_exit_code() {
    let output = SystemRunner.run(&command(shell_cmd("exit 3"))).unwrap();
    assert!(!output.success);
    assert_eq!(output.code, Some(3));
  }

  #[test]
  fn run_missing_program_is_error() {
    let result = SystemRunner.run(&ToolCommand::new("definitely-not-a-real-tool-4821"));
    assert!(result.is_err());
  }

  #[test]
  #[cfg(unix)]
  fn run_passes_env_and_cwd() {
    let temp = tempfile::TempDir::new().unwrap();
    let cmd = command(shell_cmd("echo \"$FORGE_MARK\" && pwd"))
      .env("FORGE_MARK", "marked")
      .current_dir(temp.path());

    let output = SystemRunner.run(&cmd).unwrap();
    let mut lines = output.stdout.lines();
    assert_eq!(lines.next(), Some("marked"));
    let cwd = PathBuf::from(lines.next().unwrap());
    assert_eq!(
      dunce::canonicalize(cwd).unwrap(),
      dunce::canonicalize(temp.path()).unwrap()
    );
  }

  #[test]
  fn combined_joins_streams() {
    let output = ToolOutput {
      code: Some(1),
      success: false,
      stdout: "out\n".into(),
      stderr: "err\n".into(),
    };
    assert_eq!(output.combined(), "out\nerr");
    assert_eq!(ToolOutput::failed(2, " boom ").combined(), "boom");
  }

  #[test]
  fn display_quotes_spaced_args() {
    let cmd = ToolCommand::new("pkg").arg("my script.js").arg("--output");
    assert_eq!(cmd.display(), "pkg \"my script.js\" --output");
  }

  #[test]
  fn display_masks_secret_args() {
    let cmd = ToolCommand::new("signtool")
      .args(["sign", "/p"])
      .secret_arg("pa ss")
      .arg("app.exe");
    assert_eq!(cmd.display(), "signtool sign /p *** app.exe");
    assert_eq!(cmd.args_lossy()[2], "pa ss");
  }

  #[test]
  fn ps_quote_doubles_single_quotes() {
    assert_eq!(ps_quote("it's"), "'it''s'");
  }
}
