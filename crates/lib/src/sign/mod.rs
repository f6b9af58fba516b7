//! Authenticode signing of built executables.
//!
//! Uses `signtool` on Windows and `osslsigncode` elsewhere, always with an
//! RFC 3161 timestamp so signatures outlive the certificate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::consts::TIMESTAMP_URL;
use crate::exec::{ToolCommand, ToolRunner};
use crate::toolchain::HostEnv;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignOutcome {
  pub success: bool,
  pub message: String,
}

impl SignOutcome {
  fn ok(message: impl Into<String>) -> Self {
    Self {
      success: true,
      message: message.into(),
    }
  }

  fn failed(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: message.into(),
    }
  }
}

/// External signing tool flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignTool {
  SignTool,
  OsslSigncode,
}

impl SignTool {
  pub fn for_host() -> Self {
    if cfg!(windows) { Self::SignTool } else { Self::OsslSigncode }
  }

  /// Text the tool prints when it actually signed something.
  fn success_marker(&self) -> &'static str {
    match self {
      Self::SignTool => "Successfully signed",
      Self::OsslSigncode => "Succeeded",
    }
  }
}

pub struct SigningService {
  runner: Arc<dyn ToolRunner>,
  tool: SignTool,
}

impl SigningService {
  pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
    Self {
      runner,
      tool: SignTool::for_host(),
    }
  }

  pub fn with_tool(mut self, tool: SignTool) -> Self {
    self.tool = tool;
    self
  }

  /// Sign `artifact` in place with a PKCS#12 certificate.
  pub fn sign(&self, artifact: &Path, cert_path: &str, cert_password: &str, host: &HostEnv) -> SignOutcome {
    let cert = Path::new(cert_path.trim());
    if cert_path.trim().is_empty() || !cert.is_file() {
      return SignOutcome::failed("Certificate not found");
    }
    if !artifact.is_file() {
      return SignOutcome::failed(format!("Artifact not found: {}", artifact.display()));
    }

    let signed_copy = signed_copy_path(artifact);
    let command = self.command(artifact, &signed_copy, cert, cert_password, host);

    let output = match self.runner.run(&command) {
      Ok(output) => output,
      Err(e) => {
        warn!(tool = %command.program_name(), error = %e, "signing tool could not be started");
        return SignOutcome::failed(format!("Failed to run {}: {}", command.program_name(), e));
      }
    };

    let combined = output.combined();
    if !output.success || !combined.contains(self.tool.success_marker()) {
      let _ = std::fs::remove_file(&signed_copy);
      return SignOutcome::failed(format!("Signing failed: {}", combined));
    }

    if self.tool == SignTool::OsslSigncode
      && let Err(e) = std::fs::rename(&signed_copy, artifact)
    {
      return SignOutcome::failed(format!("Signing failed: could not replace artifact: {}", e));
    }

    info!(artifact = %artifact.display(), "signed");
    SignOutcome::ok(format!("Signed {}", artifact.display()))
  }

  fn command(&self, artifact: &Path, signed_copy: &Path, cert: &Path, password: &str, host: &HostEnv) -> ToolCommand {
    match self.tool {
      SignTool::SignTool => with_password(host.command("signtool").args(["sign", "/f"]).arg(cert), "/p", password)
        .args(["/fd", "SHA256", "/tr", TIMESTAMP_URL, "/td", "SHA256"])
        .arg(artifact),
      SignTool::OsslSigncode => {
        with_password(host.command("osslsigncode").args(["sign", "-pkcs12"]).arg(cert), "-pass", password)
          .args(["-h", "sha256", "-ts", TIMESTAMP_URL, "-in"])
          .arg(artifact)
          .arg("-out")
          .arg(signed_copy)
      }
    }
  }
}

fn with_password(command: ToolCommand, flag: &str, password: &str) -> ToolCommand {
  if password.is_empty() {
    command
  } else {
    command.arg(flag).secret_arg(password)
  }
}

fn signed_copy_path(artifact: &Path) -> PathBuf {
  let mut name = artifact.as_os_str().to_owned();
  name.push(".signed");
  PathBuf::from(name)
}
