//! `exeforge toolchains` and `exeforge probe`.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use exeforge_lib::Orchestrator;
use exeforge_lib::toolchain::{ProbeStatus, ToolchainDescriptor};

use crate::output::{print_json, print_stat, print_success, print_warning, symbols};

#[derive(Serialize)]
struct ToolchainRow<'a> {
  id: &'a str,
  name: &'a str,
  language: &'a str,
  extensions: &'a [&'a str],
  built_in: bool,
  status: &'a ProbeStatus,
}

impl<'a> ToolchainRow<'a> {
  fn new(descriptor: &'a ToolchainDescriptor, status: &'a ProbeStatus) -> Self {
    Self {
      id: descriptor.id.as_str(),
      name: descriptor.display_name,
      language: descriptor.language,
      extensions: descriptor.extensions,
      built_in: descriptor.built_in,
      status,
    }
  }
}

pub fn cmd_toolchains(json: bool) -> Result<()> {
  let mut orchestrator = Orchestrator::new();
  let statuses = orchestrator.probe_all();

  if json {
    let rows: Vec<_> = statuses.iter().map(|(d, s)| ToolchainRow::new(d, s)).collect();
    return print_json(&rows);
  }

  for (descriptor, status) in &statuses {
    let mark = if status.installed {
      symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    } else {
      symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
    };
    let extensions: Vec<_> = descriptor.extensions.iter().map(|e| format!(".{}", e)).collect();
    println!(
      "{} {:<12} {:<16} {}",
      mark,
      descriptor.display_name,
      descriptor.language,
      extensions.join(" ").if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  Ok(())
}

pub fn cmd_probe(ext: &str, json: bool) -> Result<()> {
  let mut orchestrator = Orchestrator::new();
  let descriptor = orchestrator.resolve_toolchain(ext)?;
  let status = orchestrator.probe(ext).context("Probe failed")?;

  if json {
    return print_json(&ToolchainRow::new(descriptor, &status));
  }

  if status.installed {
    print_success(&format!("{} is installed", descriptor.display_name));
  } else {
    print_warning(&format!("{} is not installed", descriptor.display_name));
  }
  if let Some(location) = &status.location {
    print_stat("Location", &location.display().to_string());
  }
  if let Some(reason) = &status.reason {
    print_stat("Reason", reason);
  }
  Ok(())
}
