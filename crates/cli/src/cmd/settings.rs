//! `exeforge settings` subcommands.

use anyhow::{Context, Result};

use exeforge_lib::Orchestrator;
use exeforge_lib::state::Settings;

use crate::output::{print_json, print_success};

pub fn cmd_show() -> Result<()> {
  let orchestrator = Orchestrator::new();
  print_json(&orchestrator.settings().redacted())
}

pub fn cmd_set(key: &str, value: &str) -> Result<()> {
  let orchestrator = Orchestrator::new();
  let mut settings = orchestrator.settings();
  settings
    .set(key, value)
    .with_context(|| format!("Valid keys: {}", Settings::keys().join(", ")))?;
  orchestrator.save_settings(&settings).context("Failed to save settings")?;

  let shown = settings.redacted().get(key).map(|v| v.to_string()).unwrap_or_default();
  print_success(&format!("{} = {}", key, shown));
  Ok(())
}
