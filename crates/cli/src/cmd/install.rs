use anyhow::{Result, bail};

use exeforge_lib::Orchestrator;

use crate::output::{print_info, print_stat, print_success};
use crate::prompts::confirm;

pub fn cmd_install(ext: &str, yes: bool) -> Result<()> {
  let mut orchestrator = Orchestrator::new();
  let descriptor = orchestrator.resolve_toolchain(ext)?;

  if !descriptor.built_in && orchestrator.probe(ext)?.installed {
    print_success(&format!("{} is already installed", descriptor.display_name));
    return Ok(());
  }

  if !descriptor.built_in && !confirm(&format!("Install {}?", descriptor.display_name), yes)? {
    print_info("Installation cancelled");
    return Ok(());
  }

  let outcome = orchestrator.install(ext)?;
  if !outcome.success {
    bail!(outcome.message);
  }
  print_success(&outcome.message);
  if let Some(dir) = &outcome.path_addition {
    print_stat("Added to PATH", &dir.display().to_string());
  }
  Ok(())
}
