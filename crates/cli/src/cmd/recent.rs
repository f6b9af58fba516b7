use anyhow::Result;

use exeforge_lib::Orchestrator;

use crate::output::{print_info, symbols};

pub fn cmd_recent() -> Result<()> {
  let orchestrator = Orchestrator::new();
  let recent = orchestrator.get_recent();
  if recent.is_empty() {
    print_info("No recent files");
    return Ok(());
  }
  for path in recent {
    println!("  {} {}", symbols::INFO, path.display());
  }
  Ok(())
}
