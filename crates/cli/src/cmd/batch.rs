use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use exeforge_lib::Orchestrator;

use crate::output::{print_info, print_log, print_success, print_warning};

pub fn cmd_batch(files: &[PathBuf]) -> Result<()> {
  let files = files
    .iter()
    .map(std::path::absolute)
    .collect::<std::io::Result<Vec<_>>>()
    .context("Failed to resolve source paths")?;

  let mut orchestrator = Orchestrator::new();
  print_info(&format!("Compiling {} files", files.len()));
  let result = orchestrator.compile_batch(&files);

  print_log(&result.log);
  println!();
  for skipped in &result.skipped {
    print_warning(&format!("Skipped {}", skipped.display()));
  }

  let summary = format!("{}/{} files compiled", result.completed, result.total);
  if result.succeeded == result.completed {
    print_success(&summary);
    Ok(())
  } else {
    bail!("{} ({} failed)", summary, result.completed - result.succeeded);
  }
}
