use std::path::Path;

use anyhow::Result;

use exeforge_lib::Orchestrator;
use exeforge_lib::platform::Platform;

use crate::output::{format_bytes, print_stat};

pub fn cmd_info(file: &Path) -> Result<()> {
  let orchestrator = Orchestrator::new();
  let descriptor = exeforge_lib::toolchain::resolve_path(file)?;

  println!("{}", file.display());
  print_stat("Type", descriptor.description);
  print_stat("Toolchain", descriptor.display_name);
  print_stat("Built in", if descriptor.built_in { "yes" } else { "no" });
  match orchestrator.estimate_output_size(file) {
    Some(size) => print_stat("Estimated size", &format!("~{}", format_bytes(size))),
    None => print_stat("Estimated size", "unknown (file missing)"),
  }
  match Platform::current() {
    Some(platform) => print_stat("Platform", &platform.to_string()),
    None => print_stat("Platform", "unsupported"),
  }
  Ok(())
}
