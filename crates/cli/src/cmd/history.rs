use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use exeforge_lib::Orchestrator;

use crate::output::{format_bytes, print_info, print_json, symbols};

pub fn cmd_history(limit: Option<usize>, json: bool) -> Result<()> {
  let orchestrator = Orchestrator::new();
  let entries = orchestrator.get_history(limit);

  if json {
    return print_json(&entries);
  }
  if entries.is_empty() {
    print_info("No builds recorded yet");
    return Ok(());
  }

  for entry in &entries {
    let mark = if entry.success {
      symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    } else {
      symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
    };
    let size = if entry.success {
      format_bytes(entry.size)
    } else {
      "-".to_string()
    };
    println!(
      "{} {} {:<12} {} {} {} {}",
      mark,
      entry.timestamp.format("%Y-%m-%d %H:%M"),
      entry.toolchain.as_str(),
      entry.source.display(),
      symbols::ARROW,
      entry.output.display(),
      format!("({}, {})", entry.profile, size).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  Ok(())
}
