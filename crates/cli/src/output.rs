//! CLI output formatting utilities.
//!
//! Colored status messages, human-readable sizes and build-log rendering.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use exeforge_lib::buildlog::{BuildLog, Severity};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Print each build-log line, colored by severity.
pub fn print_log(log: &BuildLog) {
  for line in log.lines() {
    let stamp = line.time.format("%H:%M:%S").to_string();
    let tag = line.severity.tag();
    let tag = match line.severity {
      Severity::Info => tag.if_supports_color(Stream::Stdout, |s| s.blue()).to_string(),
      Severity::Success => tag.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
      Severity::Warning => tag.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
      Severity::Error => tag.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    };
    println!(
      "{} {} {}",
      stamp.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      tag,
      line.message
    );
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
