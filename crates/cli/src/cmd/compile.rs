//! Implementation of the `exeforge compile` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::debug;

use exeforge_lib::Orchestrator;

use crate::output::{format_bytes, format_duration, print_error, print_log, print_success, print_warning, symbols};

#[derive(Args)]
pub struct CompileArgs {
  /// Script to compile
  pub source: PathBuf,

  /// Output directory (default: next to the source)
  #[arg(short, long)]
  pub output_dir: Option<PathBuf>,

  /// Executable name without extension (default: source file stem)
  #[arg(short, long)]
  pub name: Option<String>,

  /// Build profile to start from (default: the configured default profile)
  #[arg(short, long)]
  pub profile: Option<String>,

  /// Icon file embedded in the executable
  #[arg(long)]
  pub icon: Option<PathBuf>,

  /// Show a console window
  #[arg(long, conflicts_with = "no_console")]
  pub console: bool,

  /// Hide the console window
  #[arg(long)]
  pub no_console: bool,

  /// Request elevation when the executable starts
  #[arg(long)]
  pub admin: bool,

  /// Sign the executable with the configured certificate
  #[arg(long)]
  pub sign: bool,

  /// Write the build log to the desktop afterwards
  #[arg(long)]
  pub export_log: bool,
}

impl CompileArgs {
  /// Full path of the executable to produce.
  fn output_path(&self, source: &std::path::Path) -> PathBuf {
    let dir = self
      .output_dir
      .clone()
      .or_else(|| source.parent().map(PathBuf::from))
      .unwrap_or_default();
    let name = self.name.clone().unwrap_or_else(|| {
      source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string())
    });
    dir.join(format!("{}.exe", name.trim_end_matches(".exe")))
  }
}

pub fn cmd_compile(args: CompileArgs) -> Result<()> {
  let source = std::path::absolute(&args.source).context("Failed to resolve source path")?;
  let output = args.output_path(&source);

  let mut orchestrator = Orchestrator::new();
  let mut options = orchestrator.options_for(args.profile.as_deref());
  if args.console {
    options.profile.console = true;
  }
  if args.no_console {
    options.profile.console = false;
  }
  options.profile.admin |= args.admin;
  options.icon = args.icon.clone();
  options.sign = args.sign;
  debug!(name = %options.profile_name, profile = ?options.profile, "compile options");

  println!("{} {} {}", source.display(), symbols::ARROW, output.display());
  let started = Instant::now();
  let result = orchestrator.compile(&source, &output, options);
  let elapsed = started.elapsed();

  print_log(&result.log);
  println!();

  if args.export_log {
    match orchestrator.export_log(&result.log.to_string(), &source) {
      Ok(path) => print_success(&format!("Log exported to {}", path.display())),
      Err(e) => print_warning(&format!("Could not export log: {}", e)),
    }
  }

  match &result.failure {
    None => {
      print_success(&format!(
        "Built {} ({}) in {}",
        result.output.display(),
        format_bytes(result.size.unwrap_or_default()),
        format_duration(elapsed)
      ));
      for warning in &result.warnings {
        print_warning(warning);
      }
      Ok(())
    }
    Some(failure) => {
      print_error(&failure.to_string());
      bail!("compilation failed");
    }
  }
}
