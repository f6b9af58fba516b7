//! `exeforge profile` subcommands.

use anyhow::{Context, Result, bail};
use clap::Args;

use exeforge_lib::Orchestrator;
use exeforge_lib::state::BuildProfile;

use crate::output::{print_json, print_success};

#[derive(Args)]
pub struct SaveArgs {
  pub name: String,

  /// Start from an existing profile instead of the defaults
  #[arg(long)]
  pub from: Option<String>,

  #[arg(long)]
  pub console: Option<bool>,
  #[arg(long)]
  pub admin: Option<bool>,
  #[arg(long)]
  pub single_file: Option<bool>,
  #[arg(long)]
  pub version: Option<String>,
  #[arg(long)]
  pub company: Option<String>,
  #[arg(long)]
  pub copyright: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub product: Option<String>,
}

impl SaveArgs {
  fn apply(self, mut profile: BuildProfile) -> BuildProfile {
    if let Some(console) = self.console {
      profile.console = console;
    }
    if let Some(admin) = self.admin {
      profile.admin = admin;
    }
    if let Some(single_file) = self.single_file {
      profile.single_file = single_file;
    }
    let texts = [
      (self.version, &mut profile.version),
      (self.company, &mut profile.company),
      (self.copyright, &mut profile.copyright),
      (self.description, &mut profile.description),
      (self.product, &mut profile.product),
    ];
    for (value, field) in texts {
      if let Some(value) = value {
        *field = value;
      }
    }
    profile
  }
}

pub fn cmd_list() -> Result<()> {
  let orchestrator = Orchestrator::new();
  let default = orchestrator.settings().default_profile;
  for name in orchestrator.profile_names() {
    let marker = if name == default { " (default)" } else { "" };
    println!("{}{}", name, marker);
  }
  Ok(())
}

pub fn cmd_show(name: &str) -> Result<()> {
  let orchestrator = Orchestrator::new();
  match orchestrator.load_profile(name) {
    Some(profile) => print_json(&profile),
    None => bail!("Unknown profile: {}", name),
  }
}

pub fn cmd_save(args: SaveArgs) -> Result<()> {
  let orchestrator = Orchestrator::new();
  let base = match &args.from {
    Some(from) => orchestrator
      .load_profile(from)
      .with_context(|| format!("Unknown profile: {}", from))?,
    None => orchestrator.load_profile(&args.name).unwrap_or_default(),
  };
  let name = args.name.clone();
  let profile = args.apply(base);
  orchestrator
    .save_profile(&name, profile)
    .with_context(|| format!("Failed to save profile {}", name))?;
  print_success(&format!("Saved profile {}", name.trim()));
  Ok(())
}
