mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::compile::CompileArgs;

/// exeforge - turn scripts into standalone executables
#[derive(Parser)]
#[command(name = "exeforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug diagnostics
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a script into an executable
  Compile(CompileArgs),

  /// Compile several scripts, each next to its source
  Batch {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },

  /// List supported toolchains and whether they are installed
  Toolchains {
    #[command(flatten)]
    json: JsonFlag,
  },

  /// Check whether the toolchain for an extension is usable
  Probe {
    /// File extension, e.g. `py` or `.ps1`
    ext: String,
    #[command(flatten)]
    json: JsonFlag,
  },

  /// Install the toolchain for an extension
  Install {
    ext: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
  },

  /// Show the toolchain and estimated output size for a source file
  Info { file: PathBuf },

  /// Manage build profiles
  #[command(subcommand)]
  Profile(ProfileCommand),

  /// Show recently compiled files
  Recent,

  /// Show build history
  History {
    #[arg(short, long)]
    limit: Option<usize>,
    #[command(flatten)]
    json: JsonFlag,
  },

  /// Show or change settings
  #[command(subcommand)]
  Settings(SettingsCommand),
}

#[derive(Args)]
struct JsonFlag {
  /// Print machine-readable JSON
  #[arg(long)]
  json: bool,
}

#[derive(Subcommand)]
enum ProfileCommand {
  /// List profile names
  List,
  /// Show one profile
  Show { name: String },
  /// Create or replace a profile
  Save(cmd::profile::SaveArgs),
}

#[derive(Subcommand)]
enum SettingsCommand {
  /// Print all settings
  Show,
  /// Set one setting; the value is parsed as JSON when possible
  Set { key: String, value: String },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Compile(args) => cmd::cmd_compile(args),
    Commands::Batch { files } => cmd::cmd_batch(&files),
    Commands::Toolchains { json } => cmd::cmd_toolchains(json.json),
    Commands::Probe { ext, json } => cmd::cmd_probe(&ext, json.json),
    Commands::Install { ext, yes } => cmd::cmd_install(&ext, yes),
    Commands::Info { file } => cmd::cmd_info(&file),
    Commands::Profile(ProfileCommand::List) => cmd::profile::cmd_list(),
    Commands::Profile(ProfileCommand::Show { name }) => cmd::profile::cmd_show(&name),
    Commands::Profile(ProfileCommand::Save(args)) => cmd::profile::cmd_save(args),
    Commands::Recent => cmd::cmd_recent(),
    Commands::History { limit, json } => cmd::cmd_history(limit, json.json),
    Commands::Settings(SettingsCommand::Show) => cmd::settings::cmd_show(),
    Commands::Settings(SettingsCommand::Set { key, value }) => cmd::settings::cmd_set(&key, &value),
  }
}
