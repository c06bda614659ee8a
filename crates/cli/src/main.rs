mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

/// sheaf - file bundling build orchestrator
#[derive(Parser)]
#[command(name = "sheaf")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project directory (default: current directory)
  #[arg(short = 'C', long, global = true)]
  dir: Option<PathBuf>,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the project's build targets
  Build {
    /// Path to the config file (default: sheaf.json, then package.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only the target at this index
    #[arg(short, long)]
    target: Option<usize>,
  },

  /// Resolve a module id to a file path
  Resolve {
    /// Module id, e.g. `lodash` or `./src/util`
    id: String,
  },

  /// Install packages that cannot be resolved
  Install {
    /// Package ids
    #[arg(required = true)]
    ids: Vec<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let dir = match cli.dir {
    Some(dir) => dir,
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };

  match cli.command {
    Commands::Build { config, target } => cmd::cmd_build(&dir, config.as_deref(), target, cli.output),
    Commands::Resolve { id } => cmd::cmd_resolve(&dir, &id, cli.output),
    Commands::Install { ids } => cmd::cmd_install(&dir, &ids),
  }
}
