//! Command line batch runner for linesheet catalogs.
//!
//! This crate provides the `linesheet` binary on top of the [`linesheet`] library:
//! - Writing a starter configuration and taxonomy
//! - Running the description and attribute passes over catalogs
//! - Re-running the attribute pass over an edited listing table
//! - Inspecting the taxonomy and which attributes apply to a category
//!
//! # Usage
//!
//! ```bash
//! # Write linesheet.toml and taxonomy.toml to the default config directory
//! linesheet init
//!
//! # Describe and classify every catalog in a directory
//! linesheet run catalogs/ --keywords keywords.txt --output sheets/
//!
//! # Classify an edited listing table
//! linesheet attributes sheets/spring.listing.csv
//!
//! # Show which attributes apply to dresses
//! linesheet taxonomy --category "Maxi Dress"
//! ```
//!
//! Logging goes to stderr and is controlled with `-v` (repeatable) or `RUST_LOG`;
//! `--log-file` additionally writes it to a file.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use linesheet::{
  catalog::{self, JsonCatalog},
  config::{CONFIG_FILE, DEFAULT_CONFIG, TAXONOMY_FILE},
  llm::{ChatClient, GenerativeModel},
  pipeline::BatchReport,
  sink::{self, CsvSink, TabularSink},
  taxonomy::BUILTIN_TAXONOMY,
  Config, Pipeline, Taxonomy,
};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Generate listing and marketplace attribute sheets from catalogs")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Configuration file. Defaults to `linesheet.toml` in the platform config directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Also write logs to this file
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

impl Cli {
  /// Path of the configuration file in effect.
  fn config_path(&self) -> PathBuf { self.config.clone().unwrap_or_else(Config::default_path) }

  /// Loads the configuration file in effect.
  fn load_config(&self) -> Result<Config> { Ok(Config::from_file(self.config_path())?) }
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// When `log_file` is set, logs are also written there without colors. The returned guard
/// must be held until exit so buffered lines are flushed.
fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let (file_layer, guard) = match log_file {
    Some(path) => {
      let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
      std::fs::create_dir_all(dir)?;
      let file_name = path.file_name().ok_or_else(|| {
        LinesheetCliError::InvalidArgument(format!("not a file path: {}", path.display()))
      })?;
      let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
      (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    },
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true),
    )
    .with(file_layer)
    .init();

  Ok(guard)
}

/// Dispatches the parsed command.
async fn execute(cli: &Cli) -> Result<()> {
  match &cli.command {
    Commands::Init(options) => init(cli, options.clone()),
    Commands::Run(options) => {
      let (config, attribute_taxonomy, client) = prepare(cli)?;
      run(cli, &config, &attribute_taxonomy, &client, options.clone()).await
    },
    Commands::Attributes(options) => {
      let (config, attribute_taxonomy, client) = prepare(cli)?;
      attributes(cli, &config, &attribute_taxonomy, &client, options.clone()).await
    },
    Commands::Taxonomy(options) => taxonomy(cli, &cli.load_config()?, options.clone()),
  }
}

/// Entry point for the linesheet CLI application
///
/// Parses arguments, sets up logging and runs the requested command. Errors are printed to
/// stderr and turn into a non-zero exit code.
#[tokio::main]
async fn main() {
  let cli = Cli::parse();

  let guard = match setup_logging(cli.verbose, cli.log_file.as_deref()) {
    Ok(guard) => guard,
    Err(e) => {
      cli.reply(ResponseContent::Error(&e)).ok();
      std::process::exit(1);
    },
  };

  let result = execute(&cli).await;
  // Flush the log file before a possible exit, which skips destructors.
  drop(guard);

  if let Err(e) = result {
    cli.reply(ResponseContent::Error(&e)).ok();
    std::process::exit(1);
  }
}
