use super::*;

pub mod attributes;
pub mod init;
pub mod run;
pub mod taxonomy;

pub use attributes::{attributes, AttributesOptions};
pub use init::{init, InitOptions};
pub use run::{run, RunOptions};
pub use taxonomy::{taxonomy, TaxonomyOptions};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Write a default configuration and taxonomy
  Init(InitOptions),

  /// Describe and classify one catalog, or every `*.json` catalog in a directory
  Run(RunOptions),

  /// Classify the products of an existing listing table
  Attributes(AttributesOptions),

  /// Show the taxonomy and which attributes apply to a category
  Taxonomy(TaxonomyOptions),
}

/// Loads and validates the configuration, then builds the model client.
///
/// Fails before any catalog is read if the taxonomy file is missing or the API key is unset.
pub(crate) fn prepare(cli: &Cli) -> Result<(Config, Taxonomy, ChatClient)> {
  let config = cli.load_config()?;
  let taxonomy = config.validate()?;
  let client = config.chat_client()?;
  Ok((config, taxonomy, client))
}
