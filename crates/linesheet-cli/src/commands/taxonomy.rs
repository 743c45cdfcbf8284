//! Module for inspecting the taxonomy.

use super::*;

/// Arguments for [`Commands::Taxonomy`]
#[derive(Args, Clone)]
pub struct TaxonomyOptions {
  /// Product category to check attribute applicability for, e.g. "Maxi Dress"
  #[arg(long)]
  pub category: Option<String>,
}

/// Function for the [`Commands::Taxonomy`] in the CLI.
pub fn taxonomy<I: UserInteraction>(
  interaction: &I,
  config: &Config,
  options: TaxonomyOptions,
) -> Result<()> {
  let taxonomy = config.load_taxonomy()?;
  interaction.reply(ResponseContent::Taxonomy { taxonomy: &taxonomy, category: options.category.as_deref() })
}
