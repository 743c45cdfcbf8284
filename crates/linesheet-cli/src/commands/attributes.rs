//! Module for running the attribute pass over an existing listing table.

use super::*;

/// Arguments for [`Commands::Attributes`]
#[derive(Args, Clone)]
pub struct AttributesOptions {
  /// Listing table, as written by `linesheet run`
  pub listing: PathBuf,

  /// Directory the attribute table is written to
  #[arg(long, short, default_value = ".")]
  pub output: PathBuf,
}

/// Name of the catalog a listing file belongs to: `spring.listing.csv` becomes `spring`.
pub fn catalog_name(listing: &Path) -> String {
  let stem = listing.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
  stem.strip_suffix(&format!(".{}", linesheet::pipeline::LISTING_SUFFIX)).unwrap_or(stem.as_str()).to_string()
}

/// Function for the [`Commands::Attributes`] in the CLI.
pub async fn attributes<I: UserInteraction>(
  interaction: &I,
  config: &Config,
  taxonomy: &Taxonomy,
  model: &dyn GenerativeModel,
  options: AttributesOptions,
) -> Result<()> {
  let AttributesOptions { listing, output } = options;

  let table = sink::read_table(&listing)?;
  let name = catalog_name(&listing);
  interaction.reply(ResponseContent::Info(&format!(
    "Classifying {} products from {}",
    table.len(),
    listing.display()
  )))?;

  let pipeline = Pipeline::from_config(model, taxonomy, config);
  let (attributes, report) = pipeline.attribute_table(&name, &table).await;
  CsvSink::new(&output).write(&report.name, &attributes)?;

  interaction.reply(ResponseContent::Report(&report))?;
  interaction.reply(ResponseContent::Success(&format!(
    "Attribute table written to {}",
    output.join(format!("{}.csv", report.name)).display()
  )))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_catalog_name() {
    assert_eq!(catalog_name(Path::new("out/spring.listing.csv")), "spring");
    assert_eq!(catalog_name(Path::new("edited.csv")), "edited");
  }
}
