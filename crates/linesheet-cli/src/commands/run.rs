//! Module for running both passes over catalogs.

use super::*;

/// Arguments for [`Commands::Run`]
#[derive(Args, Clone)]
pub struct RunOptions {
  /// A JSON catalog, or a directory of them
  pub catalog: PathBuf,

  /// Keyword file, one keyword per line
  #[arg(long)]
  pub keywords: Option<PathBuf>,

  /// Directory the tables are written to
  #[arg(long, short, default_value = ".")]
  pub output: PathBuf,
}

/// The catalog files a path refers to: the file itself, or every `*.json` in a directory.
pub fn catalog_files(path: &Path) -> Result<Vec<PathBuf>> {
  if !path.is_dir() {
    if !path.is_file() {
      return Err(LinesheetCliError::NoCatalogs(path.to_path_buf()));
    }
    return Ok(vec![path.to_path_buf()]);
  }

  let pattern = path.join("*.json");
  let mut files = glob::glob(&pattern.to_string_lossy())?.collect::<std::result::Result<Vec<_>, _>>()?;
  files.sort();
  if files.is_empty() {
    return Err(LinesheetCliError::NoCatalogs(path.to_path_buf()));
  }
  Ok(files)
}

/// Function for the [`Commands::Run`] in the CLI.
pub async fn run<I: UserInteraction>(
  interaction: &I,
  config: &Config,
  taxonomy: &Taxonomy,
  model: &dyn GenerativeModel,
  options: RunOptions,
) -> Result<()> {
  let RunOptions { catalog, keywords, output } = options;

  let files = catalog_files(&catalog)?;
  let keywords = match keywords {
    Some(path) => catalog::load_keywords(path)?,
    None => Vec::new(),
  };
  let style_pattern = config.style_pattern()?;

  let pipeline = Pipeline::from_config(model, taxonomy, config);
  let mut sink = CsvSink::new(&output);
  for file in files {
    interaction.reply(ResponseContent::Info(&format!("Processing {}", file.display())))?;
    let source = JsonCatalog::new(&file).with_style_pattern(style_pattern.clone());
    let report = pipeline.run_catalog(&source, &keywords, &mut sink).await?;
    info!("{report}");

    interaction.reply(ResponseContent::Report(&report.listing))?;
    interaction.reply(ResponseContent::Report(&report.attributes))?;
  }

  interaction.reply(ResponseContent::Success(&format!("Tables written to {}", output.display())))
}
