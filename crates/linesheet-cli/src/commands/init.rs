//! Module for writing a starter configuration.

use super::*;

/// Arguments for [`Commands::Init`]
#[derive(Args, Clone)]
pub struct InitOptions {
  /// Directory to write `linesheet.toml` and `taxonomy.toml` into. Defaults to the directory of
  /// the configuration file.
  #[arg(long)]
  pub dir: Option<PathBuf>,
}

/// Function for the [`Commands::Init`] in the CLI.
pub fn init<I: UserInteraction>(interaction: &I, options: InitOptions) -> Result<()> {
  let dir = match options.dir {
    Some(dir) => dir,
    None => Config::default_path().parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
  };
  std::fs::create_dir_all(&dir)?;

  let config_path = dir.join(CONFIG_FILE);
  let taxonomy_path = dir.join(TAXONOMY_FILE);
  if (config_path.exists() || taxonomy_path.exists())
    && !interaction.confirm(&format!(
      "Configuration already exists in {}, do you want to overwrite it?",
      dir.display()
    ))?
  {
    interaction.reply(ResponseContent::Info("Keeping the existing configuration"))?;
    return Ok(());
  }

  // The written config points at the taxonomy written next to it.
  let config = DEFAULT_CONFIG.replacen("# taxonomy_path", "taxonomy_path", 1);
  std::fs::write(&config_path, config)?;
  std::fs::write(&taxonomy_path, BUILTIN_TAXONOMY)?;
  debug!("Wrote {} and {}", config_path.display(), taxonomy_path.display());

  interaction.reply(ResponseContent::Success(&format!(
    "Wrote configuration to {}\nEdit {} to change the attribute taxonomy",
    config_path.display(),
    taxonomy_path.display()
  )))
}
