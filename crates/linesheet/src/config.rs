//! Configuration loading and startup validation.
//!
//! Configuration lives in a single TOML file, by default at
//! `<config dir>/linesheet/linesheet.toml` (see [`Config::default_path`]). Every key is
//! optional:
//!
//! ```toml
//! taxonomy_path        = "taxonomy.toml"
//! mandatory_attributes = ["color", "aesthetic", "occasion", "occasion_theme"]
//!
//! [model]
//! description_model = "gpt-4o"
//! api_key_env       = "OPENAI_API_KEY"
//!
//! [retry]
//! max_attempts = 3
//! backoff_ms   = 2000
//! ```
//!
//! A missing configuration file is not an error: defaults are used with a warning. A
//! configured taxonomy file that does not exist, or an unset API key, is fatal and surfaces
//! before any catalog is touched.

use super::*;
use crate::{llm::ChatClient, prompt::DEFAULT_DESCRIPTION_TEMPLATE, retry::RetryPolicy};

/// The default configuration file written by `linesheet init`.
pub const DEFAULT_CONFIG: &str = include_str!("../config/linesheet.toml");

/// File name of the configuration file.
pub const CONFIG_FILE: &str = "linesheet.toml";

/// File name of the taxonomy file written next to it.
pub const TAXONOMY_FILE: &str = "taxonomy.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Taxonomy file, the built-in taxonomy when `None`
  pub taxonomy_path:        Option<PathBuf>,
  /// Keys of attributes that are always filled
  pub mandatory_attributes: Vec<String>,
  /// Pattern used to extract style numbers from catalog text
  pub style_number_pattern: String,
  /// Model endpoint settings
  pub model:                ModelConfig,
  /// Retry settings
  pub retry:                RetryConfig,
  /// Prompt overrides
  pub prompts:              PromptConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      taxonomy_path:        None,
      mandatory_attributes: ["color", "aesthetic", "occasion", "occasion_theme"]
        .iter()
        .map(|key| key.to_string())
        .collect(),
      style_number_pattern: catalog::DEFAULT_STYLE_PATTERN.to_string(),
      model:                ModelConfig::default(),
      retry:                RetryConfig::default(),
      prompts:              PromptConfig::default(),
    }
  }
}

/// Model endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  /// Base URL of an OpenAI-compatible API
  pub base_url:          String,
  /// Model used for descriptions, must accept images
  pub description_model: String,
  /// Model used for attribute selection
  pub attribute_model:   String,
  /// Environment variable holding the API key
  pub api_key_env:       String,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      base_url:          llm::DEFAULT_BASE_URL.to_string(),
      description_model: llm::DEFAULT_MODEL.to_string(),
      attribute_model:   llm::DEFAULT_MODEL.to_string(),
      api_key_env:       "OPENAI_API_KEY".to_string(),
    }
  }
}

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  /// Attempts per model call
  pub max_attempts: usize,
  /// Pause between attempts, in milliseconds
  pub backoff_ms:   u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    let policy = RetryPolicy::default();
    Self { max_attempts: policy.max_attempts, backoff_ms: policy.backoff.as_millis() as u64 }
  }
}

/// Prompt overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
  /// Description prompt template
  pub description: Option<String>,
}

impl Config {
  /// Default location of the configuration file.
  ///
  /// ```no_run
  /// let path = linesheet::Config::default_path();
  /// println!("Configuration is read from {}", path.display());
  /// ```
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("linesheet").join(CONFIG_FILE)
  }

  /// Parses configuration from TOML text. Relative paths are kept as written.
  pub fn from_toml_str(toml_str: &str) -> Result<Self> { Ok(toml::from_str(toml_str)?) }

  /// Loads a configuration file, falling back to defaults when it does not exist.
  ///
  /// A relative `taxonomy_path` is resolved against the file's directory.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.is_file() {
      warn!("No configuration at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    debug!("Loading configuration from {}", path.display());
    let mut config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.taxonomy_path =
      config.taxonomy_path.map(|taxonomy| if taxonomy.is_relative() { dir.join(taxonomy) } else { taxonomy });
    Ok(config)
  }

  /// Loads the configured taxonomy, or the built-in one.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::TaxonomyNotFound`] if a taxonomy file is configured but
  /// absent.
  pub fn load_taxonomy(&self) -> Result<Taxonomy> {
    match &self.taxonomy_path {
      Some(path) => Taxonomy::from_file(path),
      None => {
        debug!("Using the built-in taxonomy");
        Taxonomy::builtin()
      },
    }
  }

  /// Reads the API key from the configured environment variable.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::MissingCredential`] if the variable is unset or blank.
  pub fn api_key(&self) -> Result<String> {
    std::env::var(&self.model.api_key_env)
      .ok()
      .filter(|key| !key.trim().is_empty())
      .ok_or_else(|| LinesheetError::MissingCredential(self.model.api_key_env.clone()))
  }

  /// Chat client for the configured endpoint.
  pub fn chat_client(&self) -> Result<ChatClient> {
    Ok(
      ChatClient::new(self.api_key()?)
        .with_base_url(&self.model.base_url)
        .with_model(&self.model.description_model),
    )
  }

  /// The compiled style number pattern.
  pub fn style_pattern(&self) -> Result<Regex> { Ok(Regex::new(&self.style_number_pattern)?) }

  /// The configured retry policy.
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.retry.max_attempts, Duration::from_millis(self.retry.backoff_ms))
  }

  /// The description prompt template in effect.
  pub fn description_template(&self) -> &str {
    self.prompts.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION_TEMPLATE)
  }

  /// Checks everything that must hold before a batch starts, returning the taxonomy.
  ///
  /// # Errors
  ///
  /// - [`LinesheetError::TaxonomyNotFound`] if the configured taxonomy file is absent
  /// - [`LinesheetError::Config`] if a mandatory attribute is not in the taxonomy, or
  ///   `max_attempts` is zero
  /// - [`LinesheetError::Regex`] if the style number pattern does not compile
  /// - [`LinesheetError::Template`] if the description template uses an unknown placeholder
  pub fn validate(&self) -> Result<Taxonomy> {
    let taxonomy = self.load_taxonomy()?;

    let unknown: Vec<&str> = self
      .mandatory_attributes
      .iter()
      .filter(|key| taxonomy.resolve(key).is_none())
      .map(String::as_str)
      .collect();
    if !unknown.is_empty() {
      return Err(LinesheetError::Config(format!(
        "Mandatory attributes not in the taxonomy: {}",
        unknown.join(", ")
      )));
    }

    if self.retry.max_attempts == 0 {
      return Err(LinesheetError::Config("retry.max_attempts must be at least 1".into()));
    }

    self.style_pattern()?;
    prompt::description_prompt(self.description_template(), "", &[], "")?;

    info!(
      "Configuration valid: {} attributes, {} mandatory",
      taxonomy.len(),
      self.mandatory_attributes.len()
    );
    Ok(taxonomy)
  }
}
