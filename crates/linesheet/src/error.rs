//! Error types for the linesheet library.
//!
//! This module provides a single error type covering every failure mode of the
//! attribute pipeline:
//! - Loading and validating configuration and taxonomy files
//! - Talking to the generative model
//! - Parsing and repairing model output
//! - Reading and writing tables
//!
//! Only a few of these are fatal for a batch. Transient failures (network errors, rate
//! limits, [`LinesheetError::ParseFailure`]) are retried by a
//! [`RetryPolicy`](crate::retry::RetryPolicy) and then degrade to a fallback value for the
//! single product that failed.
//!
//! # Examples
//!
//! ```
//! use linesheet::{error::LinesheetError, response::normalize, ModelResponse};
//!
//! let result = normalize(&ModelResponse::Text("definitely not json".into()));
//! match result {
//!   Err(LinesheetError::ParseFailure { text, .. }) => println!("Could not repair: {text}"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(normalized) => println!("Parsed {} keys", normalized.map.len()),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Error type alias used for the [`linesheet`](crate) crate.
pub type Result<T> = core::result::Result<T, LinesheetError>;

/// Errors that can occur when working with the linesheet library.
#[derive(Error, Debug)]
pub enum LinesheetError {
  /// Model output could not be turned into a JSON object, even after repair.
  ///
  /// `text` holds the offending (already fence-stripped) text so it can be logged, and
  /// `reason` the last JSON error encountered.
  #[error("Failed to parse model output ({reason}): {text}")]
  ParseFailure {
    /// The text that failed to parse
    text:   String,
    /// Description of the last parse error
    reason: String,
  },

  /// An input row did not carry a column the pipeline needs.
  #[error("Missing required field \"{0}\"")]
  MissingField(String),

  /// A credential required to reach an external service is not set.
  ///
  /// The string holds the name of the environment variable that was checked.
  #[error("Required credential is not set: {0}")]
  MissingCredential(String),

  /// The configured taxonomy file does not exist.
  #[error("Taxonomy file not found: {}", .0.display())]
  TaxonomyNotFound(PathBuf),

  /// The taxonomy was readable but is not usable (duplicate keys, no attributes, ...).
  #[error("Invalid taxonomy: {0}")]
  InvalidTaxonomy(String),

  /// A prompt template referenced a placeholder that has no value.
  #[error("Unknown placeholder \"{{{0}}}\" in prompt template")]
  Template(String),

  /// The model API answered with something other than a usable completion.
  #[error("API error: {0}")]
  Api(String),

  /// A table row does not have as many cells as the table has columns.
  #[error("Row has {found} cells, expected {expected}")]
  RowWidth {
    /// Number of columns in the header
    expected: usize,
    /// Number of cells in the rejected row
    found:    usize,
  },

  /// Configuration is inconsistent or incomplete.
  #[error("{0}")]
  Config(String),

  /// A network request failed.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A JSON document could not be read or written.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A TOML document could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A CSV table could not be read or written.
  #[error(transparent)]
  Csv(#[from] csv::Error),

  /// A configured regular expression is invalid.
  #[error(transparent)]
  Regex(#[from] regex::Error),

  /// A temporary output file could not be moved into place.
  #[error(transparent)]
  Persist(#[from] tempfile::PersistError),
}
