//! Error types for the linesheet command line tool.

use std::path::PathBuf;

use linesheet::error::LinesheetError;
use thiserror::Error;

/// Result alias used throughout the CLI.
pub type Result<T> = core::result::Result<T, LinesheetCliError>;

/// Errors that can occur while running a CLI command.
#[derive(Error, Debug)]
pub enum LinesheetCliError {
  /// Error from the linesheet library
  #[error(transparent)]
  Linesheet(#[from] LinesheetError),

  /// A file system operation failed
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A prompt could not be shown or answered
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// A catalog glob pattern was invalid
  #[error(transparent)]
  Pattern(#[from] glob::PatternError),

  /// A path matched by a catalog glob could not be read
  #[error(transparent)]
  Glob(#[from] glob::GlobError),

  /// No catalog files were found at the given location
  #[error("No catalog files found at {}", .0.display())]
  NoCatalogs(PathBuf),

  /// An argument was not usable
  #[error("{0}")]
  InvalidArgument(String),
}
