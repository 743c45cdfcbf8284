//! Taxonomy-driven attribute selection for product linesheets.
//!
//! `linesheet` turns product-catalog batches into spreadsheet-shaped tables:
//!
//! - Marketing copy per product (title, description, tags) generated by a model
//! - Marketplace attributes per product, constrained by a fixed taxonomy
//! - Fault-tolerant normalization of whatever the model sends back
//!
//! # Features
//!
//! - **Scoped taxonomy**: attribute labels such as `"TOP: Sleeve Length (1)"` carry their
//!   category scope and selection limit, parsed once at load time
//! - **Category matching**: case-insensitive alias matching decides which attributes apply
//! - **Response repair**: tool-call payloads, fenced JSON, prose-wrapped JSON and JSON missing
//!   its braces all normalize to the same mapping
//! - **Rectangular output**: every row has the same columns in taxonomy order, with mandatory
//!   attributes padded to their selection limit
//! - **Bounded retries**: external calls are retried a fixed number of times, then degrade to a
//!   fallback record instead of aborting the batch
//!
//! # Getting Started
//!
//! ```
//! use linesheet::{
//!   response::{normalize, normalize_attributes},
//!   row::{ProductRecord, RowFormatter},
//!   taxonomy::Taxonomy,
//!   ModelResponse,
//! };
//!
//! # fn main() -> linesheet::error::Result<()> {
//! let taxonomy = Taxonomy::builtin()?;
//! let raw = ModelResponse::Text("```json\n{\"color\": \"Red\"}\n```".into());
//! let normalized = normalize(&raw)?;
//!
//! let product = ProductRecord::new("DZ24A1234", "Dress")
//!   .with_attributes(normalize_attributes(&normalized.map));
//! let row = RowFormatter::new(&taxonomy).format(&product);
//! assert_eq!(row.cells().len(), taxonomy.header().len());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`taxonomy`]: attribute definitions and label parsing
//! - [`category`]: scope aliases and applicability
//! - [`value`]: the [`AttributeValue`] union used after normalization
//! - [`response`]: model output normalization
//! - [`description`]: listing records, truncation and keyword usage
//! - [`row`]: attribute row formatting and mandatory padding
//! - [`retry`]: bounded retry policy
//! - [`llm`]: generative model collaborator and chat client
//! - [`prompt`]: prompt templates
//! - [`catalog`]: catalog entries and keyword files
//! - [`sink`]: tables and CSV output
//! - [`pipeline`]: batch orchestration
//! - [`config`]: configuration loading and startup validation

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::BTreeMap,
  fmt::Display,
  path::{Path, PathBuf},
  time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod catalog;
pub mod category;
pub mod config;
pub mod description;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod retry;
pub mod row;
pub mod sink;
pub mod taxonomy;
pub mod value;

pub use crate::{
  config::Config, llm::ModelResponse, pipeline::Pipeline, taxonomy::Taxonomy,
  value::AttributeValue,
};
use crate::{error::*, taxonomy::AttributeDefinition};

/// Header of the first column of every table this crate produces.
pub const STYLE_NUMBER_COLUMN: &str = "Style Number";

/// Sentinel used for values that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

/// Common traits and types for ergonomic imports.
///
/// ```
/// use linesheet::prelude::*;
///
/// fn example() -> Result<(), LinesheetError> {
///   let taxonomy = Taxonomy::builtin()?;
///   assert!(!taxonomy.is_empty());
///   Ok(())
/// }
/// # example().unwrap();
/// ```
pub mod prelude {
  pub use crate::{
    catalog::CatalogSource, error::LinesheetError, llm::GenerativeModel, sink::TabularSink,
    taxonomy::Taxonomy, value::AttributeValue,
  };
}
