//! Batch orchestration.
//!
//! A [`Pipeline`] runs the two model passes over one catalog, strictly one product at a
//! time:
//!
//! 1. **Description pass**: every catalog entry with images is described by the model and
//!    becomes a [`DescriptionRecord`]. Entries whose every attempt failed, or whose answer
//!    has no product title, are counted as failed and are left out of the listing table.
//! 2. **Attribute pass**: every listing row is classified against the taxonomy and becomes one
//!    row of the attribute table. Rows missing a style number, title or description are
//!    skipped; products whose every attempt failed still get a row, with only the mandatory
//!    attributes filled.
//!
//! Each pass returns a [`BatchReport`] with its counts.
//!
//! # Examples
//!
//! ```no_run
//! use linesheet::{catalog::JsonCatalog, sink::CsvSink, Config, Pipeline};
//!
//! # async fn run() -> linesheet::error::Result<()> {
//! let config = Config::from_file(Config::default_path())?;
//! let taxonomy = config.validate()?;
//! let client = config.chat_client()?;
//!
//! let pipeline = Pipeline::from_config(&client, &taxonomy, &config);
//! let mut sink = CsvSink::new("out");
//! let report = pipeline.run_catalog(&JsonCatalog::new("spring.json"), &[], &mut sink).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::{
  catalog::{CatalogSource, ProductEntry},
  description::{listing_table, DescriptionRecord},
  llm::{GenerationRequest, GenerativeModel},
  prompt::{
    attribute_prompt, description_prompt, description_tool, ATTRIBUTE_SYSTEM, DESCRIPTION_SYSTEM,
    DEFAULT_DESCRIPTION_TEMPLATE,
  },
  response::{normalize, normalize_attributes},
  retry::RetryPolicy,
  row::{ProductRecord, RowFormatter},
  sink::{Table, TabularSink},
};

/// Suffix of listing table names.
pub const LISTING_SUFFIX: &str = "listing";

/// Suffix of attribute table names.
pub const ATTRIBUTES_SUFFIX: &str = "attributes";

/// Outcome counts of one pass over a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  /// Name of the table the pass produced
  pub name:        String,
  /// Products that were processed without falling back
  pub succeeded:   usize,
  /// Products whose every attempt failed
  pub failed:      usize,
  /// Products that could not be processed at all
  pub skipped:     usize,
  /// When the pass started
  pub started_at:  DateTime<Utc>,
  /// When the pass finished
  pub finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
  /// Starts a report for the table `name`.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:        name.into(),
      succeeded:   0,
      failed:      0,
      skipped:     0,
      started_at:  Utc::now(),
      finished_at: None,
    }
  }

  /// Marks the pass as finished now.
  pub fn finish(mut self) -> Self {
    self.finished_at = Some(Utc::now());
    self
  }

  /// Number of products seen.
  pub fn total(&self) -> usize { self.succeeded + self.failed + self.skipped }

  /// Wall time of the pass, if it finished.
  pub fn elapsed(&self) -> Option<chrono::Duration> {
    self.finished_at.map(|finished| finished - self.started_at)
  }
}

impl Display for BatchReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}: {} succeeded, {} failed, {} skipped",
      self.name, self.succeeded, self.failed, self.skipped
    )?;
    if let Some(elapsed) = self.elapsed() {
      write!(f, " in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)?;
    }
    Ok(())
  }
}

/// Reports of a full catalog run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogReport {
  /// Description pass
  pub listing:    BatchReport,
  /// Attribute pass
  pub attributes: BatchReport,
}

impl Display for CatalogReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}\n{}", self.listing, self.attributes)
  }
}

/// Runs the description and attribute passes against a model.
pub struct Pipeline<'a, M: GenerativeModel + ?Sized> {
  /// The model both passes talk to
  model:                &'a M,
  /// Taxonomy attributes are selected from
  taxonomy:             &'a Taxonomy,
  /// Retry policy for every model call
  retry:                RetryPolicy,
  /// Keys of attributes that are always filled
  mandatory:            Vec<String>,
  /// Description prompt template
  description_template: String,
  /// Model override for the description pass
  description_model:    Option<String>,
  /// Model override for the attribute pass
  attribute_model:      Option<String>,
}

impl<'a, M: GenerativeModel + ?Sized> Pipeline<'a, M> {
  /// Creates a pipeline with the default retry policy, template and no mandatory attributes.
  pub fn new(model: &'a M, taxonomy: &'a Taxonomy) -> Self {
    Self {
      model,
      taxonomy,
      retry: RetryPolicy::default(),
      mandatory: Vec::new(),
      description_template: DEFAULT_DESCRIPTION_TEMPLATE.to_string(),
      description_model: None,
      attribute_model: None,
    }
  }

  /// Creates a pipeline set up from `config`.
  pub fn from_config(model: &'a M, taxonomy: &'a Taxonomy, config: &Config) -> Self {
    Self::new(model, taxonomy)
      .with_retry(config.retry_policy())
      .with_mandatory(config.mandatory_attributes.clone())
      .with_description_template(config.description_template())
      .with_models(&config.model.description_model, &config.model.attribute_model)
  }

  /// Sets the retry policy.
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Sets the keys of attributes that are always filled.
  pub fn with_mandatory(mut self, mandatory: Vec<String>) -> Self {
    self.mandatory = mandatory;
    self
  }

  /// Sets the description prompt template.
  pub fn with_description_template(mut self, template: impl Into<String>) -> Self {
    self.description_template = template.into();
    self
  }

  /// Sets the models used by the description and attribute passes.
  pub fn with_models(mut self, description: impl Into<String>, attribute: impl Into<String>) -> Self {
    self.description_model = Some(description.into());
    self.attribute_model = Some(attribute.into());
    self
  }

  /// Describes one catalog entry. Never fails: exhausted retries yield the fallback record.
  #[instrument(skip_all, fields(style_number = %entry.style_number, page = entry.page))]
  pub async fn describe(&self, entry: &ProductEntry, keywords: &[String]) -> DescriptionRecord {
    let style_number = entry.style_number.as_str();
    let prompt =
      match description_prompt(&self.description_template, style_number, keywords, &entry.text) {
        Ok(prompt) => prompt,
        Err(e) => {
          warn!("Cannot build description prompt: {e}");
          return DescriptionRecord::fallback(style_number);
        },
      };

    let mut request = GenerationRequest::new(prompt)
      .with_system(DESCRIPTION_SYSTEM)
      .with_images(entry.image_refs.iter().cloned())
      .with_tool(description_tool());
    if let Some(model) = &self.description_model {
      request = request.with_model(model);
    }

    let label = format!("Description of {style_number}");
    let mut record = self
      .retry
      .run_or(
        &label,
        |_| {
          let request = &request;
          async move {
            let response = self.model.generate(request).await?;
            DescriptionRecord::from_response(style_number, &response, keywords)
          }
        },
        DescriptionRecord::fallback(style_number),
      )
      .await;

    if record.product_category == NOT_AVAILABLE && !record.fallback {
      if let Some(category) = &entry.category {
        record.product_category = category.clone();
      }
    }
    record
  }

  /// Describes every entry of a catalog, in order.
  ///
  /// Returns the successful records, which make up the listing table, and the pass report.
  pub async fn describe_catalog(
    &self,
    name: &str,
    entries: &[ProductEntry],
    keywords: &[String],
  ) -> (Vec<DescriptionRecord>, BatchReport) {
    let mut report = BatchReport::new(format!("{name}.{LISTING_SUFFIX}"));
    let mut records = Vec::with_capacity(entries.len());

    for entry in entries {
      if entry.image_refs.is_empty() {
        warn!("Skipping page {} ({}): no images", entry.page, entry.style_number);
        report.skipped += 1;
        continue;
      }

      let record = self.describe(entry, keywords).await;
      if !record.is_listable() {
        warn!("No usable description for {}, leaving it out of the listing", entry.style_number);
        report.failed += 1;
      } else {
        report.succeeded += 1;
        records.push(record);
      }
    }

    let report = report.finish();
    info!("{report}");
    (records, report)
  }

  /// Asks the model for the attributes of one product.
  ///
  /// # Errors
  ///
  /// Returns the last error once every attempt failed.
  #[instrument(skip_all, fields(style_number = %product.style_number))]
  pub async fn select_attributes(
    &self,
    product: &ProductRecord,
  ) -> Result<BTreeMap<String, AttributeValue>> {
    let mut request =
      GenerationRequest::new(attribute_prompt(self.taxonomy, product)).with_system(ATTRIBUTE_SYSTEM);
    if let Some(model) = &self.attribute_model {
      request = request.with_model(model);
    }

    let label = format!("Attribute selection for {}", product.style_number);
    self
      .retry
      .run(&label, |_| {
        let request = &request;
        async move {
          let response = self.model.generate(request).await?;
          let normalized = normalize(&response)?;
          Ok(normalize_attributes(&normalized.map))
        }
      })
      .await
  }

  /// Builds the attribute table from listing rows.
  pub async fn attribute_table(&self, name: &str, listing: &Table) -> (Table, BatchReport) {
    let mut report = BatchReport::new(format!("{name}.{ATTRIBUTES_SUFFIX}"));
    let formatter = RowFormatter::new(self.taxonomy).with_mandatory(self.mandatory.iter().cloned());
    let mut table = Table::new(self.taxonomy.header());

    for (index, row) in listing.to_records().iter().enumerate() {
      let product = match ProductRecord::from_listing_row(row) {
        Ok(product) => product,
        Err(e) => {
          warn!("Skipping listing row {}: {e}", index + 1);
          report.skipped += 1;
          continue;
        },
      };

      let attributes = match self.select_attributes(&product).await {
        Ok(attributes) => {
          report.succeeded += 1;
          attributes
        },
        Err(e) => {
          warn!("No attributes for {}: {e}", product.style_number);
          report.failed += 1;
          BTreeMap::new()
        },
      };

      table.push_unchecked(formatter.format(&product.with_attributes(attributes)).into());
    }

    let report = report.finish();
    info!("{report}");
    (table, report)
  }

  /// Runs both passes over a catalog and writes `<name>.listing` and `<name>.attributes`.
  ///
  /// # Errors
  ///
  /// Fails only if the catalog cannot be read or a table cannot be written; per-product
  /// failures are counted in the report instead.
  pub async fn run_catalog(
    &self,
    source: &dyn CatalogSource,
    keywords: &[String],
    sink: &mut dyn TabularSink,
  ) -> Result<CatalogReport> {
    let name = source.name();
    let entries = source.entries()?;
    info!("Processing catalog {name} ({} entries)", entries.len());

    let (records, listing_report) = self.describe_catalog(&name, &entries, keywords).await;
    let listing = listing_table(&records);
    sink.write(&listing_report.name, &listing)?;

    let (attributes, attributes_report) = self.attribute_table(&name, &listing).await;
    sink.write(&attributes_report.name, &attributes)?;

    Ok(CatalogReport { listing: listing_report, attributes: attributes_report })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_report_display() {
    let mut report = BatchReport::new("spring.listing");
    report.succeeded = 2;
    report.failed = 1;
    assert_eq!(report.to_string(), "spring.listing: 2 succeeded, 1 failed, 0 skipped");
    assert_eq!(report.total(), 3);

    let finished = report.finish();
    assert!(finished.elapsed().is_some());
    assert!(finished.to_string().ends_with('s'));
  }
}
