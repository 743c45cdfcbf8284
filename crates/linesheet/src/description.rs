//! Listing records: generated marketing copy for one product.
//!
//! A [`DescriptionRecord`] is what the description pass produces per catalog entry. It is
//! always complete: either every field comes from a normalized model response, or the whole
//! record is the [`DescriptionRecord::fallback`] with sentinel values. Partially-populated
//! records do not exist.
//!
//! Records are laid out for manual review by [`listing_table`], which adds character counts and
//! empty "Edit" columns next to the generated title and description.

use super::*;
use crate::sink::Table;

/// Maximum description length, in characters.
pub const DESCRIPTION_LIMIT: usize = 300;

/// Description used by fallback records.
pub const FAILED_DESCRIPTION: &str = "Failed to generate description.";

/// Product type forced for coordinated sets.
pub const SET_PRODUCT_TYPE: &str = "Set";

/// Free-form attribute columns requested alongside the description, in column order.
pub const DESCRIPTION_ATTRIBUTES: [&str; 5] = ["Fabric", "Silhouette", "Length", "Neckline", "Sleeve"];

/// Columns of the listing table, in order.
pub const LISTING_COLUMNS: [&str; 17] = [
  STYLE_NUMBER_COLUMN,
  "Product Name Character Count",
  "Product Title",
  "Edit Product Title",
  "Description Character Count",
  "Product Description",
  "Edit Product Description",
  "Tags",
  "Product Category",
  "Product Type",
  "Option2 Value",
  "Keywords",
  "Fabric",
  "Silhouette",
  "Length",
  "Neckline",
  "Sleeve",
];

/// Generated listing data for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
  /// Catalog style number, copied verbatim
  #[serde(rename = "Style Number")]
  pub style_number:     String,
  /// Generated title
  #[serde(rename = "Product Title")]
  pub product_title:    String,
  /// Generated description, at most [`DESCRIPTION_LIMIT`] characters
  #[serde(rename = "Product Description")]
  pub description:      String,
  /// Hashtags joined with ", "
  #[serde(rename = "Tags")]
  pub tags:             String,
  /// Category suggested by the model
  #[serde(rename = "Product Category")]
  pub product_category: String,
  /// Product type, "Set" for coordinated sets
  #[serde(rename = "Product Type")]
  pub product_type:     String,
  /// Single defining visible feature
  #[serde(rename = "Option2 Value")]
  pub option2_value:    String,
  /// Requested keywords that made it into the description, joined with ", "
  #[serde(rename = "Keywords")]
  pub keywords:         String,
  /// Free-form attributes keyed by column name ("Fabric", "Sleeve", ...)
  #[serde(flatten)]
  pub attributes:       BTreeMap<String, String>,
  /// Whether this is a fallback record
  #[serde(skip)]
  pub fallback:         bool,
}

impl DescriptionRecord {
  /// The record used when every attempt for a product failed.
  ///
  /// ```
  /// use linesheet::description::{DescriptionRecord, FAILED_DESCRIPTION};
  ///
  /// let record = DescriptionRecord::fallback("DZ24A1234");
  /// assert_eq!(record.product_title, "N/A");
  /// assert_eq!(record.description, FAILED_DESCRIPTION);
  /// assert!(record.fallback);
  /// ```
  pub fn fallback(style_number: impl Into<String>) -> Self {
    Self {
      style_number:     style_number.into(),
      product_title:    NOT_AVAILABLE.to_string(),
      description:      FAILED_DESCRIPTION.to_string(),
      tags:             NOT_AVAILABLE.to_string(),
      product_category: NOT_AVAILABLE.to_string(),
      product_type:     NOT_AVAILABLE.to_string(),
      option2_value:    NOT_AVAILABLE.to_string(),
      keywords:         NOT_AVAILABLE.to_string(),
      attributes:       BTreeMap::new(),
      fallback:         true,
    }
  }

  /// Builds a record from a normalized model mapping.
  ///
  /// Missing text fields become "N/A". The description is flattened to one line and
  /// truncated, and `keywords` is reduced to those actually used in it.
  pub fn from_map(style_number: &str, map: &Map<String, Value>, keywords: &[String]) -> Self {
    let text = |key: &str| match AttributeValue::from_json(map.get(key).unwrap_or(&Value::Null)) {
      AttributeValue::Missing => NOT_AVAILABLE.to_string(),
      value => value.to_string(),
    };

    let description = map
      .get("description")
      .and_then(Value::as_str)
      .map(truncate_description)
      .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let tags = map.get("hashtags").map(AttributeValue::from_json).unwrap_or_default().to_string();

    let product_type =
      if is_set(style_number) { SET_PRODUCT_TYPE.to_string() } else { text("product_type") };

    let attributes = map
      .get("attributes")
      .and_then(Value::as_object)
      .map(|attributes| {
        attributes
          .iter()
          .filter_map(|(key, value)| {
            let value = AttributeValue::from_json(value);
            (!value.is_missing()).then(|| (column_name(key), value.to_string()))
          })
          .collect()
      })
      .unwrap_or_default();

    Self {
      style_number: style_number.to_string(),
      product_title: text("product_title"),
      keywords: keywords_used(&description, keywords).join(", "),
      description,
      tags,
      product_category: text("product_category"),
      product_type,
      option2_value: text("key_attribute"),
      attributes,
      fallback: false,
    }
  }

  /// Normalizes a model response and builds a record from it.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::ParseFailure`] if the response cannot be normalized.
  pub fn from_response(
    style_number: &str,
    response: &ModelResponse,
    keywords: &[String],
  ) -> Result<Self> {
    let normalized = crate::response::normalize(response)?;
    Ok(Self::from_map(style_number, &normalized.map, keywords))
  }

  /// Like [`DescriptionRecord::from_response`], but never fails.
  ///
  /// ```
  /// use linesheet::{description::DescriptionRecord, ModelResponse};
  ///
  /// let garbage = ModelResponse::Text("<<<not json>>>".into());
  /// let record = DescriptionRecord::from_response_or_fallback("DZ24A1234", &garbage, &[]);
  /// assert_eq!(record, DescriptionRecord::fallback("DZ24A1234"));
  /// ```
  pub fn from_response_or_fallback(
    style_number: &str,
    response: &ModelResponse,
    keywords: &[String],
  ) -> Self {
    Self::from_response(style_number, response, keywords).unwrap_or_else(|e| {
      warn!("Using fallback record for {style_number}: {e}");
      Self::fallback(style_number)
    })
  }

  /// Whether the record belongs in a listing: not a fallback and with a title.
  ///
  /// ```
  /// use linesheet::description::DescriptionRecord;
  ///
  /// let untitled = DescriptionRecord::from_map("DZ24A1234", &Default::default(), &[]);
  /// assert!(!untitled.fallback);
  /// assert!(!untitled.is_listable());
  /// ```
  pub fn is_listable(&self) -> bool { !self.fallback && self.product_title != NOT_AVAILABLE }

  /// The value of a listing column, `None` for columns the record has no data for.
  pub fn column(&self, column: &str) -> Option<String> {
    let value = match column {
      STYLE_NUMBER_COLUMN => self.style_number.clone(),
      "Product Name Character Count" => self.product_title.chars().count().to_string(),
      "Product Title" => self.product_title.clone(),
      "Description Character Count" => self.description.chars().count().to_string(),
      "Product Description" => self.description.clone(),
      "Edit Product Title" | "Edit Product Description" => String::new(),
      "Tags" => self.tags.clone(),
      "Product Category" => self.product_category.clone(),
      "Product Type" => self.product_type.clone(),
      "Option2 Value" => self.option2_value.clone(),
      "Keywords" => self.keywords.clone(),
      other => return self.attributes.get(other).cloned(),
    };
    Some(value)
  }
}

/// Whether a style number denotes a coordinated set.
pub fn is_set(style_number: &str) -> bool { style_number.to_uppercase().contains("SET") }

/// Turns a model attribute key such as `"fabric"` into its column name (`"Fabric"`).
fn column_name(key: &str) -> String {
  key
    .split(|c: char| c == '_' || c.is_whitespace())
    .filter(|word| !word.is_empty())
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
      }
    })
    .collect::<Vec<String>>()
    .join(" ")
}

/// Flattens a description to one line and caps it at [`DESCRIPTION_LIMIT`] characters.
///
/// Longer descriptions keep their first `DESCRIPTION_LIMIT - 3` characters, lose trailing
/// whitespace at the cut, and end in `"..."`. Cutting counts characters, never bytes, so
/// multi-byte text is never split.
///
/// ```
/// use linesheet::description::truncate_description;
///
/// let long = "a".repeat(310);
/// let truncated = truncate_description(&long);
/// assert_eq!(truncated.chars().count(), 300);
/// assert!(truncated.ends_with("..."));
/// ```
pub fn truncate_description(text: &str) -> String {
  let flattened = text.replace(['\r', '\n'], " ");
  let flattened = flattened.trim();
  if flattened.chars().count() <= DESCRIPTION_LIMIT {
    return flattened.to_string();
  }

  let cut: String = flattened.chars().take(DESCRIPTION_LIMIT - 3).collect();
  format!("{}...", cut.trim_end())
}

/// The candidate keywords that appear in `description`, case-insensitively, in candidate order.
///
/// This is reported for audit only. Keywords are requested in the prompt but never injected.
pub fn keywords_used(description: &str, keywords: &[String]) -> Vec<String> {
  let description = description.to_lowercase();
  keywords
    .iter()
    .filter(|keyword| {
      let keyword = keyword.trim().to_lowercase();
      !keyword.is_empty() && description.contains(&keyword)
    })
    .cloned()
    .collect()
}

/// Lays records out as the listing review table.
///
/// Attribute columns a record has no value for are "N/A"; the edit columns are left empty.
pub fn listing_table(records: &[DescriptionRecord]) -> Table {
  let mut table = Table::new(LISTING_COLUMNS.iter().map(|c| c.to_string()).collect());
  for record in records {
    let row = LISTING_COLUMNS
      .iter()
      .map(|column| record.column(column).unwrap_or_else(|| NOT_AVAILABLE.to_string()))
      .collect();
    table.push_unchecked(row);
  }
  table
}
