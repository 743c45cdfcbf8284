//! Attribute rows: one product's taxonomy selections laid out as a table row.
//!
//! A [`RowFormatter`] turns a [`ProductRecord`] into an [`AttributeRow`] whose cells line up
//! with [`Taxonomy::header`]. Rows produced from the same taxonomy always have the same width
//! and column order: attributes that do not apply to a product are left blank, never omitted.
//!
//! Mandatory attributes are the exception to blanking. They are always filled with exactly
//! their selection limit of values, padded with `"N/A"` when the model gave fewer (see
//! [`enforce_required_attributes`]).

use super::*;
use crate::sink::Table;

/// Listing column holding the product title.
pub const TITLE_COLUMN: &str = "Product Title";

/// Listing column holding the product description.
pub const DESCRIPTION_COLUMN: &str = "Product Description";

/// Listing columns a category is read from, in order of preference.
pub const CATEGORY_COLUMNS: [&str; 2] = ["Product Category", "Product Type"];

/// Category used when a product has none.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// A product on its way through attribute selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRecord {
  /// Catalog style number
  pub style_number:         String,
  /// Free-text category, possibly "Unknown"
  pub category:             String,
  /// Product title
  pub title:                String,
  /// Product description
  pub description:          String,
  /// Normalized model answers keyed by whatever the model called them
  pub raw_model_attributes: BTreeMap<String, AttributeValue>,
}

impl ProductRecord {
  /// Creates a record with no title, description or attributes.
  pub fn new(style_number: impl Into<String>, category: impl Into<String>) -> Self {
    Self { style_number: style_number.into(), category: category.into(), ..Default::default() }
  }

  /// Sets the title.
  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = title.into();
    self
  }

  /// Sets the description.
  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Sets the model answers.
  pub fn with_attributes(mut self, attributes: BTreeMap<String, AttributeValue>) -> Self {
    self.raw_model_attributes = attributes;
    self
  }

  /// Builds a record from a listing table row.
  ///
  /// The category is read from "Product Category", then "Product Type", and is
  /// [`UNKNOWN_CATEGORY`] when neither holds a usable value.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::MissingField`] if the style number, title or description is
  /// absent or blank.
  ///
  /// ```
  /// use std::collections::BTreeMap;
  ///
  /// use linesheet::row::ProductRecord;
  ///
  /// let row = BTreeMap::from([
  ///   ("Style Number".to_string(), "DZ24A1234".to_string()),
  ///   ("Product Title".to_string(), "Tiered Maxi".to_string()),
  ///   ("Product Description".to_string(), "Flowy.".to_string()),
  ///   ("Product Category".to_string(), "N/A".to_string()),
  ///   ("Product Type".to_string(), "Maxi Dress".to_string()),
  /// ]);
  /// let product = ProductRecord::from_listing_row(&row).unwrap();
  /// assert_eq!(product.category, "Maxi Dress");
  /// ```
  pub fn from_listing_row(row: &BTreeMap<String, String>) -> Result<Self> {
    let required = |column: &str| {
      row
        .get(column)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LinesheetError::MissingField(column.to_string()))
    };

    let style_number = required(STYLE_NUMBER_COLUMN)?;
    let title = required(TITLE_COLUMN)?;
    let description = required(DESCRIPTION_COLUMN)?;
    let category = CATEGORY_COLUMNS
      .iter()
      .filter_map(|column| row.get(*column))
      .map(|value| value.trim())
      .find(|value| !value.is_empty() && *value != NOT_AVAILABLE)
      .unwrap_or(UNKNOWN_CATEGORY);

    Ok(Self::new(style_number, category).with_title(title).with_description(description))
  }
}

/// One formatted row of the attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
  /// Style number followed by one cell per taxonomy attribute
  cells: Vec<String>,
}

impl AttributeRow {
  /// Every cell, style number first.
  pub fn cells(&self) -> &[String] { &self.cells }

  /// The style number cell.
  pub fn style_number(&self) -> &str { &self.cells[0] }

  /// The attribute cells, in taxonomy order.
  pub fn values(&self) -> &[String] { &self.cells[1..] }

  /// Number of cells, including the style number.
  pub fn len(&self) -> usize { self.cells.len() }

  /// Always false: a row has at least its style number.
  pub fn is_empty(&self) -> bool { self.cells.is_empty() }
}

impl From<AttributeRow> for Vec<String> {
  fn from(row: AttributeRow) -> Self { row.cells }
}

/// Formats products into rows of a fixed taxonomy.
#[derive(Debug, Clone)]
pub struct RowFormatter<'a> {
  /// Taxonomy defining the columns
  taxonomy:  &'a Taxonomy,
  /// Keys of attributes that are always filled
  mandatory: Vec<String>,
}

impl<'a> RowFormatter<'a> {
  /// Creates a formatter with no mandatory attributes.
  pub fn new(taxonomy: &'a Taxonomy) -> Self { Self { taxonomy, mandatory: Vec::new() } }

  /// Sets the keys of attributes that are always filled.
  pub fn with_mandatory<I, S>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    self.mandatory = keys.into_iter().map(Into::into).collect();
    self
  }

  /// Formats one product.
  ///
  /// Model keys are resolved against the taxonomy; unknown keys are ignored, and when
  /// several keys resolve to the same attribute the first one (in key order) wins.
  /// Attributes that do not apply to the product's category stay blank unless mandatory.
  pub fn format(&self, product: &ProductRecord) -> AttributeRow {
    let mut selection: BTreeMap<String, AttributeValue> = BTreeMap::new();
    for (key, value) in &product.raw_model_attributes {
      let Some(definition) = self.taxonomy.resolve(key) else {
        debug!("Ignoring unknown attribute \"{key}\" for {}", product.style_number);
        continue;
      };
      if selection.contains_key(&definition.key) {
        debug!("Ignoring duplicate answer \"{key}\" for {}", definition.label);
        continue;
      }
      selection.insert(definition.key.clone(), value.clone());
    }

    let mut cells = Vec::with_capacity(self.taxonomy.len() + 1);
    cells.push(product.style_number.clone());
    for definition in self.taxonomy.attributes() {
      let applicable = self.taxonomy.is_applicable(&product.category, definition);
      let cell = match selection.get(&definition.key) {
        Some(value) if applicable => definition.selections(value).join(", "),
        Some(_) => {
          trace!("{} does not apply to category \"{}\"", definition.label, product.category);
          String::new()
        },
        None => String::new(),
      };
      cells.push(cell);
    }

    for (key, values) in enforce_required_attributes(&selection, self.taxonomy, &self.mandatory)
    {
      if let Some(index) = self.taxonomy.resolve_index(&key) {
        cells[index + 1] = values.join(", ");
      }
    }

    AttributeRow { cells }
  }

  /// Formats every product into a table headed by [`Taxonomy::header`].
  pub fn table(&self, products: &[ProductRecord]) -> Table {
    let mut table = Table::new(self.taxonomy.header());
    for product in products {
      table.push_unchecked(self.format(product).into());
    }
    table
  }
}

/// Fills every mandatory attribute with exactly its selection limit of values.
///
/// `selection` is keyed by taxonomy key. For each mandatory key the model's answer is
/// flattened as in [`AttributeDefinition::selections`], then:
///
/// - no answer becomes `"N/A"` repeated to the limit
/// - a single answer is repeated to the limit
/// - several answers are cut to the limit or padded with `"N/A"`
///
/// Mandatory keys the taxonomy does not know are skipped with a warning. The result is keyed
/// by taxonomy key.
///
/// ```
/// use std::collections::BTreeMap;
///
/// use linesheet::{row::enforce_required_attributes, taxonomy::Taxonomy};
///
/// let taxonomy = Taxonomy::from_labels([("Occasion Theme (3)", vec!["Beach", "Party"])]).unwrap();
/// let filled = enforce_required_attributes(&BTreeMap::new(), &taxonomy, &["occasion_theme".into()]);
/// assert_eq!(filled["occasion_theme"], ["N/A", "N/A", "N/A"]);
/// ```
pub fn enforce_required_attributes(
  selection: &BTreeMap<String, AttributeValue>,
  taxonomy: &Taxonomy,
  mandatory: &[String],
) -> BTreeMap<String, Vec<String>> {
  let mut filled = BTreeMap::new();
  for key in mandatory {
    let Some(definition) = taxonomy.resolve(key) else {
      warn!("Mandatory attribute \"{key}\" is not in the taxonomy");
      continue;
    };
    let limit = definition.selection_limit;
    let value = selection.get(&definition.key).cloned().unwrap_or_default();
    let mut values = definition.selections(&value);

    values = match values.len() {
      0 => vec![NOT_AVAILABLE.to_string(); limit],
      1 if matches!(value, AttributeValue::Single(_)) => vec![values[0].clone(); limit],
      _ => {
        values.resize(limit, NOT_AVAILABLE.to_string());
        values
      },
    };
    filled.insert(definition.key.clone(), values);
  }
  filled
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dress_taxonomy() -> Taxonomy {
    Taxonomy::new(vec![
      AttributeDefinition::new("color (1)", vec!["Red".into(), "Blue".into()]).with_key("color"),
      AttributeDefinition::new("dress: skirt & dress length (1)", vec![
        "Midi".into(),
        "Mini".into(),
        "Maxi".into(),
      ])
      .with_key("dress_length"),
    ])
    .unwrap()
  }

  fn attributes(pairs: &[(&str, AttributeValue)]) -> BTreeMap<String, AttributeValue> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
  }

  #[test]
  fn test_dress_row() {
    let taxonomy = dress_taxonomy();
    let product = ProductRecord::new("DZ24A1234", "Dress").with_attributes(attributes(&[
      ("color", "Red".into()),
      ("dress_length", vec!["Midi".to_string(), "Mini".to_string()].into()),
    ]));

    let row = RowFormatter::new(&taxonomy).format(&product);
    assert_eq!(row.cells(), ["DZ24A1234", "Red", "Midi"]);
    assert_eq!(row.style_number(), "DZ24A1234");
  }

  #[test]
  fn test_dress_row_from_plain_labels() {
    let taxonomy = Taxonomy::from_labels([
      ("color (1)", vec!["Red", "Blue"]),
      ("dress: skirt & dress length (1)", vec!["Midi", "Mini", "Maxi"]),
    ])
    .unwrap();
    let product = ProductRecord::new("S1", "Dress").with_attributes(attributes(&[
      ("color", "Red".into()),
      ("dress_length", vec!["Midi".to_string(), "Mini".to_string()].into()),
    ]));

    let row = RowFormatter::new(&taxonomy).format(&product);
    assert_eq!(row.cells(), ["S1", "Red", "Midi"]);
  }

  #[test]
  fn test_inapplicable_columns_are_blank() {
    let taxonomy = dress_taxonomy();
    let product = ProductRecord::new("DZ24A1234", "Cami Top").with_attributes(attributes(&[
      ("Color", "red".into()),
      ("dress_length", "Midi".into()),
    ]));

    let row = RowFormatter::new(&taxonomy).format(&product);
    assert_eq!(row.values(), ["Red", ""]);
  }

  #[test]
  fn test_comma_lists_are_split_and_capped() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let product = ProductRecord::new("DZ24A1234", "Dress").with_attributes(attributes(&[
      ("Aesthetic (2)", "casual, Glam, Minimalist".into()),
      ("unrelated", "x".into()),
    ]));

    let row = RowFormatter::new(&taxonomy).format(&product);
    let index = taxonomy.resolve_index("aesthetic").unwrap() + 1;
    assert_eq!(row.cells()[index], "Casual, Glam");
  }

  #[test]
  fn test_rows_share_width_and_order() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let formatter = RowFormatter::new(&taxonomy).with_mandatory(["color", "occasion_theme"]);
    let products = [
      ProductRecord::new("A", "Dress"),
      ProductRecord::new("B", "").with_attributes(attributes(&[("season", "Summer".into())])),
      ProductRecord::new("C", "Hoodie")
        .with_attributes(attributes(&[("application_type", "Embroidery".into())])),
    ];

    let table = formatter.table(&products);
    assert_eq!(table.header(), taxonomy.header());
    assert!(table.rows().iter().all(|row| row.len() == taxonomy.len() + 1));
    assert_eq!(table.rows().iter().map(|r| r[0].as_str()).collect::<Vec<_>>(), ["A", "B", "C"]);
  }

  #[test]
  fn test_mandatory_padding() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let mandatory = ["occasion_theme".to_string(), "aesthetic".into(), "color".into()];

    let empty = enforce_required_attributes(&BTreeMap::new(), &taxonomy, &mandatory);
    assert_eq!(empty["occasion_theme"], [NOT_AVAILABLE; 3]);
    assert_eq!(empty["aesthetic"], [NOT_AVAILABLE; 2]);
    assert_eq!(empty["color"], [NOT_AVAILABLE]);

    let selection = attributes(&[
      ("occasion_theme", vec!["everyday".to_string()].into()),
      ("aesthetic", "Casual".into()),
    ]);
    let filled = enforce_required_attributes(&selection, &taxonomy, &mandatory);
    assert_eq!(filled["occasion_theme"], ["Everyday", NOT_AVAILABLE, NOT_AVAILABLE]);
    assert_eq!(filled["aesthetic"], ["Casual", "Casual"]);
  }

  #[traced_test]
  #[test]
  fn test_unknown_mandatory_key_is_skipped() {
    let taxonomy = dress_taxonomy();
    let filled = enforce_required_attributes(&BTreeMap::new(), &taxonomy, &["fit".to_string()]);
    assert!(filled.is_empty());
    assert!(logs_contain("Mandatory attribute \"fit\" is not in the taxonomy"));
  }

  #[test]
  fn test_mandatory_fills_inapplicable_columns() {
    let taxonomy = dress_taxonomy();
    let formatter = RowFormatter::new(&taxonomy).with_mandatory(["dress_length"]);
    let row = formatter.format(&ProductRecord::new("HF24B0001", "Shorts"));
    assert_eq!(row.cells(), ["HF24B0001", "", NOT_AVAILABLE]);
  }

  #[test]
  fn test_first_resolving_key_wins() {
    let taxonomy = dress_taxonomy();
    let product = ProductRecord::new("DZ24A1234", "Dress").with_attributes(attributes(&[
      ("Color (1)", "Blue".into()),
      ("color", "Red".into()),
    ]));
    let row = RowFormatter::new(&taxonomy).format(&product);
    assert_eq!(row.values()[0], "Blue");
  }

  #[test]
  fn test_listing_row_requires_fields() {
    let mut row = BTreeMap::from([
      (STYLE_NUMBER_COLUMN.to_string(), "DZ24A1234".to_string()),
      (TITLE_COLUMN.to_string(), "Tee".to_string()),
      (DESCRIPTION_COLUMN.to_string(), "  ".to_string()),
    ]);
    match ProductRecord::from_listing_row(&row) {
      Err(LinesheetError::MissingField(field)) => assert_eq!(field, DESCRIPTION_COLUMN),
      other => panic!("expected a missing field, got {other:?}"),
    }

    row.insert(DESCRIPTION_COLUMN.to_string(), "Soft.".to_string());
    let product = ProductRecord::from_listing_row(&row).unwrap();
    assert_eq!(product.category, UNKNOWN_CATEGORY);
    assert_eq!(product.description, "Soft.");
  }
}
