//! Catalog input: the product entries a batch is built from, and keyword files.
//!
//! Extraction of entries from catalog documents sits behind the [`CatalogSource`] trait. The
//! crate ships [`JsonCatalog`], which reads entries that were already extracted into a JSON
//! array:
//!
//! ```json
//! [
//!   {
//!     "page": 1,
//!     "text": "DZ24A1234 Tiered maxi dress, 100% cotton",
//!     "images": ["https://cdn.example.com/dz24a1234.jpg"]
//!   }
//! ]
//! ```
//!
//! Entries that do not carry a style number get one extracted from their text.

use super::*;

/// Style number used when none can be found.
pub const UNKNOWN_STYLE: &str = "Unknown";

/// Default pattern for style numbers such as `DZ24A1234` or `HF24B5678-SET`.
pub const DEFAULT_STYLE_PATTERN: &str = r"\b((?:DZ|HF)\d{2}[A-Z]\d{3,5}(?:-SET|-D)?)\b";

lazy_static! {
  /// Compiled [`DEFAULT_STYLE_PATTERN`].
  static ref DEFAULT_STYLE_REGEX: Regex = Regex::new(DEFAULT_STYLE_PATTERN).unwrap();
}

/// One product as extracted from a catalog page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntry {
  /// 1-based catalog page
  #[serde(default)]
  pub page:         usize,
  /// Style number, extracted from `text` when the catalog does not provide one
  #[serde(default)]
  pub style_number: String,
  /// Category, when the catalog states one
  #[serde(default)]
  pub category:     Option<String>,
  /// Page text
  #[serde(default)]
  pub text:         String,
  /// Image URLs or data URIs
  #[serde(default, alias = "images")]
  pub image_refs:   Vec<String>,
}

/// Something product entries can be extracted from.
pub trait CatalogSource {
  /// Name of the catalog, used to name output tables.
  fn name(&self) -> String;

  /// Extracts every entry, in catalog order.
  fn entries(&self) -> Result<Vec<ProductEntry>>;
}

/// Extracts the first style number in `text`, or [`UNKNOWN_STYLE`].
///
/// The first capture group is used when the pattern has one, the whole match otherwise.
///
/// ```
/// use linesheet::catalog::{default_style_regex, extract_style_number};
///
/// let regex = default_style_regex();
/// assert_eq!(extract_style_number("Page 3 HF24B5678-SET knit", &regex), "HF24B5678-SET");
/// assert_eq!(extract_style_number("no style here", &regex), "Unknown");
/// ```
pub fn extract_style_number(text: &str, pattern: &Regex) -> String {
  pattern
    .captures(text)
    .and_then(|captures| captures.get(1).or_else(|| captures.get(0)))
    .map(|m| m.as_str().to_string())
    .unwrap_or_else(|| UNKNOWN_STYLE.to_string())
}

/// The compiled default style number pattern.
pub fn default_style_regex() -> Regex { DEFAULT_STYLE_REGEX.clone() }

/// A catalog stored as a JSON array of [`ProductEntry`] objects.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
  /// Path of the JSON file
  path:          PathBuf,
  /// Pattern used to fill in missing style numbers
  style_pattern: Regex,
}

impl JsonCatalog {
  /// Creates a catalog reading `path`, using the default style number pattern.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), style_pattern: default_style_regex() }
  }

  /// Sets the pattern used to fill in missing style numbers.
  pub fn with_style_pattern(mut self, pattern: Regex) -> Self {
    self.style_pattern = pattern;
    self
  }

  /// Path of the JSON file.
  pub fn path(&self) -> &Path { &self.path }
}

impl CatalogSource for JsonCatalog {
  fn name(&self) -> String {
    self
      .path
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_else(|| "catalog".to_string())
  }

  fn entries(&self) -> Result<Vec<ProductEntry>> {
    debug!("Reading catalog entries from {}", self.path.display());
    let content = std::fs::read_to_string(&self.path)?;
    let mut entries: Vec<ProductEntry> = serde_json::from_str(&content)?;

    for (index, entry) in entries.iter_mut().enumerate() {
      entry.text = entry.text.trim().to_string();
      if entry.page == 0 {
        entry.page = index + 1;
      }
      if entry.style_number.trim().is_empty() {
        entry.style_number = extract_style_number(&entry.text, &self.style_pattern);
        trace!("Page {} style number: {}", entry.page, entry.style_number);
      }
    }
    Ok(entries)
  }
}

/// Reads a keyword file: one keyword per line, trimmed, blank lines dropped.
pub fn load_keywords(path: impl AsRef<Path>) -> Result<Vec<String>> {
  let content = std::fs::read_to_string(path.as_ref())?;
  let keywords: Vec<String> = content
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(str::to_string)
    .collect();
  debug!("Loaded {} keywords from {}", keywords.len(), path.as_ref().display());
  Ok(keywords)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_style_number_extraction() {
    let regex = default_style_regex();
    assert_eq!(extract_style_number("DZ24A1234 floral", &regex), "DZ24A1234");
    assert_eq!(extract_style_number("see HF23C98765-D and DZ24A1111", &regex), "HF23C98765-D");
    assert_eq!(extract_style_number("XDZ24A1234", &regex), UNKNOWN_STYLE);

    let custom = Regex::new(r"SKU-\d+").unwrap();
    assert_eq!(extract_style_number("item SKU-42", &custom), "SKU-42");
  }

  #[test]
  fn test_json_catalog_fills_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spring.json");
    std::fs::write(
      &path,
      r#"[
        {"text": "  DZ24A1234 Tiered maxi  ", "images": ["https://x/1.jpg"]},
        {"page": 7, "style_number": "HF24B5678-SET", "category": "Top", "text": "Knit set"},
        {"text": "no style"}
      ]"#,
    )
    .unwrap();

    let catalog = JsonCatalog::new(&path);
    assert_eq!(catalog.name(), "spring");

    let entries = catalog.entries().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].page, 1);
    assert_eq!(entries[0].style_number, "DZ24A1234");
    assert_eq!(entries[0].text, "DZ24A1234 Tiered maxi");
    assert_eq!(entries[0].image_refs, ["https://x/1.jpg"]);
    assert_eq!(entries[1].page, 7);
    assert_eq!(entries[1].category.as_deref(), Some("Top"));
    assert!(entries[1].image_refs.is_empty());
    assert_eq!(entries[2].style_number, UNKNOWN_STYLE);
  }

  #[test]
  fn test_json_catalog_rejects_non_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"text": "x"}"#).unwrap();
    assert!(matches!(JsonCatalog::new(&path).entries(), Err(LinesheetError::Json(_))));
  }

  #[test]
  fn test_load_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keywords.txt");
    std::fs::write(&path, "boho dress\n\n  festival  \r\nsummer\n").unwrap();
    assert_eq!(load_keywords(&path).unwrap(), ["boho dress", "festival", "summer"]);
  }
}
