//! Attribute taxonomy: definitions, label parsing and key resolution.
//!
//! A taxonomy is the fixed, ordered list of marketplace attributes a product can be
//! classified with. Each attribute is declared by a display label that doubles as a tiny
//! grammar:
//!
//! ```text
//! TOP: Sleeve Length (1)
//! ^^^  ^^^^^^^^^^^^^ ^^^
//! |    |             selection limit (defaults to 1)
//! |    name
//! scope (optional, global when absent)
//! ```
//!
//! Taxonomies are loaded once at startup, either from a TOML file or from the bundled
//! marketplace taxonomy, and are immutable afterwards. They are passed by reference into the
//! [`RowFormatter`](crate::row::RowFormatter) and the [`Pipeline`](crate::Pipeline).
//!
//! # Examples
//!
//! ```toml
//! [scopes]
//! top = ["top", "tops", "blouse"]
//!
//! [[attributes]]
//! key    = "sleeve_length"
//! label  = "TOP: Sleeve Length (1)"
//! values = ["3/4 Sleeve", "Short Sleeve", "Long Sleeve", "Sleeveless"]
//! ```

use std::collections::HashSet;

use super::*;
use crate::category::ScopeAliases;

/// The taxonomy bundled with the crate.
pub const BUILTIN_TAXONOMY: &str = include_str!("../config/taxonomy.toml");

lazy_static! {
  /// Trailing `(N)` selection limit on a label.
  static ref LIMIT_SUFFIX: Regex = Regex::new(r"\(\s*(\d+)\s*\)\s*$").unwrap();
  /// Runs of characters that are not part of a key slug.
  static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Parses the selection limit out of a label.
///
/// Labels ending in a parenthesized integer, such as `"Occasion Theme (3)"`, yield that
/// integer. Labels without one yield `1`. A limit of zero is not meaningful and is clamped to
/// `1`.
///
/// # Examples
///
/// ```
/// use linesheet::taxonomy::parse_selection_limit;
///
/// assert_eq!(parse_selection_limit("Occasion Theme (3)"), 3);
/// assert_eq!(parse_selection_limit("Season"), 1);
/// ```
pub fn parse_selection_limit(label: &str) -> usize {
  let Some(captures) = LIMIT_SUFFIX.captures(label) else { return 1 };
  match captures[1].parse::<usize>() {
    Ok(0) => {
      warn!("Selection limit of 0 is not allowed in \"{label}\", using 1");
      1
    },
    Ok(limit) => limit,
    Err(_) => 1,
  }
}

/// Parses the optional `"SCOPE: "` prefix of a label.
///
/// The scope is lower-cased and trimmed. Labels without a colon are global and return
/// `None`.
///
/// # Examples
///
/// ```
/// use linesheet::taxonomy::parse_scope;
///
/// assert_eq!(parse_scope("TOP: Sleeve Length (1)").as_deref(), Some("top"));
/// assert_eq!(parse_scope("Color (1)"), None);
/// ```
pub fn parse_scope(label: &str) -> Option<String> {
  let (scope, _) = label.split_once(':')?;
  let scope = scope.trim().to_lowercase();
  (!scope.is_empty()).then_some(scope)
}

/// Strips the scope prefix and the limit suffix from a label.
fn label_name(label: &str) -> String {
  let without_scope = match label.split_once(':') {
    Some((scope, rest)) if !scope.trim().is_empty() => rest,
    _ => label,
  };
  LIMIT_SUFFIX.replace(without_scope, "").trim().to_string()
}

/// Turns free text into a lower-case `snake_case` key.
///
/// ```
/// use linesheet::taxonomy::slugify;
///
/// assert_eq!(slugify("Skirt & Dress Length"), "skirt_dress_length");
/// assert_eq!(slugify("  *Rise Style "), "rise_style");
/// ```
pub fn slugify(text: &str) -> String {
  NON_SLUG.replace_all(&text.to_lowercase(), "_").trim_matches('_').to_string()
}

/// A single attribute of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
  /// Identifier the model is asked to use for this attribute
  pub key:             String,
  /// Display label, also used as the column header
  pub label:           String,
  /// Lower-cased category scope, `None` for global attributes
  pub scope:           Option<String>,
  /// Maximum number of values a product may carry for this attribute
  pub selection_limit: usize,
  /// Fixed enumeration of values, in declared order
  pub allowed_values:  Vec<String>,
}

impl AttributeDefinition {
  /// Builds a definition from its label, deriving scope, limit and key.
  pub fn new(label: impl Into<String>, allowed_values: Vec<String>) -> Self {
    let label = label.into();
    Self {
      key: slugify(&label_name(&label)),
      scope: parse_scope(&label),
      selection_limit: parse_selection_limit(&label),
      allowed_values,
      label,
    }
  }

  /// Replaces the derived key with an explicit one.
  pub fn with_key(mut self, key: impl Into<String>) -> Self {
    self.key = key.into();
    self
  }

  /// The label without its scope prefix and limit suffix.
  pub fn name(&self) -> String { label_name(&self.label) }

  /// Whether this attribute applies to every category.
  pub fn is_global(&self) -> bool { self.scope.is_none() }

  /// Returns the allowed value matching `value` case-insensitively, if any.
  pub fn allowed(&self, value: &str) -> Option<&str> {
    let value = value.trim();
    self.allowed_values.iter().find(|v| v.eq_ignore_ascii_case(value)).map(String::as_str)
  }

  /// Flattens a normalized value into individual selections for this attribute.
  ///
  /// A single string that is not itself an allowed value is treated as a comma list. Values
  /// matching an allowed value are rewritten to its canonical spelling, blanks and
  /// case-insensitive duplicates are dropped, and the result is capped at the selection
  /// limit.
  pub fn selections(&self, value: &AttributeValue) -> Vec<String> {
    let raw = match value {
      AttributeValue::Missing => Vec::new(),
      AttributeValue::Single(s) if self.allowed(s).is_some() => vec![s.clone()],
      AttributeValue::Single(s) => s.split(',').map(str::to_string).collect(),
      AttributeValue::Multiple(values) => values.clone(),
    };

    let mut selected: Vec<String> = Vec::new();
    for candidate in raw {
      let candidate = candidate.trim();
      if candidate.is_empty() {
        continue;
      }
      let canonical = self.allowed(candidate).unwrap_or(candidate).to_string();
      if !selected.iter().any(|s| s.eq_ignore_ascii_case(&canonical)) {
        selected.push(canonical);
      }
    }
    selected.truncate(self.selection_limit);
    selected
  }

  /// Keys under which a model might plausibly refer to this attribute, all slugged.
  ///
  /// Scoped attributes are also known by their scope followed by the full name or its last
  /// word, so `"dress: skirt & dress length"` answers to `dress_length`.
  fn lookup_keys(&self) -> Vec<String> {
    let name = slugify(&self.name());
    let mut keys = vec![
      slugify(&self.key),
      slugify(&self.label),
      slugify(&LIMIT_SUFFIX.replace(&self.label, "")),
      name.clone(),
    ];
    if let Some(scope) = self.scope.as_deref().map(slugify).filter(|scope| !scope.is_empty()) {
      keys.push(format!("{scope}_{name}"));
      if let Some(last) = name.rsplit('_').next().filter(|last| !last.is_empty()) {
        keys.push(format!("{scope}_{last}"));
      }
    }
    keys
  }
}

/// On-disk representation of a taxonomy file.
#[derive(Debug, Deserialize)]
struct TaxonomyFile {
  /// Scope alias overrides
  #[serde(default)]
  scopes:     BTreeMap<String, Vec<String>>,
  /// Attributes in column order
  #[serde(default)]
  attributes: Vec<AttributeEntry>,
}

/// One `[[attributes]]` entry of a taxonomy file.
#[derive(Debug, Deserialize)]
struct AttributeEntry {
  /// Explicit key, derived from the label when absent
  #[serde(default)]
  key:    Option<String>,
  /// Display label
  label:  String,
  /// Allowed values
  #[serde(default)]
  values: Vec<String>,
}

/// The immutable, ordered set of attribute definitions used to classify products.
#[derive(Debug, Clone)]
pub struct Taxonomy {
  /// Definitions in declared (column) order
  attributes: Vec<AttributeDefinition>,
  /// Category aliases per scope
  aliases:    ScopeAliases,
}

impl Taxonomy {
  /// Creates a taxonomy from definitions, using the default scope aliases.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::InvalidTaxonomy`] if there are no definitions or if two
  /// definitions share a key or a label.
  pub fn new(attributes: Vec<AttributeDefinition>) -> Result<Self> {
    if attributes.is_empty() {
      return Err(LinesheetError::InvalidTaxonomy("taxonomy has no attributes".into()));
    }

    let mut keys = HashSet::new();
    let mut labels = HashSet::new();
    for attribute in &attributes {
      if !keys.insert(attribute.key.to_lowercase()) {
        return Err(LinesheetError::InvalidTaxonomy(format!(
          "duplicate attribute key \"{}\"",
          attribute.key
        )));
      }
      if !labels.insert(attribute.label.to_lowercase()) {
        return Err(LinesheetError::InvalidTaxonomy(format!(
          "duplicate attribute label \"{}\"",
          attribute.label
        )));
      }
    }

    Ok(Self { attributes, aliases: ScopeAliases::default() })
  }

  /// Creates a taxonomy from the flat `label -> values` representation, deriving keys.
  ///
  /// ```
  /// use linesheet::taxonomy::Taxonomy;
  ///
  /// let taxonomy = Taxonomy::from_labels([
  ///   ("Color (1)", vec!["Red", "Blue"]),
  ///   ("Dress: Skirt & Dress Length (1)", vec!["Midi", "Mini"]),
  /// ])
  /// .unwrap();
  /// assert_eq!(taxonomy.header(), ["Style Number", "Color (1)", "Dress: Skirt & Dress Length (1)"]);
  /// ```
  pub fn from_labels<I, L, V>(labels: I) -> Result<Self>
  where
    I: IntoIterator<Item = (L, Vec<V>)>,
    L: Into<String>,
    V: Into<String>, {
    Self::new(
      labels
        .into_iter()
        .map(|(label, values)| {
          AttributeDefinition::new(label, values.into_iter().map(Into::into).collect())
        })
        .collect(),
    )
  }

  /// Parses a taxonomy from TOML text.
  pub fn from_toml_str(toml_str: &str) -> Result<Self> {
    let file: TaxonomyFile = toml::from_str(toml_str)?;
    let attributes = file
      .attributes
      .into_iter()
      .map(|entry| {
        let definition = AttributeDefinition::new(entry.label, entry.values);
        match entry.key {
          Some(key) => definition.with_key(key),
          None => definition,
        }
      })
      .collect();

    let mut aliases = ScopeAliases::default();
    aliases.extend(file.scopes);
    Ok(Self::new(attributes)?.with_aliases(aliases))
  }

  /// Loads a taxonomy file.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::TaxonomyNotFound`] if the file does not exist, which callers
  /// treat as fatal at startup.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(LinesheetError::TaxonomyNotFound(path.to_path_buf()));
    }
    debug!("Loading taxonomy from {}", path.display());
    Self::from_toml_str(&std::fs::read_to_string(path)?)
  }

  /// The bundled marketplace taxonomy.
  pub fn builtin() -> Result<Self> { Self::from_toml_str(BUILTIN_TAXONOMY) }

  /// Replaces the scope alias table.
  pub fn with_aliases(mut self, aliases: ScopeAliases) -> Self {
    self.aliases = aliases;
    self
  }

  /// Definitions in column order.
  pub fn attributes(&self) -> &[AttributeDefinition] { &self.attributes }

  /// The scope alias table used for applicability.
  pub fn aliases(&self) -> &ScopeAliases { &self.aliases }

  /// Number of attributes.
  pub fn len(&self) -> usize { self.attributes.len() }

  /// Whether the taxonomy has no attributes. Always false for a constructed taxonomy.
  pub fn is_empty(&self) -> bool { self.attributes.is_empty() }

  /// Output header: `"Style Number"` followed by every label in declared order.
  pub fn header(&self) -> Vec<String> {
    std::iter::once(STYLE_NUMBER_COLUMN.to_string())
      .chain(self.attributes.iter().map(|a| a.label.clone()))
      .collect()
  }

  /// Finds a definition by exact key.
  pub fn get(&self, key: &str) -> Option<&AttributeDefinition> {
    self.attributes.iter().find(|a| a.key == key)
  }

  /// Column index of the definition a model-supplied key refers to.
  ///
  /// Matching is case-insensitive and tolerant of formatting: the key is compared, slugged,
  /// against each definition's key, label, label without limit, and name. An exact key match
  /// wins over the looser forms.
  pub fn resolve_index(&self, key: &str) -> Option<usize> {
    let slug = slugify(key);
    if slug.is_empty() {
      return None;
    }
    self
      .attributes
      .iter()
      .position(|a| slugify(&a.key) == slug)
      .or_else(|| self.attributes.iter().position(|a| a.lookup_keys().contains(&slug)))
  }

  /// The definition a model-supplied key refers to, see [`Taxonomy::resolve_index`].
  pub fn resolve(&self, key: &str) -> Option<&AttributeDefinition> {
    self.resolve_index(key).map(|index| &self.attributes[index])
  }

  /// Whether `definition` applies to a product of `category`.
  pub fn is_applicable(&self, category: &str, definition: &AttributeDefinition) -> bool {
    self.aliases.is_applicable(category, definition.scope.as_deref())
  }

  /// Definitions that apply to `category`, in column order.
  pub fn applicable<'a>(
    &'a self,
    category: &'a str,
  ) -> impl Iterator<Item = &'a AttributeDefinition> + 'a {
    self.attributes.iter().filter(move |a| self.is_applicable(category, a))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_limit_parsing() {
    assert_eq!(parse_selection_limit("Color (1)"), 1);
    assert_eq!(parse_selection_limit("Aesthetic (2)"), 2);
    assert_eq!(parse_selection_limit("Occasion Theme (3)"), 3);
    assert_eq!(parse_selection_limit("TOP: Sleeve Length (12)"), 12);
    assert_eq!(parse_selection_limit("Occasion Theme ( 3 ) "), 3);
  }

  #[test]
  fn test_selection_limit_defaults_to_one() {
    assert_eq!(parse_selection_limit("Season"), 1);
    assert_eq!(parse_selection_limit("Dress: Skirt & Dress Length"), 1);
    assert_eq!(parse_selection_limit("Size (S) Chart"), 1);
    assert_eq!(parse_selection_limit(""), 1);
  }

  #[traced_test]
  #[test]
  fn test_zero_limit_is_clamped() {
    assert_eq!(parse_selection_limit("Broken (0)"), 1);
    assert!(logs_contain("Selection limit of 0"));
  }

  #[test]
  fn test_scope_parsing() {
    assert_eq!(parse_scope("TOP: Sleeve Length (1)").as_deref(), Some("top"));
    assert_eq!(parse_scope("Dress: Skirt & Dress Length").as_deref(), Some("dress"));
    assert_eq!(parse_scope("Shorts: *Rise Style").as_deref(), Some("shorts"));
    assert_eq!(parse_scope("Pants Length"), None);
    assert_eq!(parse_scope(": Orphan"), None);
  }

  #[test]
  fn test_definition_from_label() {
    let definition = AttributeDefinition::new("Dress: Skirt & Dress Length (1)", vec![]);
    assert_eq!(definition.key, "skirt_dress_length");
    assert_eq!(definition.scope.as_deref(), Some("dress"));
    assert_eq!(definition.selection_limit, 1);
    assert_eq!(definition.name(), "Skirt & Dress Length");
    assert!(!definition.is_global());
  }

  #[test]
  fn test_selections_split_and_canonicalize() {
    let definition = AttributeDefinition::new("Aesthetic (2)", vec![
      "Casual".into(),
      "Glam".into(),
      "Classic".into(),
    ]);

    let value = AttributeValue::Single("casual, GLAM, classic".into());
    assert_eq!(definition.selections(&value), ["Casual", "Glam"]);

    let value = AttributeValue::Multiple(vec!["Glam".into(), "glam".into(), " ".into()]);
    assert_eq!(definition.selections(&value), ["Glam"]);

    assert!(definition.selections(&AttributeValue::Missing).is_empty());
  }

  #[test]
  fn test_selections_keep_allowed_values_with_commas() {
    let definition = AttributeDefinition::new("Theme", vec!["Cats, Dogs & Other Pets".into()]);
    let value = AttributeValue::Single("cats, dogs & other pets".into());
    assert_eq!(definition.selections(&value), ["Cats, Dogs & Other Pets"]);
  }

  #[test]
  fn test_builtin_taxonomy() {
    let taxonomy = Taxonomy::builtin().unwrap();
    assert_eq!(taxonomy.len(), 19);

    let header = taxonomy.header();
    assert_eq!(header[0], STYLE_NUMBER_COLUMN);
    assert_eq!(header[1], "Color (1)");
    assert_eq!(header.len(), taxonomy.len() + 1);

    let sleeve = taxonomy.get("sleeve_length").unwrap();
    assert_eq!(sleeve.scope.as_deref(), Some("top"));
    assert_eq!(sleeve.selection_limit, 1);
    assert_eq!(taxonomy.get("occasion_theme").unwrap().selection_limit, 3);
  }

  #[test]
  fn test_builtin_values_are_canonical() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let neckline = taxonomy.get("neckline").unwrap();
    assert_eq!(neckline.allowed("turtleneck"), Some("Turtleneck"));
    assert_eq!(neckline.allowed("v-neck"), Some("V-neck"));
    assert_eq!(neckline.allowed("Trutleneck"), None);
    assert_eq!(taxonomy.get("aesthetic").unwrap().allowed("V-neck"), None);
    assert_eq!(taxonomy.resolve("rise_style").unwrap().allowed("medium"), Some("Medium"));
  }

  #[test]
  fn test_skirt_and_pants_scopes_use_default_aliases() {
    let taxonomy = Taxonomy::from_labels([
      ("SKIRT: Waist (1)", vec!["High", "Low"]),
      ("PANTS: Inseam (1)", vec!["Short", "Regular"]),
    ])
    .unwrap();
    let applicable = |category: &str| -> Vec<String> {
      taxonomy.applicable(category).map(|a| a.key.clone()).collect()
    };

    assert_eq!(applicable("Pleated Skirts"), ["waist"]);
    assert_eq!(applicable("Wide Leg Trousers"), ["inseam"]);
    assert_eq!(applicable("Skinny Jeans"), ["inseam"]);
    assert!(applicable("Dress").is_empty());
  }

  #[test]
  fn test_resolve_is_case_and_format_insensitive() {
    let taxonomy = Taxonomy::builtin().unwrap();
    assert_eq!(taxonomy.resolve("color").unwrap().key, "color");
    assert_eq!(taxonomy.resolve("COLOR (1)").unwrap().key, "color");
    assert_eq!(taxonomy.resolve("Occasion Theme").unwrap().key, "occasion_theme");
    assert_eq!(taxonomy.resolve("TOP: Sleeve Length").unwrap().key, "sleeve_length");
    assert_eq!(taxonomy.resolve("skirt & dress length").unwrap().key, "dress_length");
    assert!(taxonomy.resolve("fabric").is_none());
    assert!(taxonomy.resolve("  ").is_none());
  }

  #[test]
  fn test_scoped_short_keys_resolve() {
    let taxonomy = Taxonomy::from_labels([
      ("color (1)", vec!["Red"]),
      ("dress: skirt & dress length (1)", vec!["Midi", "Mini", "Maxi"]),
      ("TOP: Sleeve Length (1)", vec!["Short Sleeve"]),
    ])
    .unwrap();

    assert_eq!(taxonomy.get("skirt_dress_length").unwrap().label, "dress: skirt & dress length (1)");
    assert_eq!(taxonomy.resolve_index("dress_length"), Some(1));
    assert_eq!(taxonomy.resolve_index("Dress Skirt & Dress Length"), Some(1));
    assert_eq!(taxonomy.resolve_index("top_length"), Some(2));
    assert_eq!(taxonomy.resolve_index("sleeve_length"), Some(2));
    assert_eq!(taxonomy.resolve_index("red_length"), None);
  }

  #[test]
  fn test_duplicate_keys_are_rejected() {
    let result = Taxonomy::from_labels([("Color", vec!["Red"]), ("color", vec!["Blue"])]);
    assert!(matches!(result, Err(LinesheetError::InvalidTaxonomy(_))));
  }

  #[test]
  fn test_empty_taxonomy_is_rejected() {
    let result = Taxonomy::from_toml_str("");
    assert!(matches!(result, Err(LinesheetError::InvalidTaxonomy(_))));
  }

  #[test]
  fn test_missing_file_is_reported() {
    let result = Taxonomy::from_file("does/not/exist.toml");
    assert!(matches!(result, Err(LinesheetError::TaxonomyNotFound(_))));
  }

  #[test]
  fn test_toml_scopes_extend_defaults() {
    let taxonomy = Taxonomy::from_toml_str(
      r#"
[scopes]
jumpsuit = ["jumpsuit", "romper"]

[[attributes]]
label = "Jumpsuit: Leg Style"
values = ["Wide", "Straight"]

[[attributes]]
label = "TOP: Sleeve Length (1)"
"#,
    )
    .unwrap();

    let leg = taxonomy.get("leg_style").unwrap();
    assert!(taxonomy.is_applicable("Denim Romper", leg));
    let sleeve = taxonomy.get("sleeve_length").unwrap();
    assert!(taxonomy.is_applicable("Cami Top", sleeve));
  }

  #[test]
  fn test_applicable_filters_scoped_attributes() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let keys: Vec<_> = taxonomy.applicable("Unknown").map(|a| a.key.as_str()).collect();
    assert!(keys.contains(&"color"));
    assert!(!keys.contains(&"sleeve_length"));
    assert!(!keys.contains(&"dress_length"));

    let keys: Vec<_> = taxonomy.applicable("Mini Dress").map(|a| a.key.as_str()).collect();
    assert!(keys.contains(&"dress_length"));
  }
}
