//! Category matching for scoped attributes.
//!
//! Product categories come from a model or a catalog and are free text ("Cami Top",
//! "Floral Mini Dress", "Unknown"). Scoped attributes only apply when the category names
//! their scope, which is decided by case-insensitive substring matching against a small alias
//! table. Global attributes always apply, including to empty or unknown categories, so a
//! product with no detected category still gets every global column.

use super::*;

/// Default aliases per scope.
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
  ("top", &["top", "tops", "blouse", "cami", "shirt", "sweater"]),
  ("dress", &["dress", "dresses", "gown"]),
  ("shorts", &["shorts"]),
  ("hoodie", &["hoodie", "hoodies", "sweatshirt"]),
  ("skirt", &["skirt", "skirts"]),
  ("pants", &["pants", "trousers", "jeans", "leggings"]),
];

/// Alias table mapping a scope to the category substrings that select it.
///
/// A scope without an entry is its own only alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAliases {
  /// Lower-cased scope to lower-cased aliases
  table: BTreeMap<String, Vec<String>>,
}

impl Default for ScopeAliases {
  fn default() -> Self {
    let mut aliases = Self::empty();
    for (scope, names) in DEFAULT_ALIASES {
      aliases = aliases.with_scope(*scope, names.iter().copied());
    }
    aliases
  }
}

impl ScopeAliases {
  /// An alias table with no entries: every scope matches only its own name.
  pub fn empty() -> Self { Self { table: BTreeMap::new() } }

  /// Sets the aliases for `scope`, replacing any existing entry.
  pub fn with_scope<I, S>(mut self, scope: &str, aliases: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    self.insert(scope, aliases);
    self
  }

  /// Merges entries into the table, replacing existing scopes.
  pub fn extend(&mut self, entries: BTreeMap<String, Vec<String>>) {
    for (scope, aliases) in entries {
      self.insert(&scope, aliases);
    }
  }

  /// Normalizes and stores one entry.
  fn insert<I, S>(&mut self, scope: &str, aliases: I)
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    let aliases = aliases
      .into_iter()
      .map(|a| a.as_ref().trim().to_lowercase())
      .filter(|a| !a.is_empty())
      .collect();
    self.table.insert(scope.trim().to_lowercase(), aliases);
  }

  /// The aliases that select `scope`.
  pub fn aliases_for(&self, scope: &str) -> Vec<String> {
    let scope = scope.trim().to_lowercase();
    match self.table.get(&scope) {
      Some(aliases) if !aliases.is_empty() => aliases.clone(),
      _ => vec![scope],
    }
  }

  /// Whether an attribute with `scope` applies to a product of `category`.
  ///
  /// Global attributes (`scope == None`) always apply. Scoped attributes apply iff the
  /// lower-cased category contains one of the scope's aliases.
  pub fn is_applicable(&self, category: &str, scope: Option<&str>) -> bool {
    let Some(scope) = scope else { return true };
    let category = category.to_lowercase();
    if category.trim().is_empty() {
      return false;
    }
    self.aliases_for(scope).iter().any(|alias| category.contains(alias.as_str()))
  }
}

/// [`ScopeAliases::is_applicable`] with the default alias table.
///
/// ```
/// use linesheet::category::is_applicable;
///
/// assert!(is_applicable("dress style inputs", Some("dress")));
/// assert!(!is_applicable("mens pants", Some("dress")));
/// assert!(is_applicable("", None));
/// ```
pub fn is_applicable(category: &str, scope: Option<&str>) -> bool {
  ScopeAliases::default().is_applicable(category, scope)
}
