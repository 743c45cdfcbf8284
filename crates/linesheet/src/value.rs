//! Normalized attribute values.
//!
//! Models answer attribute questions with strings, lists, numbers, nulls, or nothing at all.
//! [`AttributeValue`] is the single shape those answers are normalized into at the parser
//! boundary, so downstream code never has to inspect raw JSON types.

use super::*;

/// A normalized attribute answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
  /// No usable value was given
  #[default]
  Missing,
  /// A bare string, possibly a comma list
  Single(String),
  /// An explicit list of values
  Multiple(Vec<String>),
}

impl AttributeValue {
  /// Normalizes a raw JSON value.
  ///
  /// Strings are trimmed and become [`AttributeValue::Single`] unless blank. Numbers and
  /// booleans are rendered as strings. Arrays keep their scalar items (blank items and nested
  /// structures are dropped) and become [`AttributeValue::Multiple`] unless nothing is left.
  /// Nulls and objects are [`AttributeValue::Missing`].
  ///
  /// ```
  /// use linesheet::AttributeValue;
  /// use serde_json::json;
  ///
  /// assert_eq!(AttributeValue::from_json(&json!(" Red ")), AttributeValue::Single("Red".into()));
  /// assert_eq!(
  ///   AttributeValue::from_json(&json!(["Midi", "", "Mini"])),
  ///   AttributeValue::Multiple(vec!["Midi".into(), "Mini".into()])
  /// );
  /// assert_eq!(AttributeValue::from_json(&json!(null)), AttributeValue::Missing);
  /// ```
  pub fn from_json(value: &Value) -> Self {
    match value {
      Value::Array(items) => {
        let items: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
        if items.is_empty() {
          Self::Missing
        } else {
          Self::Multiple(items)
        }
      },
      Value::Object(_) => {
        trace!("Ignoring nested object where an attribute value was expected");
        Self::Missing
      },
      other => scalar_to_string(other).map_or(Self::Missing, Self::Single),
    }
  }

  /// Whether no value was given.
  pub fn is_missing(&self) -> bool { matches!(self, Self::Missing) }

  /// The value as a list: empty, one element, or every element.
  pub fn values(&self) -> Vec<String> {
    match self {
      Self::Missing => Vec::new(),
      Self::Single(value) => vec![value.clone()],
      Self::Multiple(values) => values.clone(),
    }
  }
}

/// Renders a scalar JSON value, `None` for blanks, nulls and containers.
fn scalar_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => {
      let s = s.trim();
      (!s.is_empty()).then(|| s.to_string())
    },
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}

impl From<&str> for AttributeValue {
  fn from(value: &str) -> Self { Self::from_json(&Value::String(value.to_string())) }
}

impl From<String> for AttributeValue {
  fn from(value: String) -> Self { Self::from_json(&Value::String(value)) }
}

impl From<Vec<String>> for AttributeValue {
  fn from(values: Vec<String>) -> Self {
    Self::from_json(&Value::Array(values.into_iter().map(Value::String).collect()))
  }
}

impl Display for AttributeValue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.values().join(", "))
  }
}
