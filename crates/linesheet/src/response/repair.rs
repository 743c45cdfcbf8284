//! Heuristic repairs for model output that should have been JSON.
//!
//! None of this is real parsing. Each function produces one more candidate for strict JSON
//! parsing, and the caller decides the order they are tried in.

use super::*;

lazy_static! {
  /// Markdown code fence markers, with or without a language tag.
  static ref FENCE: Regex = Regex::new(r"(?i)```[ \t]*(?:json)?").unwrap();
}

/// Trims the text and removes every markdown fence marker in it.
pub fn strip_fences(text: &str) -> String { FENCE.replace_all(text.trim(), "").trim().to_string() }

/// The greedy span from the first `{` to the last `}`, if both exist in that order.
///
/// This intentionally does not track nesting depth, so prose containing braces on both sides
/// of the payload will defeat it.
pub fn brace_span(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (end > start).then(|| &text[start..=end])
}

/// Wraps text in braces, for payloads that lost their enclosing object.
///
/// Returns `None` when the text already starts with `{`.
pub fn synthesize_braces(text: &str) -> Option<String> {
  let text = text.trim().trim_end_matches(',');
  (!text.starts_with('{')).then(|| format!("{{{text}}}"))
}

/// Strictly parses `text` as a JSON object.
pub fn parse_object(text: &str) -> std::result::Result<Map<String, Value>, String> {
  match serde_json::from_str::<Value>(text) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(other) => Err(format!("expected a JSON object, found {}", json_kind(&other))),
    Err(e) => Err(e.to_string()),
  }
}

/// Name of a JSON value's type, for error messages.
fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
