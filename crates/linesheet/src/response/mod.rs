//! Normalization of generative model output.
//!
//! Models asked for JSON return it in a handful of recurring shapes: a clean tool-call
//! payload, strict JSON, JSON inside markdown fences, JSON surrounded by chatty prose, or JSON
//! that lost its enclosing braces. [`normalize`] turns all of them into a JSON object through a
//! fixed pipeline and records which step succeeded:
//!
//! 1. [`ParsePath::Structured`]: tool-call arguments, parsed as-is
//! 2. [`ParsePath::Direct`]: text with fences stripped
//! 3. [`ParsePath::SynthesizedBraces`]: the text wrapped in braces, when it does not start
//!    with `{`
//! 4. [`ParsePath::BraceSpan`]: the greedy first-`{`-to-last-`}` span
//!
//! If nothing parses, the result is a [`LinesheetError::ParseFailure`] carrying the offending
//! text, which callers treat as a transient failure and retry.
//!
//! # Examples
//!
//! ```
//! use linesheet::{
//!   response::{normalize, ParsePath},
//!   ModelResponse,
//! };
//!
//! let raw = "Here you go!\n```json\n{\"product_title\": \"X\"}\n```\nLet me know.";
//! let normalized = normalize(&ModelResponse::Text(raw.into())).unwrap();
//! assert_eq!(normalized.map["product_title"], "X");
//! assert_eq!(normalized.path, ParsePath::BraceSpan);
//! ```

use super::*;

pub mod repair;

pub use repair::{brace_span, parse_object, strip_fences, synthesize_braces};

/// The normalization step that produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePath {
  /// Tool-call arguments parsed directly
  Structured,
  /// Fence-stripped text parsed directly
  Direct,
  /// Greedy brace span parsed
  BraceSpan,
  /// Text wrapped in synthesized braces parsed
  SynthesizedBraces,
}

impl Display for ParsePath {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Structured => write!(f, "structured"),
      Self::Direct => write!(f, "direct"),
      Self::BraceSpan => write!(f, "brace span"),
      Self::SynthesizedBraces => write!(f, "synthesized braces"),
    }
  }
}

/// A successfully normalized model response.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
  /// The parsed JSON object, possibly empty
  pub map:  Map<String, Value>,
  /// Which step produced it
  pub path: ParsePath,
}

/// Normalizes a model response into a JSON object.
///
/// # Errors
///
/// Returns [`LinesheetError::ParseFailure`] if no step yields a JSON object.
pub fn normalize(response: &ModelResponse) -> Result<Normalized> {
  match response {
    ModelResponse::ToolCall(arguments) => match parse_object(arguments) {
      Ok(map) => {
        debug!("Parsed model response via {}", ParsePath::Structured);
        Ok(Normalized { map, path: ParsePath::Structured })
      },
      // A malformed tool payload still gets the repair treatment.
      Err(reason) => {
        warn!("Tool-call arguments did not parse ({reason}), attempting repair");
        normalize_text(arguments)
      },
    },
    ModelResponse::Text(text) => normalize_text(text),
  }
}

/// Runs the repair pipeline over free text.
///
/// # Errors
///
/// Returns [`LinesheetError::ParseFailure`] if no step yields a JSON object.
pub fn normalize_text(raw: &str) -> Result<Normalized> {
  let text = strip_fences(raw);
  if text.is_empty() {
    return Err(LinesheetError::ParseFailure { text, reason: "empty response".into() });
  }

  let mut candidates: Vec<(ParsePath, String)> = vec![(ParsePath::Direct, text.clone())];
  if let Some(wrapped) = synthesize_braces(&text) {
    candidates.push((ParsePath::SynthesizedBraces, wrapped));
  }
  if let Some(span) = brace_span(&text) {
    if span != text {
      candidates.push((ParsePath::BraceSpan, span.to_string()));
    }
  }

  let mut reason = String::new();
  for (path, candidate) in candidates {
    match parse_object(&candidate) {
      Ok(map) => {
        debug!("Parsed model response via {path}");
        return Ok(Normalized { map, path });
      },
      Err(e) => {
        trace!("Parse via {path} failed: {e}");
        reason = e;
      },
    }
  }

  Err(LinesheetError::ParseFailure { text, reason })
}

/// Normalizes every value of a parsed mapping into an [`AttributeValue`].
///
/// Keys are trimmed; keys that end up empty are dropped.
pub fn normalize_attributes(map: &Map<String, Value>) -> BTreeMap<String, AttributeValue> {
  map
    .iter()
    .filter(|(key, _)| !key.trim().is_empty())
    .map(|(key, value)| (key.trim().to_string(), AttributeValue::from_json(value)))
    .collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn text(raw: &str) -> Result<Normalized> { normalize(&ModelResponse::Text(raw.to_string())) }

  #[traced_test]
  #[test]
  fn test_structured_payload() {
    let normalized =
      normalize(&ModelResponse::ToolCall("{\"product_title\": \"X\"}".into())).unwrap();
    assert_eq!(normalized.path, ParsePath::Structured);
    assert_eq!(normalized.map["product_title"], "X");
    assert!(logs_contain("via structured"));
  }

  #[test]
  fn test_well_formed_json_round_trips() {
    let blob = json!({
      "product_title": "Floral Midi Dress",
      "description": "Flowy.",
      "hashtags": ["#floral", "#midi"],
      "attributes": {"fabric": "Chiffon"}
    });
    let normalized = text(&blob.to_string()).unwrap();
    assert_eq!(normalized.path, ParsePath::Direct);
    assert_eq!(Value::Object(normalized.map), blob);
  }

  #[test]
  fn test_fences_and_prose_are_repaired() {
    let bare = text("{\"product_title\": \"X\"}").unwrap();
    let fenced = text("```json\n{\"product_title\": \"X\"}\n```").unwrap();
    let prose = text("Sure! Here it is:\n```json\n{\"product_title\": \"X\"}\n```\nThanks").unwrap();

    assert_eq!(fenced.map, bare.map);
    assert_eq!(fenced.path, ParsePath::Direct);
    assert_eq!(prose.map, bare.map);
    assert_eq!(prose.path, ParsePath::BraceSpan);
  }

  #[test]
  fn test_missing_braces_are_synthesized() {
    let normalized = text("\"product_title\": \"X\",\n\"product_type\": \"Dress\"").unwrap();
    assert_eq!(normalized.path, ParsePath::SynthesizedBraces);
    assert_eq!(normalized.map["product_type"], "Dress");
  }

  #[test]
  fn test_missing_braces_with_nested_object() {
    let normalized = text("\"product_title\": \"X\", \"attributes\": {\"fabric\": \"Silk\"}").unwrap();
    assert_eq!(normalized.path, ParsePath::SynthesizedBraces);
    assert_eq!(normalized.map["attributes"]["fabric"], "Silk");
  }

  #[test]
  fn test_malformed_tool_call_falls_back_to_repair() {
    let normalized = normalize(&ModelResponse::ToolCall("\"color\": \"Red\"".into())).unwrap();
    assert_eq!(normalized.path, ParsePath::SynthesizedBraces);
  }

  #[test]
  fn test_garbage_is_a_parse_failure() {
    match text("I'm sorry, I can't help with that.") {
      Err(LinesheetError::ParseFailure { text, .. }) =>
        assert_eq!(text, "I'm sorry, I can't help with that."),
      other => panic!("expected a parse failure, got {other:?}"),
    }
    assert!(matches!(text(""), Err(LinesheetError::ParseFailure { .. })));
    assert!(matches!(text("[1, 2, 3]"), Err(LinesheetError::ParseFailure { .. })));
  }

  #[test]
  fn test_empty_object_is_a_valid_mapping() {
    assert!(text("{}").unwrap().map.is_empty());
  }

  #[test]
  fn test_normalize_attributes() {
    let map = json!({"color": "Red", "dress_length": ["Midi", "Mini"], " ": "x", "x": null});
    let attributes = normalize_attributes(map.as_object().unwrap());
    assert_eq!(attributes.len(), 3);
    assert_eq!(attributes["color"], AttributeValue::Single("Red".into()));
    assert_eq!(attributes["dress_length"].values(), ["Midi", "Mini"]);
    assert!(attributes["x"].is_missing());
  }
}
