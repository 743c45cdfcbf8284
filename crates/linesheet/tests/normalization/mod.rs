use linesheet::{
  description::{DescriptionRecord, FAILED_DESCRIPTION},
  response::{normalize, normalize_attributes, ParsePath},
  row::{ProductRecord, RowFormatter},
};
use serde_json::json;

use super::*;

#[test]
fn test_every_shape_normalizes_to_the_same_row() {
  let taxonomy = Taxonomy::builtin().unwrap();
  let formatter = RowFormatter::new(&taxonomy);
  let payload = json!({"color": "red", "dress_length": ["Midi", "Mini"], "sleeve_length": "Short Sleeve"});

  let shapes = [
    (ModelResponse::ToolCall(payload.to_string()), ParsePath::Structured),
    (text(&payload.to_string()), ParsePath::Direct),
    (text(&format!("```json\n{payload}\n```")), ParsePath::Direct),
    (text(&format!("Here are the attributes:\n```json\n{payload}\n```\nHope this helps!")), ParsePath::BraceSpan),
  ];

  let mut rows = Vec::new();
  for (response, expected_path) in shapes {
    let normalized = normalize(&response).unwrap();
    assert_eq!(normalized.path, expected_path);
    let product = ProductRecord::new("DZ24A1234", "Maxi Dress")
      .with_attributes(normalize_attributes(&normalized.map));
    rows.push(formatter.format(&product));
  }

  assert!(rows.windows(2).all(|pair| pair[0] == pair[1]));
  let header = taxonomy.header();
  let cell = |name: &str| rows[0].cells()[header.iter().position(|h| h == name).unwrap()].clone();
  assert_eq!(cell("Color (1)"), "Red");
  assert_eq!(cell("Dress: Skirt & Dress Length"), "Midi");
  assert_eq!(cell("TOP: Sleeve Length (1)"), "");
}

#[traced_test]
#[test]
fn test_garbage_description_is_a_fallback() {
  for raw in ["", "Sorry, I can't do that.", "[\"a\", \"b\"]", "{\"product_title\": "] {
    let record = DescriptionRecord::from_response_or_fallback("HF24B5678-SET", &text(raw), &keywords());
    assert_eq!(record, DescriptionRecord::fallback("HF24B5678-SET"));
    assert_eq!(record.description, FAILED_DESCRIPTION);
  }
  assert!(logs_contain("Using fallback record for HF24B5678-SET"));
}
