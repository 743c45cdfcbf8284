//! Prompts for the two model passes.
//!
//! The description prompt is a user-overridable template with `{placeholder}` slots; the
//! attribute prompt is generated from the taxonomy so the model only ever sees the labels it
//! is allowed to answer with.

use serde_json::json;

use super::*;
use crate::{llm::ToolSchema, row::ProductRecord};

/// System message for the description pass.
pub const DESCRIPTION_SYSTEM: &str = "You are a fashion copywriter.";

/// System message for the attribute pass.
pub const ATTRIBUTE_SYSTEM: &str = "You are a helpful assistant selecting product attributes.";

/// Sentence added to the description prompt for coordinated sets.
pub const SET_TEXT: &str = "This style is a coordinated clothing set.";

/// Name of the function the description pass forces the model to call.
pub const DESCRIPTION_TOOL: &str = "generate_product_description";

/// Number of keywords passed to the description prompt.
pub const PROMPT_KEYWORDS: usize = 3;

/// Number of allowed values previewed per attribute in the attribute prompt.
pub const VALUE_PREVIEW: usize = 10;

/// Description template used when the configuration does not override it.
///
/// Placeholders: `{style_number}`, `{keywords}`, `{set_text}` and `{extracted_text}`.
pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = "\
Write a product listing for style {style_number} using the attached product images and the \
catalog text below. {set_text}

Return a catchy product title, a description of at most 300 characters, a product category, \
a product type, the single most defining visible feature, 3 to 5 hashtags, and the fabric, \
silhouette, length, neckline and sleeve where they can be seen.

Target keywords: {keywords}

Catalog text:
{extracted_text}";

lazy_static! {
  /// Escaped braces and `{identifier}` placeholders.
  static ref PLACEHOLDER: Regex =
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

/// Fills `{name}` placeholders in `template` from `vars`.
///
/// `{{` and `}}` render as literal braces; other braces are copied through.
///
/// # Errors
///
/// Returns [`LinesheetError::Template`] if a placeholder has no value in `vars`.
///
/// ```
/// use std::collections::BTreeMap;
///
/// use linesheet::prompt::render;
///
/// let vars = BTreeMap::from([("style_number", "DZ24A1234".to_string())]);
/// assert_eq!(render("Style {style_number} {{json}}", &vars).unwrap(), "Style DZ24A1234 {json}");
/// assert!(render("{missing}", &vars).is_err());
/// ```
pub fn render(template: &str, vars: &BTreeMap<&str, String>) -> Result<String> {
  let mut rendered = String::with_capacity(template.len());
  let mut last = 0;
  for captures in PLACEHOLDER.captures_iter(template) {
    let Some(whole) = captures.get(0) else { continue };
    rendered.push_str(&template[last..whole.start()]);
    match (whole.as_str(), captures.get(1)) {
      ("{{", _) => rendered.push('{'),
      ("}}", _) => rendered.push('}'),
      (_, Some(name)) => match vars.get(name.as_str()) {
        Some(value) => rendered.push_str(value),
        None => return Err(LinesheetError::Template(name.as_str().to_string())),
      },
      (other, None) => rendered.push_str(other),
    }
    last = whole.end();
  }
  rendered.push_str(&template[last..]);
  Ok(rendered)
}

/// Renders the description prompt for one catalog entry.
///
/// Only the first [`PROMPT_KEYWORDS`] keywords are requested. A sentence asking for them to
/// be worked in naturally is appended after the template.
pub fn description_prompt(
  template: &str,
  style_number: &str,
  keywords: &[String],
  extracted_text: &str,
) -> Result<String> {
  let keyword_list =
    keywords.iter().take(PROMPT_KEYWORDS).map(String::as_str).collect::<Vec<_>>().join(", ");
  let set_text = if description::is_set(style_number) { SET_TEXT } else { "" };

  let vars = BTreeMap::from([
    ("style_number", style_number.to_string()),
    ("keywords", keyword_list.clone()),
    ("set_text", set_text.to_string()),
    ("extracted_text", extracted_text.to_string()),
  ]);

  let mut prompt = render(template, &vars)?;
  prompt.push_str(&format!(
    "\nEnsure the keywords ({keyword_list}) are included naturally in the description."
  ));
  Ok(prompt)
}

/// Builds the attribute selection prompt for one product.
///
/// Every attribute is listed by key and label with a preview of its first
/// [`VALUE_PREVIEW`] allowed values.
pub fn attribute_prompt(taxonomy: &Taxonomy, product: &ProductRecord) -> String {
  let mut prompt = String::from(
    "You're selecting attributes for a product to match marketplace listing requirements.\n\n",
  );
  prompt.push_str(&format!(
    "Product Title: {}\nDescription: {}\nCategory: {}\n",
    product.title, product.description, product.category
  ));
  prompt.push_str(
    "\nChoose the most relevant values from the options below. The number in parentheses is \
     the most values you may select; labels prefixed with a category only apply to that \
     category.\n\n",
  );

  for attribute in taxonomy.attributes() {
    prompt.push_str(&format!("- {} ({}): {}\n", attribute.key, attribute.label, preview(attribute)));
  }

  prompt.push_str(
    "\nReturn a JSON object whose keys are exactly the keys listed above. Values may be \
     strings or lists of strings. Only include attributes where a value should be selected.",
  );
  prompt
}

/// The first allowed values of an attribute, with `"..."` when some were left out.
fn preview(attribute: &AttributeDefinition) -> String {
  let shown = attribute.allowed_values.iter().take(VALUE_PREVIEW).cloned().collect::<Vec<_>>();
  let mut preview = shown.join(", ");
  if attribute.allowed_values.len() > VALUE_PREVIEW {
    preview.push_str("...");
  }
  preview
}

/// The output schema the description pass forces the model to call.
pub fn description_tool() -> ToolSchema {
  let attributes = description::DESCRIPTION_ATTRIBUTES
    .iter()
    .map(|name| (name.to_lowercase(), json!({ "type": "string" })))
    .collect::<Map<String, Value>>();

  ToolSchema {
    name:        DESCRIPTION_TOOL.to_string(),
    description: "Generate a fashion product description and attributes".to_string(),
    parameters:  json!({
      "type": "object",
      "properties": {
        "product_title": { "type": "string" },
        "description": { "type": "string" },
        "product_category": { "type": "string" },
        "product_type": { "type": "string" },
        "key_attribute": { "type": "string" },
        "hashtags": { "type": "array", "items": { "type": "string" } },
        "attributes": { "type": "object", "properties": attributes }
      },
      "required": ["product_title", "description", "product_category", "product_type"]
    }),
  }
}
