use linesheet::{
  catalog::CatalogSource,
  description::LISTING_COLUMNS,
  sink::{read_table, CsvSink},
};
use serde_json::json;

use super::*;

mod attributes;

fn described(title: &str, category: &str) -> ModelResponse {
  tool_call(json!({
    "product_title": title,
    "description": "A breezy boho maxi dress with a tiered skirt, made for festival season.",
    "product_category": category,
    "product_type": "Maxi Dress",
    "key_attribute": "Tiered skirt",
    "hashtags": ["#boho", "#maxi"],
    "attributes": {"fabric": "Cotton", "length": "Maxi"}
  }))
}

#[traced_test]
#[tokio::test]
async fn test_catalog_run_counts_and_tables() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let model = ScriptedModel::new()
    .describe_with(described("Tiered Boho Maxi", "Dress"))
    .describe_with(text("no json here"))
    .describe_with(text("still nothing"))
    .describe_with(text("giving up"))
    .select_with(text("```json\n{\"color\": \"white\", \"aesthetic\": [\"Bohemian\"], \"dress_length\": \"Maxi\"}\n```"));

  let (_dir, path) = write_catalog("spring", &[
    entry("", "DZ24A1234 tiered maxi", &["https://cdn/1.jpg"]),
    entry("DZ24A0000", "cover page", &[]),
    entry("", "HF24B5678-SET knit set", &["https://cdn/2.jpg"]),
  ]);

  let mut sink = MemorySink::default();
  let report = fast(&model, &taxonomy).run_catalog(&JsonCatalog::new(&path), &keywords(), &mut sink).await?;

  assert_eq!((report.listing.succeeded, report.listing.failed, report.listing.skipped), (1, 1, 1));
  assert_eq!((report.attributes.succeeded, report.attributes.failed, report.attributes.skipped), (1, 0, 0));
  assert!(logs_contain("Skipping page 2 (DZ24A0000): no images"));

  let listing = &sink.tables["spring.listing"];
  assert_eq!(listing.header(), LISTING_COLUMNS);
  assert_eq!(listing.len(), 1);
  assert_eq!(column(listing, 0, "Style Number"), "DZ24A1234");
  assert_eq!(column(listing, 0, "Product Category"), "Dress");
  assert_eq!(column(listing, 0, "Keywords"), "boho, maxi dress, festival");
  assert_eq!(column(listing, 0, "Fabric"), "Cotton");
  assert_eq!(column(listing, 0, "Neckline"), "N/A");

  let attributes = &sink.tables["spring.attributes"];
  assert_eq!(attributes.header(), taxonomy.header());
  assert_eq!(attributes.len(), 1);
  assert_eq!(column(attributes, 0, "Color (1)"), "White");
  assert_eq!(column(attributes, 0, "Aesthetic (2)"), "Bohemian, N/A");
  assert_eq!(column(attributes, 0, "Occasion Theme (3)"), "N/A, N/A, N/A");
  assert_eq!(column(attributes, 0, "Dress: Skirt & Dress Length"), "Maxi");

  let requests = model.requests();
  assert_eq!(requests.len(), 5);
  assert_eq!(requests[0].images, ["https://cdn/1.jpg"]);
  assert!(requests[2].prompt.contains("This style is a coordinated clothing set."));
  assert!(requests[4].tool.is_none());
  Ok(())
}

#[tokio::test]
async fn test_description_recovers_on_retry() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let model = ScriptedModel::new()
    .describe_with(text("I'm thinking..."))
    .describe_with(text("\"product_title\": \"Knit Set\", \"description\": \"Cozy.\""));

  let set = entry("HF24B5678-SET", "knit set", &["https://cdn/2.jpg"]);
  let record = fast(&model, &taxonomy).describe(&set, &[]).await;

  assert!(!record.fallback);
  assert_eq!(record.product_title, "Knit Set");
  assert_eq!(record.product_type, "Set");
  assert_eq!(model.requests().len(), 2);
  Ok(())
}

#[tokio::test]
async fn test_catalog_run_writes_csv_files() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let model = ScriptedModel::new()
    .describe_with(described("Tiered Boho Maxi", "Dress"))
    .select_with(tool_call(json!({"color": "Red"})));

  let (dir, path) = write_catalog("fall", &[entry("", "DZ24A1234", &["https://cdn/1.jpg"])]);
  let catalog = JsonCatalog::new(&path);
  let output = dir.path().join("out");
  let mut sink = CsvSink::new(&output);
  fast(&model, &taxonomy).run_catalog(&catalog, &[], &mut sink).await?;

  assert_eq!(catalog.name(), "fall");
  let listing = read_table(output.join("fall.listing.csv"))?;
  let attributes = read_table(output.join("fall.attributes.csv"))?;
  assert_eq!(column(&listing, 0, "Product Title"), "Tiered Boho Maxi");
  assert_eq!(column(&attributes, 0, "Color (1)"), "Red");
  assert!(attributes.rows().iter().all(|row| row.len() == taxonomy.len() + 1));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_untitled_description_is_left_out() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let model = ScriptedModel::new()
    .describe_with(tool_call(json!({})))
    .describe_with(described("Tiered Boho Maxi", "Dress"))
    .select_with(tool_call(json!({"color": "Red"})));

  let (_dir, path) = write_catalog("winter", &[
    entry("DZ24A0001", "empty answer", &["https://cdn/1.jpg"]),
    entry("DZ24A0002", "tiered maxi", &["https://cdn/2.jpg"]),
  ]);

  let mut sink = MemorySink::default();
  let report = fast(&model, &taxonomy).run_catalog(&JsonCatalog::new(&path), &[], &mut sink).await?;

  assert_eq!((report.listing.succeeded, report.listing.failed), (1, 1));
  assert!(logs_contain("No usable description for DZ24A0001"));

  let listing = &sink.tables["winter.listing"];
  assert_eq!(listing.len(), 1);
  assert_eq!(column(listing, 0, "Style Number"), "DZ24A0002");
  assert_eq!(sink.tables["winter.attributes"].len(), 1);
  Ok(())
}
