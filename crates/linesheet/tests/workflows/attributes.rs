use super::*;

fn listing(rows: &[[&str; 4]]) -> Table {
  let mut table = Table::new(
    ["Style Number", "Product Title", "Product Description", "Product Category"]
      .iter()
      .map(|c| c.to_string())
      .collect(),
  );
  for row in rows {
    table.push_row(row.iter().map(|c| c.to_string()).collect()).unwrap();
  }
  table
}

#[traced_test]
#[tokio::test]
async fn test_incomplete_rows_are_skipped() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let model = ScriptedModel::new().select_with(tool_call(json!({"color": "Black"})));
  let listing = listing(&[
    ["DZ24A1111", "Tee", "", "Top"],
    ["", "Tank", "Ribbed.", "Top"],
    ["DZ24A2222", "Cami", "Silky.", "Cami Top"],
  ]);

  let (table, report) = fast(&model, &taxonomy).attribute_table("summer", &listing).await;

  assert_eq!(report.name, "summer.attributes");
  assert_eq!((report.succeeded, report.failed, report.skipped), (1, 0, 2));
  assert_eq!(table.len(), 1);
  assert_eq!(column(&table, 0, "Style Number"), "DZ24A2222");
  assert_eq!(column(&table, 0, "Color (1)"), "Black");
  assert!(logs_contain("Skipping listing row 1: Missing required field \"Product Description\""));
  assert!(logs_contain("Skipping listing row 2: Missing required field \"Style Number\""));
  Ok(())
}

#[tokio::test]
async fn test_failed_selection_still_writes_mandatory_padding() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let model = ScriptedModel::new()
    .select_with(text("I cannot see the product."))
    .select_with(text("Still cannot."))
    .select_with(text("Sorry."));
  let listing = listing(&[["HF24B0001", "Denim Shorts", "Frayed hem.", "Shorts"]]);

  let (table, report) = fast(&model, &taxonomy).attribute_table("summer", &listing).await;

  assert_eq!((report.succeeded, report.failed, report.skipped), (0, 1, 0));
  assert_eq!(table.len(), 1);
  assert_eq!(column(&table, 0, "Color (1)"), "N/A");
  assert_eq!(column(&table, 0, "Aesthetic (2)"), "N/A, N/A");
  assert_eq!(column(&table, 0, "Occasion (2)"), "N/A, N/A");
  assert_eq!(column(&table, 0, "Occasion Theme (3)"), "N/A, N/A, N/A");
  assert_eq!(column(&table, 0, "Shorts: *Rise Style"), "");
  assert_eq!(model.requests().len(), 3);
  Ok(())
}

#[tokio::test]
async fn test_scoped_attributes_follow_the_category() -> TestResult<()> {
  let taxonomy = Taxonomy::builtin()?;
  let answer = json!({
    "sleeve_length": "Long Sleeve",
    "dress_length": "Tiered",
    "application_type": "Embroidery",
    "Season": "fall/winter"
  });
  let model = ScriptedModel::new().select_with(tool_call(answer.clone())).select_with(tool_call(answer));
  let listing = listing(&[
    ["DZ24A3333", "Crew Sweater", "Chunky knit.", "Sweater"],
    ["DZ24A4444", "Prairie Dress", "Tiered.", "Unknown"],
  ]);

  let (table, _) = fast(&model, &taxonomy).attribute_table("fall", &listing).await;

  assert_eq!(column(&table, 0, "TOP: Sleeve Length (1)"), "Long Sleeve");
  assert_eq!(column(&table, 0, "Dress: Skirt & Dress Length"), "");
  assert_eq!(column(&table, 0, "Hoodie: Application Type"), "");
  assert_eq!(column(&table, 0, "Season"), "Fall/Winter");
  assert_eq!(column(&table, 1, "TOP: Sleeve Length (1)"), "");
  assert_eq!(column(&table, 1, "Dress: Skirt & Dress Length"), "");
  assert_eq!(column(&table, 1, "Season"), "Fall/Winter");
  assert!(table.rows().iter().all(|row| row.len() == taxonomy.header().len()));
  Ok(())
}
