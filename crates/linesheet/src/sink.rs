//! Tabular output: the [`Table`] type and the sinks tables are written to.
//!
//! Tables are plain rectangular string grids. Every row has exactly as many cells as the
//! header has columns, which [`Table::push_row`] enforces.
//!
//! [`CsvSink`] writes `<dir>/<name>.csv` through a temporary file in the same directory and
//! moves it into place only once the whole table is written, so an interrupted batch never
//! leaves a half-written table behind.

use std::io::Write;

use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;

use super::*;

/// A rectangular table of strings with a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
  /// Column names
  header: Vec<String>,
  /// Data rows, each as wide as the header
  rows:   Vec<Vec<String>>,
}

impl Table {
  /// Creates an empty table with the given columns.
  pub fn new(header: Vec<String>) -> Self { Self { header, rows: Vec::new() } }

  /// Appends a row.
  ///
  /// # Errors
  ///
  /// Returns [`LinesheetError::RowWidth`] if the row is not as wide as the header.
  pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
    if row.len() != self.header.len() {
      return Err(LinesheetError::RowWidth { expected: self.header.len(), found: row.len() });
    }
    self.rows.push(row);
    Ok(())
  }

  /// Appends a row the caller built from this table's header.
  pub(crate) fn push_unchecked(&mut self, row: Vec<String>) {
    debug_assert_eq!(row.len(), self.header.len());
    self.rows.push(row);
  }

  /// Column names.
  pub fn header(&self) -> &[String] { &self.header }

  /// Data rows.
  pub fn rows(&self) -> &[Vec<String>] { &self.rows }

  /// Number of data rows.
  pub fn len(&self) -> usize { self.rows.len() }

  /// Whether the table has no data rows.
  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  /// Rows as `column -> value` maps.
  ///
  /// ```
  /// use linesheet::sink::Table;
  ///
  /// let mut table = Table::new(vec!["Style Number".into(), "Color (1)".into()]);
  /// table.push_row(vec!["DZ24A1234".into(), "Red".into()]).unwrap();
  /// assert_eq!(table.to_records()[0]["Color (1)"], "Red");
  /// ```
  pub fn to_records(&self) -> Vec<BTreeMap<String, String>> {
    self
      .rows
      .iter()
      .map(|row| self.header.iter().cloned().zip(row.iter().cloned()).collect())
      .collect()
  }
}

/// Somewhere finished tables go.
pub trait TabularSink {
  /// Writes `table` under `name`, replacing anything previously written under that name.
  fn write(&mut self, name: &str, table: &Table) -> Result<()>;
}

/// Writes tables as CSV files in a directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
  /// Output directory
  dir: PathBuf,
}

impl CsvSink {
  /// Creates a sink writing into `dir`, which is created on first write if needed.
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  /// The file a table called `name` is written to.
  pub fn path_for(&self, name: &str) -> PathBuf { self.dir.join(format!("{name}.csv")) }
}

impl TabularSink for CsvSink {
  fn write(&mut self, name: &str, table: &Table) -> Result<()> {
    std::fs::create_dir_all(&self.dir)?;
    let target = self.path_for(name);

    let mut file = NamedTempFile::new_in(&self.dir)?;
    {
      let mut writer = WriterBuilder::new().from_writer(file.as_file_mut());
      writer.write_record(table.header())?;
      for row in table.rows() {
        writer.write_record(row)?;
      }
      writer.flush()?;
    }
    file.as_file_mut().flush()?;
    file.persist(&target)?;

    info!("Wrote {} rows to {}", table.len(), target.display());
    Ok(())
  }
}

/// Keeps written tables in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
  /// Tables written so far
  pub tables: BTreeMap<String, Table>,
}

impl TabularSink for MemorySink {
  fn write(&mut self, name: &str, table: &Table) -> Result<()> {
    self.tables.insert(name.to_string(), table.clone());
    Ok(())
  }
}

/// Reads a CSV file with a header row back into a [`Table`].
///
/// Short rows are padded with empty cells and long rows are cut to the header width, so the
/// result is always rectangular.
pub fn read_table(path: impl AsRef<Path>) -> Result<Table> {
  let path = path.as_ref();
  debug!("Reading table from {}", path.display());
  let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;

  let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
  let mut table = Table::new(header);
  for record in reader.records() {
    let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
    row.resize(table.header.len(), String::new());
    table.push_unchecked(row);
  }
  Ok(table)
}
