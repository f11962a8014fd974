use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::TryStreamExt;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::{CloseState, Consumer, Record, RecordStream, Schema, Table, Value};
use crate::error::{CopyError, Result};

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME: usize = 31;

/// Optional layout file for the written workbook.
///
/// ```yaml
/// sheets:
///   - table: CUSTOMER
///     title: Customers
///     columns:
///       - { name: id, heading: Customer Id }
///       - { name: name, heading: Name }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetLayout {
    #[serde(default)]
    pub sheets: Vec<SheetSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetSpec {
    pub table: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Columns in sheet order. Empty means every column, in table order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub heading: Option<String>,
}

impl SheetLayout {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CopyError::open(path.display().to_string(), e))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn spec(&self, table: &str) -> Option<&SheetSpec> {
        self.sheets.iter().find(|s| s.table.eq_ignore_ascii_case(table))
    }
}

/// A table ready to be written: sheet title, (column, heading) pairs and rows.
struct Sheet {
    title: String,
    columns: Vec<(String, String)>,
    records: Vec<Record>,
}

/// Writes one worksheet per table into a single workbook.
///
/// Rows are buffered and the workbook is only written by a complete close.
pub struct SpreadsheetConsumer {
    file: PathBuf,
    configuration: Option<PathBuf>,
    layout: Option<SheetLayout>,
    sheets: Vec<Sheet>,
}

impl SpreadsheetConsumer {
    pub fn new(file: impl Into<PathBuf>, configuration: Option<PathBuf>) -> Self {
        Self {
            file: file.into(),
            configuration,
            layout: None,
            sheets: Vec::new(),
        }
    }
}

/// A valid, unique worksheet name.
fn sheet_name(title: &str, taken: &[String]) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .collect();
    let base: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    let base = if base.trim().is_empty() { "Sheet".to_string() } else { base };

    let is_taken = |name: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(name));
    if !is_taken(&base) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!("~{n}");
            let head: String = base.chars().take(MAX_SHEET_NAME - suffix.len()).collect();
            format!("{head}{suffix}")
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(base)
}

/// Largest magnitude a cell number (an f64) holds exactly.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    let written = match value {
        Value::Null => return Ok(()),
        Value::Boolean(b) => sheet.write_boolean(row, col, *b),
        Value::Integer(i) if i.unsigned_abs() <= MAX_EXACT_INTEGER => {
            sheet.write_number(row, col, *i as f64)
        }
        Value::Integer(i) => sheet.write_string(row, col, i.to_string()),
        Value::Float(f) => sheet.write_number(row, col, *f),
        Value::Decimal(d) => match d.to_f64() {
            Some(f) => sheet.write_number(row, col, f),
            None => sheet.write_string(row, col, d.to_string()),
        },
        other => sheet.write_string(row, col, other.to_text().unwrap_or_default()),
    };
    written.map_err(CopyError::spreadsheet)?;
    Ok(())
}

fn build_workbook(sheets: &[Sheet]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let mut taken: Vec<String> = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        let name = sheet_name(&sheet.title, &taken);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).map_err(CopyError::spreadsheet)?;

        for (col, (_, heading)) in sheet.columns.iter().enumerate() {
            let col = u16::try_from(col)
                .map_err(|_| CopyError::Spreadsheet(format!("{name}: too many columns")))?;
            worksheet
                .write_string_with_format(0, col, heading, &bold)
                .map_err(CopyError::spreadsheet)?;
        }
        for (row, record) in sheet.records.iter().enumerate() {
            let row = u32::try_from(row + 1)
                .map_err(|_| CopyError::Spreadsheet(format!("{name}: too many rows")))?;
            for (col, (column, _)) in sheet.columns.iter().enumerate() {
                if let Some(value) = record.get(column) {
                    write_cell(worksheet, row, col as u16, value)?;
                }
            }
        }
        taken.push(name);
    }
    Ok(workbook)
}

#[async_trait]
impl Consumer for SpreadsheetConsumer {
    fn describe(&self) -> String {
        format!("spreadsheet [{}]", self.file.display())
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        self.layout = match &self.configuration {
            Some(path) => Some(SheetLayout::load(path)?),
            None => None,
        };
        self.sheets = Vec::with_capacity(source.len());
        info!("Writing {} tables to {}", source.len(), self.describe());
        Ok(())
    }

    async fn table(&mut self, table: &Table, records: RecordStream<'_>) -> Result<()> {
        let spec = self.layout.as_ref().and_then(|l| l.spec(&table.name));
        let title = spec
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| table.name.clone());
        let columns: Vec<(String, String)> = match spec {
            Some(spec) if !spec.columns.is_empty() => spec
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.heading.clone().unwrap_or_else(|| c.name.clone())))
                .collect(),
            _ => table
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.name.clone()))
                .collect(),
        };

        let records: Vec<Record> = records.try_collect().await?;
        debug!("{}: buffered {} rows for sheet [{}]", table.name, records.len(), title);
        self.sheets.push(Sheet {
            title,
            columns,
            records,
        });
        Ok(())
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        let sheets = std::mem::take(&mut self.sheets);
        self.layout = None;
        match state {
            CloseState::Complete => {
                let file = self.file.clone();
                let count = sheets.len();
                tokio::task::spawn_blocking(move || -> Result<()> {
                    let mut workbook = build_workbook(&sheets)?;
                    workbook
                        .save(&file)
                        .map_err(|e| CopyError::open(file.display().to_string(), e))
                })
                .await
                .map_err(CopyError::spreadsheet)??;
                info!("Saved {} sheets to {}", count, self.describe());
            }
            CloseState::Incomplete => {
                if !sheets.is_empty() {
                    warn!("Transfer incomplete, {} not written", self.describe());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_are_truncated_and_unique() {
        let long = "A_VERY_LONG_TABLE_NAME_THAT_EXCEEDS_EXCEL";
        let first = sheet_name(long, &[]);
        assert_eq!(first.chars().count(), MAX_SHEET_NAME);
        assert_eq!(first, "A_VERY_LONG_TABLE_NAME_THAT_EXC");

        let second = sheet_name(long, &[first.clone()]);
        assert_eq!(second, "A_VERY_LONG_TABLE_NAME_THAT_E~2");
        assert_ne!(first, second);
    }

    #[test]
    fn test_sheet_names_replace_invalid_characters() {
        assert_eq!(sheet_name("a/b[c]", &[]), "a_b_c_");
        assert_eq!(sheet_name("", &[]), "Sheet");
    }

    #[test]
    fn test_layout_lookup_is_case_insensitive() {
        let layout: SheetLayout = serde_yaml::from_str(
            "sheets:\n  - table: CUSTOMER\n    title: Customers\n    columns:\n      - { name: id, heading: Customer Id }\n",
        )
        .unwrap();
        let spec = layout.spec("customer").unwrap();
        assert_eq!(spec.title.as_deref(), Some("Customers"));
        assert_eq!(spec.columns[0].heading.as_deref(), Some("Customer Id"));
        assert!(layout.spec("ORDER").is_none());
    }

    #[test]
    fn test_large_integers_keep_every_digit() {
        use calamine::{open_workbook_auto, Data, Reader};

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ids.xlsx");
        let big = (1i64 << 53) + 1;
        let sheets = vec![Sheet {
            title: "IDS".into(),
            columns: vec![("id".into(), "id".into())],
            records: vec![
                Record::new().with("id", 42),
                Record::new().with("id", big),
                Record::new().with("id", i64::MIN),
            ],
        }];
        build_workbook(&sheets).unwrap().save(&file).unwrap();

        let mut book = open_workbook_auto(&file).unwrap();
        let range = book.worksheet_range("IDS").unwrap();
        let cells: Vec<&Data> = range.rows().skip(1).map(|row| &row[0]).collect();
        assert_eq!(cells[0], &Data::Float(42.0));
        assert_eq!(cells[1], &Data::String(big.to_string()));
        assert_eq!(cells[2], &Data::String(i64::MIN.to_string()));
    }

    #[tokio::test]
    async fn test_incomplete_close_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.xlsx");
        let mut consumer = SpreadsheetConsumer::new(&file, None);
        consumer.open(&Schema::empty()).await.unwrap();
        consumer.close(CloseState::Incomplete).await.unwrap();
        assert!(!file.exists());
    }
}
