use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use futures::{stream, StreamExt};
use glob::MatchOptions;
use tracing::{debug, info, warn};

use crate::core::{Column, DataType, Producer, Record, RecordStream, Schema, Table, Value};
use crate::error::{CopyError, Result};

/// Reads every worksheet of every workbook in a folder.
///
/// Workbooks are loaded whole when the producer is opened.
pub struct SpreadsheetProducer {
    folder: PathBuf,
    schema: Option<Schema>,
    rows: Vec<Vec<Record>>,
}

impl SpreadsheetProducer {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            schema: None,
            rows: Vec::new(),
        }
    }
}

/// Workbooks in `folder`, matched case-insensitively on `*.xls*`.
pub fn workbooks(folder: &Path) -> Result<Vec<PathBuf>> {
    let folder_str = folder
        .to_str()
        .ok_or_else(|| CopyError::Config(format!("{} is not valid UTF-8", folder.display())))?;
    let pattern = format!("{}/*.xls*", glob::Pattern::escape(folder_str));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut paths = Vec::new();
    for entry in glob::glob_with(&pattern, options).map_err(|e| CopyError::Config(e.to_string()))? {
        let path = entry.map_err(|e| CopyError::open(folder.display().to_string(), e))?;
        let is_lock_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("~$"));
        if path.is_file() && !is_lock_file {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Text(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::Text((*f as i64).to_string())
            } else {
                Value::Text(f.to_string())
            }
        }
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Value::DateTime(datetime)
                .to_text()
                .map(Value::Text)
                .unwrap_or(Value::Null),
            None => Value::Text(dt.as_f64().to_string()),
        },
        Data::Error(e) => Value::Text(e.to_string()),
    }
}

fn is_empty_row(row: &[Data]) -> bool {
    row.iter().all(|c| cell_value(c).is_null())
}

/// One worksheet as a table. `None` when the sheet has no non-empty row.
fn sheet_table(name: &str, rows: &[&[Data]]) -> Option<(Table, Vec<Record>)> {
    let heading_at = rows.iter().position(|row| !is_empty_row(row))?;

    // (cell index, column name); blank and repeated headings are skipped
    let mut headings: Vec<(usize, String)> = Vec::new();
    for (i, cell) in rows[heading_at].iter().enumerate() {
        let Some(heading) = cell_value(cell).to_text() else {
            continue;
        };
        let heading = heading.trim().to_string();
        if heading.is_empty() {
            continue;
        }
        if headings.iter().any(|(_, h)| h.eq_ignore_ascii_case(&heading)) {
            warn!("{}: repeated heading [{}] ignored", name, heading);
            continue;
        }
        headings.push((i, heading));
    }

    let columns = headings
        .iter()
        .map(|(_, h)| Column::new(h.clone(), DataType::String).nullable())
        .collect();

    let records = rows[heading_at + 1..]
        .iter()
        .filter(|row| !is_empty_row(row))
        .map(|row| {
            let mut record = Record::with_capacity(headings.len());
            for (i, heading) in &headings {
                let value = row.get(*i).map(cell_value).unwrap_or(Value::Null);
                record.set(heading.clone(), value);
            }
            record
        })
        .collect();

    Some((Table::new(name, columns), records))
}

fn load_folder(folder: &Path) -> Result<Vec<(Table, Vec<Record>)>> {
    if !folder.is_dir() {
        return Err(CopyError::open(folder.display().to_string(), "not a directory"));
    }

    let mut tables = Vec::new();
    for path in workbooks(folder)? {
        info!("Processing workbook {}", path.display());
        let resource = path.display().to_string();
        let mut workbook = open_workbook_auto(&path).map_err(|e| CopyError::open(&resource, e))?;
        for sheet in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet)
                .map_err(|e| CopyError::Spreadsheet(format!("{resource} [{sheet}]: {e}")))?;
            let rows: Vec<&[Data]> = range.rows().collect();
            match sheet_table(&sheet, &rows) {
                Some((table, records)) => {
                    debug!("{}: {} columns, {} rows", sheet, table.columns.len(), records.len());
                    tables.push((table, records));
                }
                None => debug!("{}: empty worksheet skipped", sheet),
            }
        }
    }
    Ok(tables)
}

#[async_trait]
impl Producer for SpreadsheetProducer {
    fn describe(&self) -> String {
        format!("spreadsheets [{}]", self.folder.display())
    }

    async fn open(&mut self) -> Result<()> {
        let folder = self.folder.clone();
        let loaded = tokio::task::spawn_blocking(move || load_folder(&folder))
            .await
            .map_err(CopyError::spreadsheet)??;

        let (tables, rows): (Vec<Table>, Vec<Vec<Record>>) = loaded.into_iter().unzip();
        info!("Opened {} with {} tables", self.describe(), tables.len());
        self.schema = Some(Schema::new(tables)?);
        self.rows = rows;
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        self.schema
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("spreadsheet schema read before open".into()))
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        let index = self
            .schema()?
            .tables()
            .iter()
            .position(|t| t.is_named(table))
            .ok_or_else(|| CopyError::transfer(table, "no such worksheet"))?;
        Ok(stream::iter(self.rows[index].iter().cloned().map(Ok::<_, CopyError>)).boxed())
    }

    async fn close(&mut self) -> Result<()> {
        self.schema = None;
        self.rows.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&text("")), Value::Null);
        assert_eq!(cell_value(&Data::Float(12.0)), Value::Text("12".into()));
        assert_eq!(cell_value(&Data::Float(0.25)), Value::Text("0.25".into()));
        assert_eq!(cell_value(&Data::Int(7)), Value::Text("7".into()));
        assert_eq!(cell_value(&Data::Bool(true)), Value::Text("true".into()));
    }

    #[test]
    fn test_first_non_empty_row_holds_headings() {
        let blank = vec![Data::Empty, Data::Empty];
        let headings = vec![text("Item"), text("Qty"), Data::Empty];
        let first = vec![text("bolt"), Data::Float(3.0), text("stray")];
        let second = vec![text("nut")];
        let rows: Vec<&[Data]> = vec![&blank[..], &headings[..], &blank[..], &first[..], &second[..]];

        let (table, records) = sheet_table("STOCK", &rows).unwrap();
        assert_eq!(table.column_names(), vec!["Item", "Qty"]);
        assert!(table.columns.iter().all(|c| c.nullable && c.data_type == DataType::String));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("qty"), Some(&Value::Text("3".into())));
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[1].get("Qty"), Some(&Value::Null));
    }

    #[test]
    fn test_empty_sheet_is_skipped() {
        let blank = vec![Data::Empty];
        assert!(sheet_table("EMPTY", &[&blank[..]]).is_none());
        assert!(sheet_table("NOTHING", &[]).is_none());
    }

    #[test]
    fn test_workbook_glob_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.XLSX", "a.xls", "~$a.xlsx", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let found: Vec<String> = workbooks(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.xls", "b.XLSX"]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_resource_open_error() {
        let mut producer = SpreadsheetProducer::new("/nonexistent/sheets");
        let err = producer.open().await.unwrap_err();
        assert!(matches!(err, CopyError::ResourceOpen { .. }));
    }
}
