//! Spreadsheet workbooks.
//!
//! Reading goes through calamine and accepts any `*.xls*` workbook; writing
//! produces a single `.xlsx` with rust_xlsxwriter. The two directions are
//! separate endpoints: a folder of workbooks is only ever a source and a
//! written workbook is only ever a destination.

mod source;
mod target;

pub use source::{workbooks, SpreadsheetProducer};
pub use target::{ColumnSpec, SheetLayout, SheetSpec, SpreadsheetConsumer, MAX_SHEET_NAME};
