//! Schema and metadata types for tables and columns.
//!
//! These types provide a store-agnostic representation of the structure a
//! producer exposes and a consumer accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CopyError, Result};

/// Semantic column type, independent of any backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Bounded character data.
    String,
    /// Unbounded character data.
    Clob,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInteger,
    /// Fixed-point number.
    Decimal,
    Boolean,
    Date,
    DateTime,
    Blob,
}

impl DataType {
    /// Whether blanks in this type can be normalised to zero.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::BigInteger | DataType::Decimal
        )
    }

    /// Whether values of this type are stored as character data.
    pub fn is_textual(self) -> bool {
        matches!(self, DataType::String | DataType::Clob)
    }

    /// Stable identifier used by the XML format.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Clob => "CLOB",
            DataType::Integer => "INTEGER",
            DataType::BigInteger => "BIG_INTEGER",
            DataType::Decimal => "DECIMAL",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::DateTime => "DATE_TIME",
            DataType::Blob => "BLOB",
        }
    }

    /// Parse the identifier written by [`DataType::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        let parsed = match s.trim().to_ascii_uppercase().as_str() {
            "STRING" => DataType::String,
            "CLOB" => DataType::Clob,
            "INTEGER" => DataType::Integer,
            "BIG_INTEGER" => DataType::BigInteger,
            "DECIMAL" => DataType::Decimal,
            "BOOLEAN" => DataType::Boolean,
            "DATE" => DataType::Date,
            "DATE_TIME" => DataType::DateTime,
            "BLOB" => DataType::Blob,
            _ => return None,
        };
        Some(parsed)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Semantic type.
    pub data_type: DataType,

    /// Maximum length for strings, precision for decimals (0 = unspecified).
    pub width: u32,

    /// Decimal scale.
    pub scale: u32,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl Column {
    /// Create a non-nullable column with no width.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            width: 0,
            scale: 0,
            nullable: false,
            primary_key: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: u32, scale: u32) -> Self {
        self.width = width;
        self.scale = scale;
        self
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Table metadata. Immutable once exposed by a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions in declared order.
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Find a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// Column names in declared order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary key columns in declared order.
    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// The set of tables exposed by a producer.
///
/// Enumeration order is the order in which tables are transferred. Names are
/// unique, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    /// Build a schema, rejecting duplicate table names.
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        for (i, table) in tables.iter().enumerate() {
            if tables[..i].iter().any(|t| t.is_named(&table.name)) {
                return Err(CopyError::Config(format!(
                    "duplicate table name [{}] in schema",
                    table.name
                )));
            }
        }
        Ok(Self { tables })
    }

    /// An empty schema.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table names in transfer order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Metadata for a table (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.is_named(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Table {
        Table::new(
            "CUSTOMER",
            vec![
                Column::new("id", DataType::BigInteger).primary_key(),
                Column::new("name", DataType::String).with_width(60, 0).nullable(),
            ],
        )
    }

    #[test]
    fn test_schema_keeps_declared_order() {
        let schema = Schema::new(vec![
            Table::new("ZEBRA", vec![]),
            customer(),
            Table::new("ALPHA", vec![]),
        ])
        .unwrap();
        assert_eq!(schema.table_names(), vec!["ZEBRA", "CUSTOMER", "ALPHA"]);
    }

    #[test]
    fn test_schema_rejects_duplicate_names() {
        let err = Schema::new(vec![customer(), Table::new("customer", vec![])]).unwrap_err();
        assert!(matches!(err, CopyError::Config(_)));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let schema = Schema::new(vec![customer()]).unwrap();
        let table = schema.table("Customer").expect("table");
        assert_eq!(table.column("NAME").map(|c| c.width), Some(60));
        assert_eq!(table.primary_key().len(), 1);
    }

    #[test]
    fn test_data_type_identifiers_parse_back() {
        for ty in [
            DataType::String,
            DataType::Clob,
            DataType::Integer,
            DataType::BigInteger,
            DataType::Decimal,
            DataType::Boolean,
            DataType::Date,
            DataType::DateTime,
            DataType::Blob,
        ] {
            assert_eq!(DataType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(DataType::parse("varchar"), None);
    }

    #[test]
    fn test_primary_key_is_not_nullable() {
        let col = Column::new("id", DataType::Integer).nullable().primary_key();
        assert!(!col.nullable);
        assert!(col.primary_key);
    }
}
