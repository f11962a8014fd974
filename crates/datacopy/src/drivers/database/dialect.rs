//! SQL dialect differences between the supported database vendors.

use std::fmt;

use crate::core::{Column, DataType, Table};

/// Database vendor, chosen from the connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Sqlite,
    Postgres,
}

impl Vendor {
    /// Vendor for a connection URL, `None` when the scheme is not supported.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.trim().to_ascii_lowercase();
        if lower.starts_with("sqlite:") {
            Some(Vendor::Sqlite)
        } else if lower.starts_with("postgres:") || lower.starts_with("postgresql:") {
            Some(Vendor::Postgres)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Vendor::Sqlite => "SQLite",
            Vendor::Postgres => "PostgreSQL",
        }
    }

    /// Whether connecting requires a username.
    pub fn requires_username(self) -> bool {
        matches!(self, Vendor::Postgres)
    }

    /// Bind parameter limit per statement.
    pub fn max_placeholders(self) -> usize {
        match self {
            Vendor::Sqlite => 999,
            Vendor::Postgres => 65535,
        }
    }

    /// Placeholder for the 1-based parameter `n`.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Vendor::Sqlite => "?".to_string(),
            Vendor::Postgres => format!("${n}"),
        }
    }

    /// Both vendors quote with double quotes; embedded quotes are doubled.
    pub fn quote_ident(self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Schema-qualified table name. SQLite has no schemas to qualify with.
    pub fn qualify(self, schema: &str, table: &str) -> String {
        match self {
            Vendor::Sqlite => self.quote_ident(table),
            Vendor::Postgres => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
        }
    }

    /// Column type in DDL.
    pub fn type_name(self, column: &Column) -> String {
        match column.data_type {
            DataType::String => {
                let width = if column.width > 0 { column.width } else { 255 };
                format!("VARCHAR({width})")
            }
            DataType::Clob => "TEXT".to_string(),
            DataType::Integer => "INTEGER".to_string(),
            DataType::BigInteger => "BIGINT".to_string(),
            DataType::Decimal => {
                let precision = if column.width > 0 { column.width } else { 19 };
                format!("DECIMAL({}, {})", precision, column.scale.min(precision))
            }
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::DateTime => "TIMESTAMP".to_string(),
            DataType::Blob => match self {
                Vendor::Sqlite => "BLOB".to_string(),
                Vendor::Postgres => "BYTEA".to_string(),
            },
        }
    }

    fn column_ddl(self, column: &Column) -> String {
        let mut ddl = format!("{} {}", self.quote_ident(&column.name), self.type_name(column));
        if !column.nullable {
            ddl.push_str(" NOT NULL");
        }
        ddl
    }

    /// CREATE TABLE statement for a table definition.
    pub fn create_table(self, schema: &str, table: &Table) -> String {
        let mut parts: Vec<String> = table.columns.iter().map(|c| self.column_ddl(c)).collect();
        let pk = table.primary_key();
        if !pk.is_empty() {
            let names: Vec<String> = pk.iter().map(|c| self.quote_ident(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }
        format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.qualify(schema, &table.name),
            parts.join(",\n    ")
        )
    }

    /// ALTER TABLE statement adding a column. Added columns are always
    /// nullable, since existing rows have no value for them.
    pub fn add_column(self, schema: &str, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.qualify(schema, table),
            self.quote_ident(&column.name),
            self.type_name(column)
        )
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic type for a declared database type name.
///
/// Accepts SQLite declarations (`VARCHAR(40)`, `DECIMAL(10,2)`) as well as
/// the names reported by the Postgres information schema.
pub fn data_type_from(declared: &str) -> DataType {
    let t = declared.trim().to_ascii_lowercase();
    if t.contains("bool") {
        DataType::Boolean
    } else if t.contains("bigint") || t.starts_with("int8") {
        DataType::BigInteger
    } else if t.contains("int") {
        DataType::Integer
    } else if t.contains("timestamp") || t.contains("datetime") {
        DataType::DateTime
    } else if t.contains("date") {
        DataType::Date
    } else if t.contains("char") {
        DataType::String
    } else if t.contains("clob") || t.contains("text") {
        DataType::Clob
    } else if t.is_empty() || t.contains("blob") || t.contains("bytea") {
        DataType::Blob
    } else if ["dec", "num", "real", "floa", "doub"]
        .iter()
        .any(|p| t.contains(p))
    {
        DataType::Decimal
    } else {
        DataType::Clob
    }
}

/// Width and scale from a declaration such as `DECIMAL(10, 2)`.
pub fn declared_size(declared: &str) -> (u32, u32) {
    let inner = declared
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(inner, _)| inner);
    let Some(inner) = inner else {
        return (0, 0);
    };
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let width = parts.next().unwrap_or(0);
    let scale = parts.next().unwrap_or(0);
    (width, scale)
}
