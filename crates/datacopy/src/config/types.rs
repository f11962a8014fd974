//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the data set is read from.
    pub source: EndpointConfig,

    /// Where the data set is written to.
    pub destination: EndpointConfig,
}

/// Kind of backing store behind an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Database,
    Xml,
    Spreadsheet,
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointType::Database => "database",
            EndpointType::Xml => "xml",
            EndpointType::Spreadsheet => "spreadsheet",
        })
    }
}

/// One side of a transfer. Only the section matching `type` is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<XmlConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet: Option<SpreadsheetConfig>,
}

impl EndpointConfig {
    pub fn database(config: DatabaseConfig) -> Self {
        Self {
            endpoint_type: EndpointType::Database,
            database: Some(config),
            xml: None,
            spreadsheet: None,
        }
    }

    pub fn xml(config: XmlConfig) -> Self {
        Self {
            endpoint_type: EndpointType::Xml,
            database: None,
            xml: Some(config),
            spreadsheet: None,
        }
    }

    pub fn spreadsheet(config: SpreadsheetConfig) -> Self {
        Self {
            endpoint_type: EndpointType::Spreadsheet,
            database: None,
            xml: None,
            spreadsheet: Some(config),
        }
    }
}

/// Relational database settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, `sqlite:` or `postgres:`.
    #[serde(default)]
    pub url: String,

    /// Username (required for Postgres).
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Schema to read or write (default: "public"; ignored by SQLite).
    #[serde(default = "default_public_schema")]
    pub schema_name: String,

    /// Create missing tables and columns before writing (default: true).
    #[serde(default = "default_true")]
    pub update_schema: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            schema_name: default_public_schema(),
            update_schema: true,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("schema_name", &self.schema_name)
            .field("update_schema", &self.update_schema)
            .finish()
    }
}

/// XML data set location: an archive file or a directory, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XmlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

/// Spreadsheet settings. `folder` applies to sources, `file` and
/// `configuration` to destinations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Folder scanned for workbooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,

    /// Workbook to write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Sheet layout file (YAML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<PathBuf>,
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}
