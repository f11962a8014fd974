//! Error types for the data copier library.

use thiserror::Error;

/// Main error type for copy operations.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Configuration error (missing option, invalid value, endpoint not ready).
    #[error("Configuration error: {0}")]
    Config(String),

    /// An endpoint was asked for a capability it does not have.
    #[error("Unsupported operation: {endpoint} endpoints cannot act as a {role}")]
    Unsupported {
        endpoint: &'static str,
        role: &'static str,
    },

    /// Opening a connection, file or archive failed.
    #[error("Failed to open {resource}: {message}")]
    ResourceOpen { resource: String, message: String },

    /// Streaming a table's records failed.
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// Cancellation was observed through the progress monitor.
    #[error("Transfer cancelled")]
    Cancelled,

    /// A producer or consumer was used outside its open/close window.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Zip archive error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Malformed or unwritable XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Workbook read/write error
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
}

impl CopyError {
    /// Create a ResourceOpen error for the named resource.
    pub fn open(resource: impl Into<String>, message: impl std::fmt::Display) -> Self {
        CopyError::ResourceOpen {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        CopyError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an Xml error from any quick-xml failure.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        CopyError::Xml(err.to_string())
    }

    /// Create a Spreadsheet error from any workbook failure.
    pub fn spreadsheet(err: impl std::fmt::Display) -> Self {
        CopyError::Spreadsheet(err.to_string())
    }

    /// Whether this error is the distinguished cancellation condition.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CopyError::Cancelled)
    }

    /// Attach table context, keeping errors that already carry it.
    pub fn in_table(self, table: &str) -> Self {
        match self {
            CopyError::Cancelled | CopyError::Transfer { .. } => self,
            other => CopyError::transfer(table, other.to_string()),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CopyError::Config(_)
            | CopyError::Unsupported { .. }
            | CopyError::Yaml(_)
            | CopyError::Json(_) => 1,
            CopyError::Transfer { .. }
            | CopyError::Lifecycle(_)
            | CopyError::Database(_)
            | CopyError::Archive(_)
            | CopyError::Xml(_)
            | CopyError::Spreadsheet(_) => 2,
            CopyError::ResourceOpen { .. } => 3,
            CopyError::Io(_) => 7,
            CopyError::Cancelled => 130,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for copy operations.
pub type Result<T> = std::result::Result<T, CopyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_table_wraps_foreign_errors() {
        let err = CopyError::Xml("unexpected eof".into()).in_table("CUSTOMER");
        match err {
            CopyError::Transfer { table, message } => {
                assert_eq!(table, "CUSTOMER");
                assert!(message.contains("unexpected eof"));
            }
            other => panic!("expected transfer error, got {other:?}"),
        }
    }

    #[test]
    fn test_in_table_keeps_cancellation() {
        assert!(CopyError::Cancelled.in_table("ORDER").is_cancelled());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CopyError::Config("x".into()).exit_code(), 1);
        assert_eq!(CopyError::transfer("T", "boom").exit_code(), 2);
        assert_eq!(CopyError::open("db", "refused").exit_code(), 3);
        assert_eq!(CopyError::Cancelled.exit_code(), 130);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(CopyError::from(io).exit_code(), 7);
    }
}
