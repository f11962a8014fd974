//! XML table documents, stored as a zip archive or a directory of files.
//!
//! Each table is one `<table>.xml` document (see [`format`]). An archive
//! keeps tables in entry order; a directory is read in file name order.

pub mod format;
mod consumer;
mod producer;

pub use consumer::XmlConsumer;
pub use producer::XmlProducer;

use serde::{Deserialize, Serialize};

/// On-disk shape of an XML data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XmlFormat {
    /// A single zip file.
    Archive,
    /// A directory of documents.
    Directory,
}

impl std::fmt::Display for XmlFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XmlFormat::Archive => write!(f, "archive"),
            XmlFormat::Directory => write!(f, "directory"),
        }
    }
}

/// File name of a table's document.
pub(crate) fn document_name(table: &str) -> String {
    format!("{table}.xml")
}

pub(crate) fn is_document(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".xml")
}
