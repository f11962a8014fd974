//! # datacopy
//!
//! Copies a whole data set, table by table, between a relational database,
//! XML documents and spreadsheet workbooks.
//!
//! A transfer pairs one [`Producer`] with one [`Consumer`]:
//!
//! - **Databases** (SQLite, PostgreSQL) can be read and written; missing
//!   destination tables and columns are created on the fly
//! - **XML** data sets live in a zip archive or a directory, one document
//!   per table
//! - **Spreadsheets** are read from a folder of workbooks and written to a
//!   single workbook
//!
//! ## Example
//!
//! ```rust,no_run
//! use datacopy::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> datacopy::Result<()> {
//!     let config = Config::load("datacopy.yaml")?;
//!     let orchestrator = Orchestrator::new(config)?;
//!     let summary = orchestrator.run(CancellationToken::new()).await?;
//!     println!("Copied {} records", summary.records);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod core;
pub mod drivers;
pub mod endpoint;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod orchestrator;
pub mod transfer;

// Re-exports for convenient access
pub use crate::core::{
    CloseState, Column, Consumer, DataType, Producer, Record, RecordStream, Schema, Table, Value,
};
pub use config::{Config, EndpointConfig, EndpointType};
pub use endpoint::{Endpoint, EndpointKind};
pub use error::{CopyError, Result};
pub use monitor::{ProgressMonitor, SilentMonitor, TextProgressBar};
pub use orchestrator::{Orchestrator, ProgressOutput, Readiness, ReadinessReport};
pub use transfer::{Connector, TransferSummary};
