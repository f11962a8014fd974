//! Core abstractions for store-agnostic data transfer.
//!
//! - [`schema`]: table, column and data type metadata
//! - [`value`]: owned field values and records
//! - [`traits`]: the producer and consumer contracts
//!
//! Backing stores (`drivers/`) and adapters (`adapters/`) implement the
//! traits defined here; nothing in this module performs I/O.

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{Column, DataType, Schema, Table};
pub use traits::{CloseState, Consumer, Producer, RecordStream};
pub use value::{ConversionError, Record, Value};
