//! Backing-store drivers.
//!
//! - [`database`]: relational databases through sqlx
//! - [`xml`]: XML table documents in a zip archive or a directory
//! - [`spreadsheet`]: Excel workbooks, read with calamine and written with
//!   rust_xlsxwriter
//!
//! Every driver implements [`Producer`](crate::core::Producer) and/or
//! [`Consumer`](crate::core::Consumer); endpoints pick the right one from
//! configuration.

pub mod database;
pub mod spreadsheet;
pub mod xml;
