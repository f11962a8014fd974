//! Relational databases through sqlx (SQLite and PostgreSQL).
//!
//! The producer exposes every user table of the configured schema and reads
//! it in pages ordered by primary key. The consumer replaces the contents of
//! tables that already exist at the destination; pair it with
//! [`DatabaseSchemaEditor`] to create what is missing first.

mod consumer;
mod dialect;
mod editor;
mod pool;
mod producer;

pub use consumer::DatabaseConsumer;
pub use dialect::{data_type_from, Vendor};
pub use editor::DatabaseSchemaEditor;
pub use pool::{DatabasePool, PageStart};
pub(crate) use pool::display_url;
pub use producer::{DatabaseProducer, PAGE_SIZE};
