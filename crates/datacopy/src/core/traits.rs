//! Core traits for store-agnostic data transfer.
//!
//! - [`Producer`]: opens a source, exposes its [`Schema`] and streams records
//! - [`Consumer`]: opens a destination and accepts one table at a time
//!
//! Adapters implement the same traits around a delegate, so a producer or
//! consumer chain can be assembled in any order. `Box<dyn Producer>` and
//! `Box<dyn Consumer>` implement the traits too, which lets generic adapters
//! wrap boxed endpoints.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

use super::schema::{Schema, Table};
use super::value::Record;

/// Lazy, finite, single-pass sequence of records for one table.
///
/// The stream may borrow its producer, so a second table cannot be requested
/// until the first stream has been dropped.
pub type RecordStream<'a> = BoxStream<'a, Result<Record>>;

/// How a consumer is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    /// Every table was transferred.
    Complete,
    /// The transfer failed or was cancelled.
    Incomplete,
}

/// Source of a data set.
#[async_trait]
pub trait Producer: Send {
    /// Human-readable description used in logs.
    fn describe(&self) -> String;

    /// Acquire connections or file handles and load the schema.
    ///
    /// Fails with a resource-open error when the store cannot be reached.
    async fn open(&mut self) -> Result<()>;

    /// Tables exposed by this producer. Only valid after [`Producer::open`].
    fn schema(&self) -> Result<&Schema>;

    /// Records of one table in store order, read as the stream is polled.
    fn records(&mut self, table: &str) -> Result<RecordStream<'_>>;

    /// Release everything acquired by `open`. Safe to call when `open` failed
    /// or was never called.
    async fn close(&mut self) -> Result<()>;
}

/// Destination of a data set.
#[async_trait]
pub trait Consumer: Send {
    /// Human-readable description used in logs.
    fn describe(&self) -> String;

    /// Acquire the destination. `source` is the schema about to be written.
    async fn open(&mut self, source: &Schema) -> Result<()>;

    /// Write one table. Must drain `records` before returning successfully.
    async fn table(&mut self, table: &Table, records: RecordStream<'_>) -> Result<()>;

    /// Release the destination. Safe to call when `open` failed or was never
    /// called.
    async fn close(&mut self, state: CloseState) -> Result<()>;
}

#[async_trait]
impl<P: Producer + ?Sized> Producer for Box<P> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    fn schema(&self) -> Result<&Schema> {
        (**self).schema()
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        (**self).records(table)
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<C: Consumer + ?Sized> Consumer for Box<C> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        (**self).open(source).await
    }

    async fn table(&mut self, table: &Table, records: RecordStream<'_>) -> Result<()> {
        (**self).table(table, records).await
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        (**self).close(state).await
    }
}
