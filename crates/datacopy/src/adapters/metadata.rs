//! Destination metadata overlay for weakly typed sources.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::{Producer, RecordStream, Schema, Table};
use crate::error::{CopyError, Result};

/// Shared, set-once reference to the destination schema.
///
/// Created empty when a transfer is assembled and resolved by
/// [`WithMetadata`] once the destination has been opened, so producer
/// adapters further out can see destination column types.
#[derive(Debug, Clone, Default)]
pub struct DestinationMetadata(Arc<OnceLock<Schema>>);

impl DestinationMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is already resolved.
    pub fn resolved(schema: Schema) -> Self {
        let handle = Self::new();
        let _ = handle.0.set(schema);
        handle
    }

    /// Publish the destination schema. Fails if it was already published.
    pub fn resolve(&self, schema: Schema) -> Result<()> {
        self.0
            .set(schema)
            .map_err(|_| CopyError::Lifecycle("destination metadata already resolved".into()))
    }

    pub fn get(&self) -> Option<&Schema> {
        self.0.get()
    }
}

/// Producer adapter that merges destination column definitions into the
/// source schema.
///
/// The metadata producer is the destination endpoint opened as a producer.
/// Matching tables take the destination definition for every column both
/// sides share; columns only the source knows keep their source definition.
pub struct WithMetadata<P, M> {
    source: P,
    metadata: M,
    handle: DestinationMetadata,
    schema: Option<Schema>,
}

impl<P: Producer, M: Producer> WithMetadata<P, M> {
    pub fn new(source: P, metadata: M) -> Self {
        Self {
            source,
            metadata,
            handle: DestinationMetadata::new(),
            schema: None,
        }
    }

    /// Handle resolved with the destination schema once this adapter opens.
    pub fn destination_metadata(&self) -> DestinationMetadata {
        self.handle.clone()
    }
}

fn overlay(source: &Table, destination: &Table) -> Table {
    let columns = source
        .columns
        .iter()
        .map(|col| match destination.column(&col.name) {
            Some(typed) => typed.clone(),
            None => col.clone(),
        })
        .collect();
    Table::new(source.name.clone(), columns)
}

#[async_trait]
impl<P: Producer, M: Producer> Producer for WithMetadata<P, M> {
    fn describe(&self) -> String {
        format!(
            "{} with metadata from {}",
            self.source.describe(),
            self.metadata.describe()
        )
    }

    async fn open(&mut self) -> Result<()> {
        self.source.open().await?;
        self.metadata.open().await?;

        let destination = self.metadata.schema()?.clone();
        let merged: Vec<Table> = self
            .source
            .schema()?
            .tables()
            .iter()
            .map(|table| match destination.table(&table.name) {
                Some(typed) => overlay(table, typed),
                None => {
                    debug!("{}: no destination metadata, keeping source columns", table.name);
                    table.clone()
                }
            })
            .collect();

        self.schema = Some(Schema::new(merged)?);
        self.handle.resolve(destination)?;
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        self.schema
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("schema read before open".into()))
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        self.source.records(table)
    }

    async fn close(&mut self) -> Result<()> {
        let source = self.source.close().await;
        let metadata = self.metadata.close().await;
        if let (Err(_), Err(suppressed)) = (&source, &metadata) {
            warn!("Suppressed error closing metadata source: {}", suppressed);
        }
        source.and(metadata)
    }
}
