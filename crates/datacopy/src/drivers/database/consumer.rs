use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::pool::{display_url, DatabasePool};
use crate::config::DatabaseConfig;
use crate::core::{CloseState, Column, Consumer, RecordStream, Schema, Table, Value};
use crate::error::{CopyError, Result};

/// Rows buffered before an INSERT is issued.
const BATCH_ROWS: usize = 1_000;

/// Replaces the contents of existing destination tables.
pub struct DatabaseConsumer {
    config: DatabaseConfig,
    pool: Option<DatabasePool>,
}

impl DatabaseConsumer {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, pool: None }
    }

    fn pool(&self) -> Result<&DatabasePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("database consumer used before open".into()))
    }
}

#[async_trait]
impl Consumer for DatabaseConsumer {
    fn describe(&self) -> String {
        format!("database [{}]", display_url(&self.config.url))
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        self.pool = Some(DatabasePool::connect(&self.config, true).await?);
        info!("Writing {} tables to {}", source.len(), self.describe());
        Ok(())
    }

    async fn table(&mut self, table: &Table, mut records: RecordStream<'_>) -> Result<()> {
        let pool = self.pool()?.clone();
        let schema_name = self.config.schema_name.as_str();

        let destination = pool
            .table(schema_name, &table.name)
            .await?
            .ok_or_else(|| CopyError::transfer(&table.name, "destination table does not exist"))?;

        let columns: Vec<Column> = destination
            .columns
            .iter()
            .filter(|c| table.column(&c.name).is_some())
            .cloned()
            .collect();
        for column in &table.columns {
            if destination.column(&column.name).is_none() {
                debug!(
                    "{}.{}: no such destination column, skipping",
                    destination.name, column.name
                );
            }
        }

        if columns.is_empty() {
            return Err(CopyError::transfer(
                &table.name,
                "no columns in common with destination",
            ));
        }

        let deleted = pool.delete_all(schema_name, &destination.name).await?;
        debug!("{}: deleted {} existing rows", destination.name, deleted);

        let batch_rows = (pool.vendor().max_placeholders() / columns.len().max(1)).clamp(1, BATCH_ROWS);
        let mut buffer: Vec<Vec<Value>> = Vec::with_capacity(batch_rows);
        let mut written = 0u64;

        while let Some(record) = records.next().await {
            let mut record = record?;
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = record
                    .take(&column.name)
                    .unwrap_or(Value::Null)
                    .coerce(column.data_type)
                    .map_err(|e| {
                        CopyError::transfer(&table.name, format!("column {}: {}", column.name, e))
                    })?;
                row.push(value);
            }
            buffer.push(row);

            if buffer.len() >= batch_rows {
                written += pool
                    .insert(schema_name, &destination.name, &columns, &buffer)
                    .await?;
                buffer.clear();
            }
        }
        if !buffer.is_empty() {
            written += pool
                .insert(schema_name, &destination.name, &columns, &buffer)
                .await?;
        }

        debug!("{}: wrote {} rows", destination.name, written);
        Ok(())
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            if state == CloseState::Incomplete {
                warn!("{} may hold partially written tables", self.describe());
            }
        }
        Ok(())
    }
}
