use async_trait::async_trait;
use tracing::debug;

use super::pool::DatabasePool;
use crate::adapters::{SchemaChange, SchemaEditor};
use crate::config::DatabaseConfig;
use crate::core::Table;
use crate::error::{CopyError, Result};

/// Applies additive DDL to a database through its own pool.
pub struct DatabaseSchemaEditor {
    config: DatabaseConfig,
    pool: Option<DatabasePool>,
}

impl DatabaseSchemaEditor {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, pool: None }
    }

    fn pool(&self) -> Result<&DatabasePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("schema editor used before open".into()))
    }
}

#[async_trait]
impl SchemaEditor for DatabaseSchemaEditor {
    async fn open(&mut self) -> Result<()> {
        self.pool = Some(DatabasePool::connect(&self.config, true).await?);
        Ok(())
    }

    async fn current_table(&mut self, name: &str) -> Result<Option<Table>> {
        self.pool()?.table(&self.config.schema_name, name).await
    }

    async fn apply(&mut self, change: &SchemaChange) -> Result<()> {
        let pool = self.pool()?;
        let vendor = pool.vendor();
        let schema = &self.config.schema_name;
        let (table, sql) = match change {
            SchemaChange::AddTable(table) => (&table.name, vendor.create_table(schema, table)),
            SchemaChange::AddColumn { table, column } => {
                (table, vendor.add_column(schema, table, column))
            }
        };
        debug!("{}: {}", table, sql);
        pool.execute(&sql)
            .await
            .map_err(|e| CopyError::transfer(table.as_str(), format!("schema change: {}", e)))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        Ok(())
    }
}
