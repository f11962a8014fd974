use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::pool::{display_url, DatabasePool, PageStart};
use crate::config::DatabaseConfig;
use crate::core::{Producer, Record, RecordStream, Schema, Table, Value};
use crate::error::{CopyError, Result};

/// Rows fetched per query.
pub const PAGE_SIZE: u64 = 10_000;

/// Reads every user table of a database.
pub struct DatabaseProducer {
    config: DatabaseConfig,
    pool: Option<DatabasePool>,
    schema: Option<Schema>,
}

impl DatabaseProducer {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: None,
            schema: None,
        }
    }

    fn pool(&self) -> Result<&DatabasePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("database producer used before open".into()))
    }
}

/// Paging state for one table's record stream.
struct Pager {
    pool: DatabasePool,
    schema_name: String,
    table: Table,
    page_size: u64,
    /// Rows handed out so far.
    fetched: u64,
    next: Option<PageStart>,
}

impl Pager {
    fn new(pool: DatabasePool, schema_name: String, table: Table, page_size: u64) -> Self {
        Self {
            pool,
            schema_name,
            table,
            page_size,
            fetched: 0,
            next: Some(PageStart::First),
        }
    }

    async fn next_page(mut self) -> Result<Option<(Vec<Record>, Self)>> {
        let Some(start) = self.next.take() else {
            return Ok(None);
        };
        let page = self
            .pool
            .fetch_page(&self.schema_name, &self.table, &start, self.page_size)
            .await?;
        if page.is_empty() {
            return Ok(None);
        }
        debug!(
            "{}: fetched {} rows after {}",
            self.table.name,
            page.len(),
            self.fetched
        );
        self.fetched += page.len() as u64;
        if (page.len() as u64) == self.page_size {
            self.next = Some(self.following(&page));
        }
        Ok(Some((page, self)))
    }

    /// Where the page after `page` starts. NULL keys never compare greater,
    /// so those continue by offset in the same key order.
    fn following(&self, page: &[Record]) -> PageStart {
        let pk = self.table.primary_key();
        let key: Option<Vec<Value>> = page.last().and_then(|last| {
            pk.iter()
                .map(|c| last.get(&c.name).filter(|v| !v.is_null()).cloned())
                .collect()
        });
        match key {
            Some(key) if !pk.is_empty() => PageStart::After(key),
            _ => PageStart::Offset(self.fetched),
        }
    }

    fn into_stream(self) -> RecordStream<'static> {
        stream::try_unfold(self, Pager::next_page)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, CopyError>)))
            .try_flatten()
            .boxed()
    }
}

#[async_trait]
impl Producer for DatabaseProducer {
    fn describe(&self) -> String {
        format!("database [{}]", display_url(&self.config.url))
    }

    async fn open(&mut self) -> Result<()> {
        let pool = self
            .pool
            .insert(DatabasePool::connect(&self.config, false).await?);
        let tables = pool.tables(&self.config.schema_name).await?;
        info!("Loaded {} tables from {}", tables.len(), self.describe());
        self.schema = Some(Schema::new(tables)?);
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        self.schema
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("database schema read before open".into()))
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        let table = self
            .schema()?
            .table(table)
            .cloned()
            .ok_or_else(|| CopyError::transfer(table, "no such table in the source database"))?;
        let pool = self.pool()?.clone();
        Ok(Pager::new(pool, self.config.schema_name.clone(), table, PAGE_SIZE).into_stream())
    }

    async fn close(&mut self) -> Result<()> {
        self.schema = None;
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        Ok(())
    }
}
