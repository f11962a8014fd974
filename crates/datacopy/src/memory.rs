//! In-memory producer and recording consumer.
//!
//! Useful for embedding a data set directly in code and for observing exactly
//! which calls a transfer makes. Both sides can share one [`Recording`] so the
//! interleaving of producer and consumer lifecycle calls is visible.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::Mutex;

use crate::core::{CloseState, Consumer, Producer, Record, RecordStream, Schema, Table};
use crate::error::{CopyError, Result};

/// A lifecycle or data call observed by a [`Recording`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ProducerOpened,
    ProducerClosed,
    ConsumerOpened { tables: usize },
    /// A table call and the records drained from its stream.
    Table { name: String, records: Vec<Record> },
    ConsumerClosed(CloseState),
}

/// Shared, append-only log of [`Event`]s.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn push(&self, event: Event) {
        self.events.lock().await.push(event);
    }

    /// All events in call order.
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Table calls in order, with the records each one received.
    pub async fn tables(&self) -> Vec<(String, Vec<Record>)> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Event::Table { name, records } => Some((name.clone(), records.clone())),
                _ => None,
            })
            .collect()
    }

    /// Names of the tables received, in order.
    pub async fn table_names(&self) -> Vec<String> {
        self.tables().await.into_iter().map(|(n, _)| n).collect()
    }
}

/// Producer over tables held in memory.
#[derive(Debug)]
pub struct MemoryProducer {
    schema: Schema,
    rows: HashMap<String, Vec<Record>>,
    recording: Option<Recording>,
    open: bool,
}

impl MemoryProducer {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: HashMap::new(),
            recording: None,
            open: false,
        }
    }

    /// Set the records of one table.
    #[must_use]
    pub fn with_rows(mut self, table: &str, rows: Vec<Record>) -> Self {
        self.rows.insert(table.to_ascii_lowercase(), rows);
        self
    }

    #[must_use]
    pub fn with_recording(mut self, recording: Recording) -> Self {
        self.recording = Some(recording);
        self
    }
}

#[async_trait]
impl Producer for MemoryProducer {
    fn describe(&self) -> String {
        format!("memory ({} tables)", self.schema.len())
    }

    async fn open(&mut self) -> Result<()> {
        self.open = true;
        if let Some(rec) = &self.recording {
            rec.push(Event::ProducerOpened).await;
        }
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        if !self.open {
            return Err(CopyError::Lifecycle(
                "memory producer schema read before open".into(),
            ));
        }
        Ok(&self.schema)
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        if !self.schema()?.contains(table) {
            return Err(CopyError::transfer(table, "no such table"));
        }
        let rows = self
            .rows
            .get(&table.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default();
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        if let Some(rec) = &self.recording {
            rec.push(Event::ProducerClosed).await;
        }
        Ok(())
    }
}

/// Consumer that records every call it receives.
#[derive(Debug, Default)]
pub struct MemoryConsumer {
    recording: Recording,
    fail_on: Option<String>,
}

impl MemoryConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_recording(mut self, recording: Recording) -> Self {
        self.recording = recording;
        self
    }

    /// Reject the named table with a transfer error after draining it.
    #[must_use]
    pub fn failing_on(mut self, table: impl Into<String>) -> Self {
        self.fail_on = Some(table.into());
        self
    }

    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        self.recording
            .push(Event::ConsumerOpened {
                tables: source.len(),
            })
            .await;
        Ok(())
    }

    async fn table(&mut self, table: &Table, mut records: RecordStream<'_>) -> Result<()> {
        let mut received = Vec::new();
        let mut failure = None;
        while let Some(next) = records.next().await {
            match next {
                Ok(record) => received.push(record),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.recording
            .push(Event::Table {
                name: table.name.clone(),
                records: received,
            })
            .await;

        if let Some(e) = failure {
            return Err(e);
        }
        match &self.fail_on {
            Some(name) if table.is_named(name) => {
                Err(CopyError::transfer(&table.name, "rejected by destination"))
            }
            _ => Ok(()),
        }
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        self.recording.push(Event::ConsumerClosed(state)).await;
        Ok(())
    }
}
