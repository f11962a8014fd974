//! Additive schema reconciliation for a consumer.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::{CloseState, Column, Consumer, RecordStream, Schema, Table};
use crate::error::Result;

/// An additive structural change to the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    AddTable(Table),
    AddColumn { table: String, column: Column },
}

/// Reads and alters the structure of a destination store.
#[async_trait]
pub trait SchemaEditor: Send {
    async fn open(&mut self) -> Result<()>;

    /// Current definition of a destination table, `None` if it does not exist.
    async fn current_table(&mut self, name: &str) -> Result<Option<Table>>;

    async fn apply(&mut self, change: &SchemaChange) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Consumer adapter that creates missing tables and columns before each
/// table is written. Existing structure is never dropped or narrowed.
pub struct SchemaReconciling<C, E> {
    inner: C,
    editor: E,
}

impl<C: Consumer, E: SchemaEditor> SchemaReconciling<C, E> {
    pub fn new(inner: C, editor: E) -> Self {
        Self { inner, editor }
    }

    pub fn into_inner(self) -> (C, E) {
        (self.inner, self.editor)
    }

    async fn changes_for(&mut self, table: &Table) -> Result<Vec<SchemaChange>> {
        let Some(current) = self.editor.current_table(&table.name).await? else {
            return Ok(vec![SchemaChange::AddTable(table.clone())]);
        };

        let mut changes = Vec::new();
        for column in &table.columns {
            match current.column(&column.name) {
                None => changes.push(SchemaChange::AddColumn {
                    table: current.name.clone(),
                    column: column.clone(),
                }),
                Some(existing) if existing.data_type != column.data_type => warn!(
                    "{}.{}: destination type {} differs from source type {}, leaving as is",
                    current.name, column.name, existing.data_type, column.data_type
                ),
                Some(_) => {}
            }
        }
        Ok(changes)
    }
}

#[async_trait]
impl<C: Consumer, E: SchemaEditor> Consumer for SchemaReconciling<C, E> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        self.editor.open().await?;
        self.inner.open(source).await
    }

    async fn table(&mut self, table: &Table, records: RecordStream<'_>) -> Result<()> {
        let changes = self
            .changes_for(table)
            .await
            .map_err(|e| e.in_table(&table.name))?;

        for change in &changes {
            match change {
                SchemaChange::AddTable(t) => info!("Creating table: {}", t.name),
                SchemaChange::AddColumn { table, column } => {
                    info!("Adding column: {}.{}", table, column.name)
                }
            }
            self.editor
                .apply(change)
                .await
                .map_err(|e| e.in_table(&table.name))?;
        }

        self.inner.table(table, records).await
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        let inner = self.inner.close(state).await;
        let editor = self.editor.close().await;
        match (inner, editor) {
            (Err(e), Err(suppressed)) => {
                warn!("Suppressed error closing schema editor: {}", suppressed);
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Record};
    use crate::memory::{Event, MemoryConsumer, MemoryProducer, Recording};
    use crate::transfer::Connector;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Editor over an in-memory catalogue that logs applied changes.
    #[derive(Clone, Default)]
    struct Catalogue {
        tables: Arc<Mutex<HashMap<String, Table>>>,
        applied: Arc<Mutex<Vec<SchemaChange>>>,
        recording: Option<Recording>,
    }

    #[async_trait]
    impl SchemaEditor for Catalogue {
        async fn open(&mut self) -> Result<()> {
            Ok(())
        }

        async fn current_table(&mut self, name: &str) -> Result<Option<Table>> {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(&name.to_ascii_lowercase())
                .cloned())
        }

        async fn apply(&mut self, change: &SchemaChange) -> Result<()> {
            if let Some(rec) = &self.recording {
                // a change must land before any table call for it
                assert!(rec.tables().await.is_empty());
            }
            let mut tables = self.tables.lock().unwrap();
            match change {
                SchemaChange::AddTable(t) => {
                    tables.insert(t.name.to_ascii_lowercase(), t.clone());
                }
                SchemaChange::AddColumn { table, column } => {
                    if let Some(t) = tables.get_mut(&table.to_ascii_lowercase()) {
                        t.columns.push(column.clone());
                    }
                }
            }
            self.applied.lock().unwrap().push(change.clone());
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn source_table() -> Table {
        Table::new(
            "CUSTOMER",
            vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("X", DataType::String).nullable(),
            ],
        )
    }

    fn producer() -> MemoryProducer {
        MemoryProducer::new(Schema::new(vec![source_table()]).unwrap()).with_rows(
            "CUSTOMER",
            vec![Record::new().with("id", 1).with("X", "a")],
        )
    }

    #[tokio::test]
    async fn test_missing_column_added_once() {
        let recording = Recording::new();
        let catalogue = Catalogue {
            recording: Some(recording.clone()),
            ..Default::default()
        };
        catalogue.tables.lock().unwrap().insert(
            "customer".into(),
            Table::new("CUSTOMER", vec![Column::new("id", DataType::Integer).primary_key()]),
        );

        let consumer = SchemaReconciling::new(
            MemoryConsumer::new().with_recording(recording.clone()),
            catalogue.clone(),
        );
        Connector::new(producer(), consumer).run().await.unwrap();

        let applied = catalogue.applied.lock().unwrap().clone();
        assert_eq!(applied.len(), 1);
        assert!(matches!(
            &applied[0],
            SchemaChange::AddColumn { table, column } if table == "CUSTOMER" && column.name == "X"
        ));
        assert_eq!(recording.tables().await[0].1.len(), 1);

        // identical schema a second time: nothing to change
        let consumer = SchemaReconciling::new(MemoryConsumer::new(), catalogue.clone());
        Connector::new(producer(), consumer).run().await.unwrap();
        assert_eq!(catalogue.applied.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table_created() {
        let catalogue = Catalogue::default();
        let consumer = SchemaReconciling::new(MemoryConsumer::new(), catalogue.clone());
        Connector::new(producer(), consumer).run().await.unwrap();

        let applied = catalogue.applied.lock().unwrap().clone();
        assert_eq!(applied, vec![SchemaChange::AddTable(source_table())]);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_not_altered() {
        let catalogue = Catalogue::default();
        catalogue.tables.lock().unwrap().insert(
            "customer".into(),
            Table::new(
                "CUSTOMER",
                vec![
                    Column::new("id", DataType::BigInteger),
                    Column::new("x", DataType::Clob),
                ],
            ),
        );
        let recording = Recording::new();
        let consumer = SchemaReconciling::new(
            MemoryConsumer::new().with_recording(recording.clone()),
            catalogue.clone(),
        );
        Connector::new(producer(), consumer).run().await.unwrap();

        assert!(catalogue.applied.lock().unwrap().is_empty());
        assert!(recording
            .events()
            .await
            .contains(&Event::ConsumerClosed(CloseState::Complete)));
    }
}
