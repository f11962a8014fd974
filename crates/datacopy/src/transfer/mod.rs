//! Connector driving a transfer from one producer to one consumer.
//!
//! Tables are transferred strictly one after another, in the order the
//! producer's schema declares them. Each table's record stream is handed to
//! the consumer and must be drained before the next table is requested.
//!
//! Both sides always receive a close attempt. The consumer is closed first,
//! then the producer; the first error seen anywhere is the one returned and
//! later close errors are logged.

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{CloseState, Consumer, Producer};
use crate::error::{CopyError, Result};

/// Outcome of a successful transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the transfer started.
    pub started_at: DateTime<Utc>,

    /// When the transfer completed.
    pub completed_at: DateTime<Utc>,

    /// Tables transferred.
    pub tables: usize,

    /// Records read from the producer.
    pub records: u64,

    /// Average throughput (records/second).
    pub records_per_second: u64,
}

impl TransferSummary {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drives the table-by-table loop between a producer and a consumer.
pub struct Connector<P, C> {
    producer: P,
    consumer: C,
}

impl<P: Producer, C: Consumer> Connector<P, C> {
    pub fn new(producer: P, consumer: C) -> Self {
        Self { producer, consumer }
    }

    /// Run the transfer to completion, consuming both sides.
    pub async fn run(mut self) -> Result<TransferSummary> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        debug!(
            "Transfer {}: {} -> {}",
            run_id,
            self.producer.describe(),
            self.consumer.describe()
        );

        let outcome = self.transfer().await;
        let state = if outcome.is_ok() {
            CloseState::Complete
        } else {
            CloseState::Incomplete
        };

        let mut first_error = None;
        let totals = match outcome {
            Ok(totals) => Some(totals),
            Err(e) => {
                first_error = Some(e);
                None
            }
        };

        if let Err(e) = self.consumer.close(state).await {
            keep_first(&mut first_error, e, "consumer");
        }
        if let Err(e) = self.producer.close().await {
            keep_first(&mut first_error, e, "producer");
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        let (tables, records) = totals.unwrap_or_default();

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let records_per_second = if duration > 0.0 {
            (records as f64 / duration) as u64
        } else {
            records
        };

        info!(
            "Transferred {} tables ({} records) in {:.1}s",
            tables, records, duration
        );

        Ok(TransferSummary {
            run_id,
            status: "completed".to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            tables,
            records,
            records_per_second,
        })
    }

    async fn transfer(&mut self) -> Result<(usize, u64)> {
        self.producer.open().await?;
        let schema = self.producer.schema()?.clone();
        self.consumer.open(&schema).await?;

        let mut total = 0u64;
        for table in schema.tables() {
            debug!("{}: transferring", table.name);
            let mut rows = 0u64;

            let records = self
                .producer
                .records(&table.name)
                .map_err(|e| e.in_table(&table.name))?
                .inspect_ok(|_| rows += 1)
                .boxed();
            self.consumer
                .table(table, records)
                .await
                .map_err(|e| e.in_table(&table.name))?;

            debug!("{}: completed ({} records)", table.name, rows);
            total += rows;
        }

        Ok((schema.len(), total))
    }
}

fn keep_first(first: &mut Option<CopyError>, err: CopyError, side: &str) {
    match first {
        Some(_) => warn!("Suppressed error closing {}: {}", side, err),
        None => *first = Some(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Record, RecordStream, Schema, Table, Value};
    use crate::memory::{Event, MemoryConsumer, MemoryProducer, Recording};
    use async_trait::async_trait;
    use futures::stream;

    fn schema() -> Schema {
        Schema::new(vec![
            Table::new(
                "CUSTOMER",
                vec![
                    Column::new("id", DataType::Integer).primary_key(),
                    Column::new("name", DataType::String).nullable(),
                ],
            ),
            Table::new(
                "ORDER",
                vec![
                    Column::new("id", DataType::Integer).primary_key(),
                    Column::new("customer_id", DataType::Integer),
                ],
            ),
        ])
        .unwrap()
    }

    fn producer(recording: &Recording) -> MemoryProducer {
        MemoryProducer::new(schema())
            .with_rows(
                "CUSTOMER",
                vec![
                    Record::new().with("id", 1).with("name", "Ada"),
                    Record::new().with("id", 2).with("name", "Grace"),
                ],
            )
            .with_rows(
                "ORDER",
                vec![Record::new().with("id", 10).with("customer_id", 1)],
            )
            .with_recording(recording.clone())
    }

    #[tokio::test]
    async fn test_tables_visited_once_in_declared_order() {
        let recording = Recording::new();
        let consumer = MemoryConsumer::new().with_recording(recording.clone());

        let summary = Connector::new(producer(&recording), consumer)
            .run()
            .await
            .unwrap();
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.records, 3);

        let events = recording.events().await;
        assert_eq!(events.first(), Some(&Event::ProducerOpened));
        assert_eq!(events[1], Event::ConsumerOpened { tables: 2 });
        assert_eq!(recording.table_names().await, vec!["CUSTOMER", "ORDER"]);

        let tables = recording.tables().await;
        assert!(tables[0].1.iter().all(|r| r.len() == 2));
        assert_eq!(tables[1].1[0].get("customer_id"), Some(&Value::Integer(1)));

        // consumer closes before producer
        let n = events.len();
        assert_eq!(events[n - 2], Event::ConsumerClosed(CloseState::Complete));
        assert_eq!(events[n - 1], Event::ProducerClosed);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_tables_and_closes_both() {
        let recording = Recording::new();
        let consumer = MemoryConsumer::new()
            .with_recording(recording.clone())
            .failing_on("CUSTOMER");

        let err = Connector::new(producer(&recording), consumer)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Transfer { ref table, .. } if table == "CUSTOMER"));

        assert_eq!(recording.table_names().await, vec!["CUSTOMER"]);
        let events = recording.events().await;
        assert!(events.contains(&Event::ConsumerClosed(CloseState::Incomplete)));
        assert_eq!(events.last(), Some(&Event::ProducerClosed));
    }

    struct BrokenProducer {
        schema: Schema,
        closed: Recording,
    }

    #[async_trait]
    impl Producer for BrokenProducer {
        fn describe(&self) -> String {
            "broken".into()
        }

        async fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn schema(&self) -> Result<&Schema> {
            Ok(&self.schema)
        }

        fn records(&mut self, _table: &str) -> Result<RecordStream<'_>> {
            Ok(stream::iter(vec![
                Ok(Record::new().with("id", 1)),
                Err(CopyError::Xml("truncated document".into())),
            ])
            .boxed())
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.push(Event::ProducerClosed).await;
            Err(CopyError::Lifecycle("close failed".into()))
        }
    }

    #[tokio::test]
    async fn test_first_error_wins_over_close_errors() {
        let recording = Recording::new();
        let producer = BrokenProducer {
            schema: schema(),
            closed: recording.clone(),
        };
        let consumer = MemoryConsumer::new().with_recording(recording.clone());

        let err = Connector::new(producer, consumer).run().await.unwrap_err();
        match err {
            CopyError::Transfer { table, message } => {
                assert_eq!(table, "CUSTOMER");
                assert!(message.contains("truncated document"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let tables = recording.tables().await;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].1.len(), 1);
        assert!(recording.events().await.contains(&Event::ProducerClosed));
    }

    #[tokio::test]
    async fn test_open_failure_still_closes_consumer() {
        let recording = Recording::new();
        let producer = MemoryProducer::new(schema()).with_recording(recording.clone());
        struct Unreachable;

        #[async_trait]
        impl Consumer for Unreachable {
            fn describe(&self) -> String {
                "unreachable".into()
            }
            async fn open(&mut self, _source: &Schema) -> Result<()> {
                Err(CopyError::open("db", "connection refused"))
            }
            async fn table(&mut self, _t: &Table, _r: RecordStream<'_>) -> Result<()> {
                unreachable!("table called on unopened consumer")
            }
            async fn close(&mut self, state: CloseState) -> Result<()> {
                assert_eq!(state, CloseState::Incomplete);
                Ok(())
            }
        }

        let err = Connector::new(producer, Unreachable).run().await.unwrap_err();
        assert!(matches!(err, CopyError::ResourceOpen { .. }));
        assert_eq!(recording.events().await.last(), Some(&Event::ProducerClosed));
    }
}
