//! Blank-to-zero normalisation for numeric destination columns.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};

use crate::core::{Producer, RecordStream, Schema, Value};
use crate::error::{CopyError, Result};

use super::DestinationMetadata;

/// Producer adapter that turns NULL or blank values into zero for every
/// column the destination declares as numeric.
pub struct BlanksToZero<P> {
    inner: P,
    destination: DestinationMetadata,
}

impl<P: Producer> BlanksToZero<P> {
    pub fn new(inner: P, destination: DestinationMetadata) -> Self {
        Self { inner, destination }
    }
}

#[async_trait]
impl<P: Producer> Producer for BlanksToZero<P> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn open(&mut self) -> Result<()> {
        self.inner.open().await
    }

    fn schema(&self) -> Result<&Schema> {
        self.inner.schema()
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        let destination = self
            .destination
            .get()
            .ok_or_else(|| CopyError::transfer(table, "destination metadata not available"))?;

        let zeros: Vec<(String, Value)> = destination
            .table(table)
            .map(|t| {
                t.columns
                    .iter()
                    .filter_map(|c| Value::zero_for(c.data_type).map(|z| (c.name.clone(), z)))
                    .collect()
            })
            .unwrap_or_default();

        let records = self.inner.records(table)?;
        if zeros.is_empty() {
            return Ok(records);
        }

        Ok(records
            .map_ok(move |mut record| {
                for (column, zero) in &zeros {
                    if let Some(value) = record.get_mut(column) {
                        if value.is_blank() {
                            *value = zero.clone();
                        }
                    }
                }
                record
            })
            .boxed())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Record, Table};
    use crate::memory::MemoryProducer;
    use rust_decimal::Decimal;

    fn source() -> MemoryProducer {
        let schema = Schema::new(vec![Table::new(
            "STOCK",
            vec![
                Column::new("item", DataType::String).nullable(),
                Column::new("qty", DataType::String).nullable(),
                Column::new("cost", DataType::String).nullable(),
                Column::new("note", DataType::String).nullable(),
            ],
        )])
        .unwrap();
        MemoryProducer::new(schema).with_rows(
            "STOCK",
            vec![
                Record::new()
                    .with("item", "bolt")
                    .with("qty", "  ")
                    .with("cost", Value::Null)
                    .with("note", ""),
                Record::new()
                    .with("item", "nut")
                    .with("qty", "12")
                    .with("cost", "0.25")
                    .with("note", Value::Null),
            ],
        )
    }

    fn destination() -> Schema {
        Schema::new(vec![Table::new(
            "stock",
            vec![
                Column::new("ITEM", DataType::String),
                Column::new("QTY", DataType::Integer),
                Column::new("COST", DataType::Decimal),
                Column::new("NOTE", DataType::Clob).nullable(),
            ],
        )])
        .unwrap()
    }

    #[tokio::test]
    async fn test_blank_numeric_fields_become_zero() {
        let mut producer =
            BlanksToZero::new(source(), DestinationMetadata::resolved(destination()));
        producer.open().await.unwrap();
        let rows: Vec<Record> = producer
            .records("STOCK")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(rows[0].get("qty"), Some(&Value::Integer(0)));
        assert_eq!(rows[0].get("cost"), Some(&Value::Decimal(Decimal::ZERO)));
        // text columns keep their blanks
        assert_eq!(rows[0].get("note"), Some(&Value::Text(String::new())));
        // populated values are untouched
        assert_eq!(rows[1].get("qty"), Some(&Value::Text("12".into())));
        assert_eq!(rows[1].get("note"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_unresolved_destination_is_a_transfer_error() {
        let mut producer = BlanksToZero::new(source(), DestinationMetadata::new());
        producer.open().await.unwrap();
        let err = producer.records("STOCK").err().unwrap();
        assert!(matches!(err, CopyError::Transfer { .. }));
    }
}
