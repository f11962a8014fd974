//! Progress reporting and cancellation for a consumer.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::debug;

use crate::core::{CloseState, Consumer, RecordStream, Schema, Table};
use crate::error::{CopyError, Result};
use crate::monitor::ProgressMonitor;

/// Records between task label updates within one table.
pub const REPORT_EVERY: u64 = 10_000;

/// Consumer adapter reporting one unit of work per table.
///
/// Cancellation is polled before each table and before each record is pulled
/// from the source; a positive poll fails with [`CopyError::Cancelled`].
pub struct ProgressTracking<C, M> {
    inner: C,
    monitor: M,
    total: u64,
    started: bool,
}

impl<C: Consumer, M: ProgressMonitor> ProgressTracking<C, M> {
    pub fn new(inner: C, monitor: M) -> Self {
        Self {
            inner,
            monitor,
            total: 0,
            started: false,
        }
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    pub fn into_inner(self) -> (C, M) {
        (self.inner, self.monitor)
    }
}

#[async_trait]
impl<C: Consumer, M: ProgressMonitor> Consumer for ProgressTracking<C, M> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        self.total = source.len() as u64;
        self.inner.open(source).await
    }

    async fn table(&mut self, table: &Table, records: RecordStream<'_>) -> Result<()> {
        if !self.started {
            self.monitor.begin_task("Transferring data set", self.total);
            self.started = true;
        }
        if self.monitor.is_cancelled() {
            return Err(CopyError::Cancelled);
        }

        self.monitor.set_task_name(&table.name);
        debug!("Processing table [{}]", table.name);

        let tracked = track(records, &mut self.monitor, table.name.clone());
        self.inner.table(table, tracked).await?;

        self.monitor.worked(1);
        Ok(())
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        let result = self.inner.close(state).await;
        self.monitor.done();
        result
    }
}

struct Tracker<'a, M> {
    records: RecordStream<'a>,
    monitor: &'a mut M,
    table: String,
    count: u64,
    finished: bool,
}

fn track<'a, M: ProgressMonitor>(
    records: RecordStream<'a>,
    monitor: &'a mut M,
    table: String,
) -> RecordStream<'a> {
    let tracker = Tracker {
        records,
        monitor,
        table,
        count: 0,
        finished: false,
    };

    stream::unfold(tracker, |mut t| async move {
        if t.finished {
            return None;
        }
        if t.monitor.is_cancelled() {
            t.finished = true;
            return Some((Err(CopyError::Cancelled), t));
        }
        match t.records.next().await? {
            Ok(record) => {
                t.count += 1;
                if t.count % REPORT_EVERY == 0 {
                    let label = format!(
                        "{} records transferred: {}",
                        t.table,
                        group_thousands(t.count)
                    );
                    t.monitor.set_task_name(&label);
                }
                Some((Ok(record), t))
            }
            Err(e) => {
                t.finished = true;
                Some((Err(e), t))
            }
        }
    })
    .boxed()
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
