//! Progress and cancellation monitors.
//!
//! The progress adapter reports through the narrow [`ProgressMonitor`]
//! interface and polls it for cancellation at every table and record
//! boundary. Cancellation itself comes from outside the transfer: wrap any
//! monitor in [`Cancellable`] to bind it to a [`CancellationToken`].

mod text_bar;

pub use text_bar::TextProgressBar;

use tokio_util::sync::CancellationToken;

/// Receives progress reports and answers cancellation polls.
pub trait ProgressMonitor: Send {
    /// Start a task of `total` units.
    fn begin_task(&mut self, name: &str, total: u64);

    /// Record `units` of completed work.
    fn worked(&mut self, units: u64);

    /// Replace the label of the current task.
    fn set_task_name(&mut self, label: &str);

    /// Whether the transfer should stop.
    fn is_cancelled(&self) -> bool;

    /// The task finished.
    fn done(&mut self);
}

impl<M: ProgressMonitor + ?Sized> ProgressMonitor for Box<M> {
    fn begin_task(&mut self, name: &str, total: u64) {
        (**self).begin_task(name, total)
    }

    fn worked(&mut self, units: u64) {
        (**self).worked(units)
    }

    fn set_task_name(&mut self, label: &str) {
        (**self).set_task_name(label)
    }

    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }

    fn done(&mut self) {
        (**self).done()
    }
}

/// Monitor that reports nothing and is never cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentMonitor;

impl ProgressMonitor for SilentMonitor {
    fn begin_task(&mut self, _name: &str, _total: u64) {}

    fn worked(&mut self, _units: u64) {}

    fn set_task_name(&mut self, _label: &str) {}

    fn is_cancelled(&self) -> bool {
        false
    }

    fn done(&mut self) {}
}

/// Adds an external cancellation token to a monitor.
#[derive(Debug)]
pub struct Cancellable<M> {
    inner: M,
    token: CancellationToken,
}

impl<M: ProgressMonitor> Cancellable<M> {
    pub fn new(inner: M, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: ProgressMonitor> ProgressMonitor for Cancellable<M> {
    fn begin_task(&mut self, name: &str, total: u64) {
        self.inner.begin_task(name, total);
    }

    fn worked(&mut self, units: u64) {
        self.inner.worked(units);
    }

    fn set_task_name(&mut self, label: &str) {
        self.inner.set_task_name(label);
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.inner.is_cancelled()
    }

    fn done(&mut self) {
        self.inner.done();
    }
}
