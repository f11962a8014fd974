//! Decorators that add one cross-cutting behaviour to a producer or consumer.
//!
//! Every adapter implements the same trait as the delegate it owns and
//! forwards all lifecycle calls to it, so adapters stack in any order:
//!
//! - [`ProgressTracking`]: reports to a [`crate::monitor::ProgressMonitor`]
//!   and stops on cancellation (consumer side)
//! - [`SchemaReconciling`]: adds missing destination tables and columns
//!   before a table is written (consumer side)
//! - [`BlanksToZero`]: writes zero into blank numeric fields (producer side)
//! - [`WithMetadata`]: overlays destination column definitions on a weakly
//!   typed source (producer side)

mod blanks;
mod metadata;
mod progress;
mod reconcile;

pub use blanks::BlanksToZero;
pub use metadata::{DestinationMetadata, WithMetadata};
pub use progress::{ProgressTracking, REPORT_EVERY};
pub use reconcile::{SchemaChange, SchemaEditor, SchemaReconciling};
