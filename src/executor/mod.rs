//! Pull-based page pipeline.
//!
//! Operators pull one page at a time from their child and hand one page to
//! their parent, so a partition processes each page fully before asking for
//! the next. A [`Driver`] runs one operator chain with one
//! [`DriverContext`](crate::memory::DriverContext); [`PartitionRunner`] runs
//! many drivers in parallel over shared, immutable factories.

mod driver;
mod eval;
mod filter;
mod partition;
mod project;
mod scan;

use crate::data::Page;
use crate::error::Result;

pub use driver::{CancellationToken, Driver, DriverOutput};
pub use eval::EvalOperator;
pub use filter::FilterOperator;
pub use partition::{partition_batches, run_partitions, PartitionRunner, PipelineFactory, Stage};
pub use project::ProjectOperator;
pub use scan::{PageSource, RecordBatchSource};

/// A stage of the page pipeline.
pub trait Operator: Send {
    /// Returns the next page, or `None` once the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if producing or evaluating the page fails. Nothing
    /// built for a failed page is returned or kept.
    fn next_page(&mut self) -> Result<Option<Page>>;

    /// Short operator name for log output.
    fn name(&self) -> &'static str;
}
