//! Parallel partitions.
//!
//! A [`PipelineFactory`] holds shared, immutable evaluator factories. Each
//! partition gets its own [`DriverContext`], binds fresh evaluators from the
//! factories and runs on a rayon worker. Nothing mutable crosses partitions
//! except the optional parent budget, which is thread-safe.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::error::{ColexecError, Result};
use crate::evaluator::SharedFactory;
use crate::executor::driver::{CancellationToken, Driver, DriverOutput};
use crate::executor::{EvalOperator, FilterOperator, Operator, ProjectOperator};
use crate::memory::{DriverContext, MemoryBudget};

/// One step of a pipeline description.
#[derive(Clone)]
pub enum Stage {
    /// Append the expression's result as a new channel.
    Eval(SharedFactory),
    /// Keep positions where the boolean expression is `true`.
    Filter(SharedFactory),
    /// Keep only these channels, in this order.
    Project(Vec<usize>),
}

/// Shareable description of an operator chain above a source.
#[derive(Clone, Default)]
pub struct PipelineFactory {
    stages: Vec<Stage>,
}

impl PipelineFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eval(mut self, factory: SharedFactory) -> Self {
        self.stages.push(Stage::Eval(factory));
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: SharedFactory) -> Self {
        self.stages.push(Stage::Filter(predicate));
        self
    }

    #[must_use]
    pub fn project(mut self, channels: Vec<usize>) -> Self {
        self.stages.push(Stage::Project(channels));
        self
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Binds the stages to `ctx` on top of `source`.
    #[must_use]
    pub fn build(&self, source: Box<dyn Operator>, ctx: &DriverContext) -> Box<dyn Operator> {
        self.stages
            .iter()
            .fold(source, |child, stage| -> Box<dyn Operator> {
                match stage {
                    Stage::Eval(factory) => Box::new(EvalOperator::new(child, factory.get(ctx))),
                    Stage::Filter(factory) => {
                        Box::new(FilterOperator::new(child, factory.get(ctx), ctx))
                    }
                    Stage::Project(channels) => {
                        Box::new(ProjectOperator::new(child, channels.clone()))
                    }
                }
            })
    }
}

/// Runs one driver per partition on a dedicated rayon pool.
pub struct PartitionRunner {
    config: DriverConfig,
    parent_budget: Option<Arc<MemoryBudget>>,
    cancel: CancellationToken,
}

impl PartitionRunner {
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            parent_budget: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Charges every partition's budget to `parent` as well.
    #[must_use]
    pub fn with_parent_budget(mut self, parent: Arc<MemoryBudget>) -> Self {
        self.parent_budget = Some(parent);
        self
    }

    /// Uses `cancel` for every driver instead of a private token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token shared by all drivers of this runner.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn context(&self) -> DriverContext {
        match &self.parent_budget {
            Some(parent) => DriverContext::with_parent_budget(parent, &self.config),
            None => DriverContext::new(&self.config),
        }
    }

    /// Runs `partitions` drivers, partition `i` reading from `source(i, ctx)`.
    ///
    /// Results come back in partition order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first partition to fail. The remaining
    /// partitions are cancelled once one fails, and their `Cancelled` errors
    /// are not reported. `Cancelled` is returned only when the token was
    /// cancelled from outside.
    pub fn run<S>(
        &self,
        partitions: usize,
        pipeline: &PipelineFactory,
        source: S,
    ) -> Result<Vec<DriverOutput>>
    where
        S: Fn(usize, &DriverContext) -> Result<Box<dyn Operator>> + Sync,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.partitions.max(1))
            .thread_name(|i| format!("colexec-driver-{i}"))
            .build()
            .map_err(|e| ColexecError::ExecutionError(format!("failed to build driver pool: {e}")))?;

        debug!(partitions, threads = self.config.partitions, "running partitions");
        let first_error: Mutex<Option<ColexecError>> = Mutex::new(None);
        let results: Vec<Result<DriverOutput>> = pool.install(|| {
            (0..partitions)
                .into_par_iter()
                .map(|partition| {
                    let ctx = self.context();
                    let result = source(partition, &ctx).and_then(|input| {
                        let root = pipeline.build(input, &ctx);
                        Driver::new(ctx, root, self.cancel.clone()).collect()
                    });
                    match result {
                        Err(ColexecError::Cancelled) => Err(ColexecError::Cancelled),
                        Err(e) => {
                            warn!(partition, error = %e, "partition failed");
                            self.cancel.cancel();
                            let mut first = first_error.lock();
                            if first.is_none() {
                                *first = Some(e);
                            }
                            Err(ColexecError::Cancelled)
                        }
                        ok => ok,
                    }
                })
                .collect()
        });

        if let Some(e) = first_error.into_inner() {
            return Err(e);
        }
        results.into_iter().collect()
    }
}

/// Splits `batches` round-robin into `partitions` groups.
#[must_use]
pub fn partition_batches(batches: Vec<RecordBatch>, partitions: usize) -> Vec<Vec<RecordBatch>> {
    let mut groups = vec![Vec::new(); partitions.max(1)];
    let n = groups.len();
    for (i, batch) in batches.into_iter().enumerate() {
        groups[i % n].push(batch);
    }
    groups
}

/// Runs `pipeline` over `batches`, one partition per configured worker.
///
/// # Errors
///
/// Same as [`PartitionRunner::run`].
pub fn run_partitions(
    config: &DriverConfig,
    pipeline: &PipelineFactory,
    batches: Vec<RecordBatch>,
) -> Result<Vec<DriverOutput>> {
    let groups = partition_batches(batches, config.partitions);
    let page_size = config.page_size;
    PartitionRunner::new(config.clone()).run(groups.len(), pipeline, |partition, ctx| {
        let batches = groups.get(partition).cloned().unwrap_or_default();
        Ok(Box::new(crate::executor::RecordBatchSource::new(ctx, batches, page_size)) as Box<dyn Operator>)
    })
}
