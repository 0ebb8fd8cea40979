//! Driver: runs one operator chain to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::data::Page;
use crate::error::{ColexecError, Result};
use crate::executor::Operator;
use crate::memory::DriverContext;

/// Cooperative cancellation flag, checked by drivers between pages.
///
/// Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. A page already being evaluated still completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What a driver produced.
#[derive(Debug)]
pub struct DriverOutput {
    /// Output pages, in order.
    pub pages: Vec<Page>,
    /// Positions across all output pages.
    pub positions: usize,
    /// Value warnings recorded while running.
    pub warnings: Vec<String>,
    /// The context the pages are charged to.
    pub context: DriverContext,
}

/// Runs one operator chain within one driver context.
///
/// Evaluation within a driver is single-threaded; parallelism comes from
/// running several drivers.
pub struct Driver {
    ctx: DriverContext,
    root: Box<dyn Operator>,
    cancel: CancellationToken,
}

impl Driver {
    /// Creates a driver pulling from `root`.
    #[must_use]
    pub fn new(ctx: DriverContext, root: Box<dyn Operator>, cancel: CancellationToken) -> Self {
        Driver { ctx, root, cancel }
    }

    /// Returns the driver context.
    #[must_use]
    pub fn context(&self) -> &DriverContext {
        &self.ctx
    }

    /// Pulls every page and hands it to `sink`.
    ///
    /// Returns the number of pages produced.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the token is set between pages, or the first
    /// error raised by an operator or by `sink`.
    pub fn run<F>(&mut self, mut sink: F) -> Result<usize>
    where
        F: FnMut(Page) -> Result<()>,
    {
        debug!(driver = %self.ctx.id(), root = self.root.name(), "driver started");
        let mut pages = 0;
        loop {
            if self.cancel.is_cancelled() {
                debug!(driver = %self.ctx.id(), pages, "driver cancelled");
                return Err(ColexecError::Cancelled);
            }
            let Some(page) = self.root.next_page()? else {
                break;
            };
            pages += 1;
            sink(page)?;
        }
        debug!(
            driver = %self.ctx.id(),
            pages,
            outstanding_bytes = self.ctx.outstanding_bytes(),
            peak_bytes = self.ctx.block_factory().budget().peak(),
            warnings = self.ctx.warnings().total(),
            "driver finished"
        );
        Ok(pages)
    }

    /// Runs to completion, collecting every output page.
    ///
    /// The operator chain is dropped before returning, so the only buffers
    /// still charged to the context are those of the returned pages.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run). Pages collected before the error are
    /// released.
    pub fn collect(mut self) -> Result<DriverOutput> {
        let mut pages = Vec::new();
        self.run(|page| {
            pages.push(page);
            Ok(())
        })?;
        let Driver { ctx, root, .. } = self;
        drop(root);
        let positions = pages.iter().map(Page::position_count).sum();
        Ok(DriverOutput {
            pages,
            positions,
            warnings: ctx.warnings().messages(),
            context: ctx,
        })
    }
}
