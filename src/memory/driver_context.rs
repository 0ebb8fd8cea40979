//! Per-driver execution context.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::{DriverConfig, ValueErrorPolicy};
use crate::memory::block_factory::BlockFactory;
use crate::memory::budget::MemoryBudget;
use crate::memory::warnings::Warnings;

struct ContextInner {
    id: Uuid,
    block_factory: BlockFactory,
    warnings: Warnings,
    value_error_policy: ValueErrorPolicy,
}

/// Everything an evaluator needs from its driver: a block factory bound to
/// the driver's budget, the warning sink and the value-error policy.
///
/// Cloning shares the context. One context belongs to one driver; evaluators
/// created from it must not be used from another driver.
#[derive(Clone)]
pub struct DriverContext {
    inner: Arc<ContextInner>,
}

impl DriverContext {
    /// Creates a context with a root budget sized by `config.memory_limit`.
    #[must_use]
    pub fn new(config: &DriverConfig) -> Self {
        let id = Uuid::new_v4();
        let budget = MemoryBudget::new(format!("driver-{id}"), config.memory_limit);
        Self::build(id, budget, config)
    }

    /// Creates a context whose budget is a child of `parent`, so several
    /// drivers can share one node-wide limit.
    #[must_use]
    pub fn with_parent_budget(parent: &Arc<MemoryBudget>, config: &DriverConfig) -> Self {
        let id = Uuid::new_v4();
        let budget = parent.child(format!("driver-{id}"), config.memory_limit);
        Self::build(id, budget, config)
    }

    /// Creates a context over an existing budget.
    #[must_use]
    pub fn with_budget(budget: Arc<MemoryBudget>, config: &DriverConfig) -> Self {
        Self::build(Uuid::new_v4(), budget, config)
    }

    fn build(id: Uuid, budget: Arc<MemoryBudget>, config: &DriverConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                block_factory: BlockFactory::new(budget),
                warnings: Warnings::new(config.max_warnings),
                value_error_policy: config.value_error_policy,
            }),
        }
    }

    /// Unique id of this context.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The block factory every allocation goes through.
    #[must_use]
    pub fn block_factory(&self) -> &BlockFactory {
        &self.inner.block_factory
    }

    /// Warnings recorded by evaluators in this context.
    #[must_use]
    pub fn warnings(&self) -> &Warnings {
        &self.inner.warnings
    }

    /// The default policy for position-local failures.
    #[must_use]
    pub fn value_error_policy(&self) -> ValueErrorPolicy {
        self.inner.value_error_policy
    }

    /// Bytes currently reserved by blocks and builders of this context.
    #[must_use]
    pub fn outstanding_bytes(&self) -> usize {
        self.inner.block_factory.budget().used()
    }
}

impl fmt::Debug for DriverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverContext")
            .field("id", &self.inner.id)
            .field("budget", self.inner.block_factory.budget())
            .field("value_error_policy", &self.inner.value_error_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_budget_from_config() {
        let ctx = DriverContext::new(&DriverConfig::new().with_memory_limit(Some(1024)));
        assert_eq!(ctx.block_factory().budget().limit(), Some(1024));
        assert_eq!(ctx.outstanding_bytes(), 0);
        let block = ctx.block_factory().new_constant_null_block(4).unwrap();
        assert!(ctx.outstanding_bytes() > 0);
        drop(block);
        assert_eq!(ctx.outstanding_bytes(), 0);
    }

    #[test]
    fn test_contexts_share_parent_budget() {
        let node = MemoryBudget::new("node", Some(100));
        let config = DriverConfig::new();
        let a = DriverContext::with_parent_budget(&node, &config);
        let b = DriverContext::with_parent_budget(&node, &config);
        assert_ne!(a.id(), b.id());
        let _held = a.block_factory().new_constant_null_block(1).unwrap();
        assert!(b.block_factory().reserve(80, "x").is_err());
    }
}
