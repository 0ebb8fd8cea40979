//! Contract tests for the evaluator API (Factory.get / Evaluator.eval) and
//! memory accounting.

use std::sync::Arc;

use colexec::data::{Block, Page};
use colexec::evaluator::{
    AddLongs, BinaryFactory, ChannelFactory, EqualsKeywords, EvaluatorFactory, LessThanLongs,
    LiteralFactory, SharedFactory, ToLongFromString, UnaryFactory,
};
use colexec::memory::DriverContext;
use colexec::types::{ElementType, Value};
use colexec::{ColexecError, DriverConfig, ValueErrorPolicy};

fn context() -> DriverContext {
    DriverContext::new(&DriverConfig::default())
}

/// Builds a keyword block; `None` is a null position.
fn keywords(ctx: &DriverContext, values: &[Option<&str>]) -> Block {
    let mut builder = ctx
        .block_factory()
        .new_bytes_ref_block_builder(values.len())
        .expect("reserve builder");
    for value in values {
        match value {
            Some(v) => builder.append_value(v.as_bytes()),
            None => builder.append_null(),
        };
    }
    builder.build().expect("build block").into()
}

fn keyword_equals() -> SharedFactory {
    Arc::new(BinaryFactory::<EqualsKeywords>::new(
        Arc::new(ChannelFactory::new(0, ElementType::BytesRef)),
        Arc::new(ChannelFactory::new(1, ElementType::BytesRef)),
    ))
}

fn values(block: &Block) -> Vec<Value> {
    (0..block.position_count()).map(|p| block.value(p)).collect()
}

// =============================================================================
// Evaluation Scenarios
// =============================================================================

mod evaluation_contracts {
    use super::*;

    // Contract: two dense keyword columns compared for equality yield a dense
    // boolean vector.
    #[test]
    fn test_keyword_equality_dense() {
        let ctx = context();
        let page = Page::new(vec![
            keywords(&ctx, &[Some("abc"), Some("xyz")]),
            keywords(&ctx, &[Some("abc"), Some("abd")]),
        ])
        .unwrap();

        let result = keyword_equals().get(&ctx).eval(&page).unwrap();

        assert_eq!(result.position_count(), 2);
        assert!(result.is_dense());
        assert_eq!(values(&result), vec![Value::Boolean(true), Value::Boolean(false)]);
    }

    // Contract: a null operand position yields a null result position.
    #[test]
    fn test_null_operand_yields_null() {
        let ctx = context();
        let page = Page::new(vec![
            keywords(&ctx, &[None, Some("x")]),
            keywords(&ctx, &[Some("y"), Some("x")]),
        ])
        .unwrap();

        let result = keyword_equals().get(&ctx).eval(&page).unwrap();

        assert!(result.is_null(0));
        assert_eq!(values(&result), vec![Value::Null, Value::Boolean(true)]);
    }

    // Contract: a multi-valued operand position yields null regardless of the
    // other operand.
    #[test]
    fn test_multi_valued_operand_yields_null() {
        let ctx = context();
        let mut builder = ctx.block_factory().new_long_block_builder(2).unwrap();
        builder
            .begin_position_entry()
            .append_value(1)
            .append_value(2)
            .end_position_entry();
        builder.append_value(3);
        let lhs: Block = builder.build().unwrap().into();
        let rhs: Block = ctx
            .block_factory()
            .new_array_vector(vec![100_i64, 100])
            .unwrap()
            .into_block()
            .into();
        let page = Page::new(vec![lhs, rhs]).unwrap();

        let factory: SharedFactory = Arc::new(BinaryFactory::<LessThanLongs>::new(
            Arc::new(ChannelFactory::new(0, ElementType::Long)),
            Arc::new(ChannelFactory::new(1, ElementType::Long)),
        ));
        let result = factory.get(&ctx).eval(&page).unwrap();

        assert!(result.is_null(0));
        assert_eq!(result.value(1), Value::Boolean(true));
    }

    // Contract: the result always has the page's position count, including
    // for zero-position pages.
    #[test]
    fn test_empty_page() {
        let ctx = context();
        let page = Page::new(vec![keywords(&ctx, &[]), keywords(&ctx, &[])]).unwrap();
        let result = keyword_equals().get(&ctx).eval(&page).unwrap();
        assert_eq!(result.position_count(), 0);
    }

    // Contract: evaluation never modifies its input blocks.
    #[test]
    fn test_inputs_unchanged() {
        let ctx = context();
        let lhs = keywords(&ctx, &[Some("a"), None]);
        let page = Page::new(vec![lhs.clone(), keywords(&ctx, &[Some("a"), Some("b")])]).unwrap();
        let before = values(&lhs);
        keyword_equals().get(&ctx).eval(&page).unwrap();
        assert_eq!(values(page.block(0).unwrap()), before);
    }

    // Contract: a freshly built evaluator from the same factory produces the
    // same output for the same page.
    #[test]
    fn test_fresh_evaluator_is_idempotent() {
        let ctx = context();
        let page = Page::new(vec![
            keywords(&ctx, &[Some("a"), None, Some("c")]),
            keywords(&ctx, &[Some("a"), Some("b"), Some("d")]),
        ])
        .unwrap();
        let factory = keyword_equals();

        let first = factory.get(&ctx).eval(&page).unwrap();
        let second = factory.get(&ctx).eval(&page).unwrap();

        assert_eq!(values(&first), values(&second));
    }

    // Contract: an input block of the wrong element type fails fast.
    #[test]
    fn test_type_mismatch_fails_fast() {
        let ctx = context();
        let longs: Block = ctx
            .block_factory()
            .new_array_vector(vec![1_i64])
            .unwrap()
            .into_block()
            .into();
        let page = Page::new(vec![longs, keywords(&ctx, &[Some("a")])]).unwrap();
        let result = keyword_equals().get(&ctx).eval(&page);
        assert!(matches!(result, Err(ColexecError::TypeMismatch { .. })));
    }
}

// =============================================================================
// Memory Accounting Contracts
// =============================================================================

mod memory_contracts {
    use super::*;

    // Contract: with a zero budget the first allocation fails and nothing is
    // returned.
    #[test]
    fn test_zero_budget_fails_first_allocation() {
        let ctx = DriverContext::new(&DriverConfig::new().with_memory_limit(Some(0)));
        let page = Page::with_position_count(4, vec![]).unwrap();
        let mut evaluator = LiteralFactory::new(Value::Long(1)).get(&ctx);

        let result = evaluator.eval(&page);

        assert!(matches!(result, Err(ColexecError::BudgetExceeded { .. })));
        assert_eq!(ctx.outstanding_bytes(), 0);
    }

    // Contract: once the evaluator and all results are dropped, the context
    // has no outstanding bytes.
    #[test]
    fn test_accounting_returns_to_zero() {
        let ctx = context();
        {
            let page = Page::new(vec![
                keywords(&ctx, &[Some("abc"), Some("xyz"), None]),
                keywords(&ctx, &[Some("abc"), Some("abd"), Some("q")]),
            ])
            .unwrap();
            let mut evaluator = keyword_equals().get(&ctx);
            let result = evaluator.eval(&page).unwrap();
            assert!(ctx.outstanding_bytes() > 0);
            drop(result);
            drop(evaluator);
        }
        assert_eq!(ctx.outstanding_bytes(), 0);
    }

    // Contract: a budget failure in the middle of an evaluation releases
    // everything built by that call.
    #[test]
    fn test_budget_failure_releases_partial_results() {
        let config = DriverConfig::new().with_memory_limit(Some(0));
        let ctx = DriverContext::new(&config);
        let input = context();
        let page = Page::new(vec![
            keywords(&input, &[Some("a"), Some("b")]),
            keywords(&input, &[Some("a"), Some("c")]),
        ])
        .unwrap();

        let result = keyword_equals().get(&ctx).eval(&page);

        assert!(matches!(result, Err(ColexecError::BudgetExceeded { .. })));
        assert_eq!(ctx.outstanding_bytes(), 0);
    }

    // Contract: when an allocation fails after some children already produced
    // blocks, those blocks are released with the failed call.
    #[test]
    fn test_budget_failure_releases_evaluated_children() {
        let input = context();
        let page = Page::new(vec![input
            .block_factory()
            .new_array_vector((0..1_000_i64).collect())
            .unwrap()
            .into_block()
            .into()])
        .unwrap();
        // 1 + (channel0 + 2): the outer literal is built before the inner sum
        let factory: SharedFactory = Arc::new(BinaryFactory::<AddLongs>::new(
            Arc::new(LiteralFactory::new(Value::Long(1))),
            Arc::new(BinaryFactory::<AddLongs>::new(
                Arc::new(ChannelFactory::new(0, ElementType::Long)),
                Arc::new(LiteralFactory::new(Value::Long(2))),
            )),
        ));

        let mut failures = 0;
        let mut successes = 0;
        for limit in (0..120_000).step_by(256) {
            let ctx = DriverContext::new(&DriverConfig::new().with_memory_limit(Some(limit)));
            let mut evaluator = factory.get(&ctx);
            match evaluator.eval(&page) {
                Ok(result) => {
                    successes += 1;
                    assert_eq!(result.value(999), Value::Long(1_002));
                }
                Err(ColexecError::BudgetExceeded { .. }) => failures += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
            drop(evaluator);
            assert_eq!(ctx.outstanding_bytes(), 0, "leak at limit {limit}");
        }
        assert!(failures > 0);
        assert!(successes > 0);
    }

    // Contract: shared blocks are released only when the last holder drops.
    #[test]
    fn test_shared_block_released_after_last_reference() {
        let ctx = context();
        let block = keywords(&ctx, &[Some("a")]);
        let copy = block.clone();
        drop(block);
        assert!(ctx.outstanding_bytes() > 0);
        drop(copy);
        assert_eq!(ctx.outstanding_bytes(), 0);
    }
}

// =============================================================================
// Value Error Policy Contracts
// =============================================================================

mod value_error_contracts {
    use super::*;

    fn to_long(policy: Option<ValueErrorPolicy>) -> SharedFactory {
        let factory = UnaryFactory::<ToLongFromString>::new(Arc::new(ChannelFactory::new(
            0,
            ElementType::BytesRef,
        )));
        match policy {
            Some(policy) => Arc::new(factory.with_value_error_policy(policy)),
            None => Arc::new(factory),
        }
    }

    // Contract: by default a malformed value becomes null and is recorded as
    // a warning.
    #[test]
    fn test_default_policy_nulls_and_warns() {
        let ctx = context();
        let page = Page::new(vec![keywords(&ctx, &[Some("12"), Some("twelve")])]).unwrap();

        let result = to_long(None).get(&ctx).eval(&page).unwrap();

        assert_eq!(result.value(0), Value::Long(12));
        assert!(result.is_null(1));
        assert_eq!(ctx.warnings().total(), 1);
        assert!(ctx.warnings().messages()[0].contains("position 1"));
    }

    // Contract: under the strict policy the whole evaluation fails and no
    // buffers stay charged.
    #[test]
    fn test_fail_policy_aborts_evaluation() {
        let ctx = DriverContext::new(
            &DriverConfig::new().with_value_error_policy(ValueErrorPolicy::Fail),
        );
        let page = Page::new(vec![keywords(&ctx, &[Some("12"), Some("twelve")])]).unwrap();
        let baseline = ctx.outstanding_bytes();

        let result = to_long(None).get(&ctx).eval(&page);

        assert!(matches!(
            result,
            Err(ColexecError::InvalidValue { position: 1, .. })
        ));
        assert_eq!(ctx.outstanding_bytes(), baseline);
        assert_eq!(ctx.warnings().total(), 0);
    }

    // Contract: a factory-level policy overrides the context default.
    #[test]
    fn test_factory_policy_overrides_context() {
        let ctx = context();
        let page = Page::new(vec![keywords(&ctx, &[Some("x")])]).unwrap();
        let result = to_long(Some(ValueErrorPolicy::Fail)).get(&ctx).eval(&page);
        assert!(result.is_err());
    }
}
