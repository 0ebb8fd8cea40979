//! Evaluation throughput benchmarks.
//!
//! Compares the dense vector loop with the null-aware block loop for the
//! same operators, and measures a full filter/eval pipeline.
//!
//! ```bash
//! cargo bench --bench eval_benchmark
//! ```

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use colexec::data::{Block, Page};
use colexec::evaluator::{
    ArithmeticOp, BinaryEvaluator, ChannelFactory, ComparisonOp, EvaluatorFactory,
    ExpressionEvaluator, LessThanLongs,
};
use colexec::executor::{CancellationToken, Driver, PageSource, PipelineFactory};
use colexec::memory::DriverContext;
use colexec::types::{DataType, ElementType, Value};
use colexec::{DriverConfig, Expression};

const SIZES: [usize; 3] = [1_024, 8_192, 65_536];

fn dense_longs(ctx: &DriverContext, rng: &mut StdRng, n: usize) -> Block {
    let values: Vec<i64> = (0..n).map(|_| rng.gen_range(-1_000_000..1_000_000)).collect();
    ctx.block_factory()
        .new_array_vector(values)
        .expect("vector")
        .into_block()
        .into()
}

/// Same distribution with roughly one null in ten positions.
fn sparse_longs(ctx: &DriverContext, rng: &mut StdRng, n: usize) -> Block {
    let mut builder = ctx.block_factory().new_long_block_builder(n).expect("builder");
    for _ in 0..n {
        if rng.gen_bool(0.1) {
            builder.append_null();
        } else {
            builder.append_value(rng.gen_range(-1_000_000..1_000_000));
        }
    }
    builder.build().expect("block").into()
}

fn less_than(ctx: &DriverContext) -> BinaryEvaluator<LessThanLongs> {
    BinaryEvaluator::new(
        ChannelFactory::new(0, ElementType::Long).get(ctx),
        ChannelFactory::new(1, ElementType::Long).get(ctx),
        ctx,
        None,
    )
}

fn bench_comparison_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("less_than_longs");
    let ctx = DriverContext::new(&DriverConfig::default());
    let mut rng = StdRng::seed_from_u64(42);

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let dense = Page::new(vec![
            dense_longs(&ctx, &mut rng, size),
            dense_longs(&ctx, &mut rng, size),
        ])
        .expect("page");
        let sparse = Page::new(vec![
            sparse_longs(&ctx, &mut rng, size),
            sparse_longs(&ctx, &mut rng, size),
        ])
        .expect("page");

        let mut evaluator = less_than(&ctx);
        group.bench_with_input(BenchmarkId::new("vector", size), &dense, |b, page| {
            b.iter(|| black_box(evaluator.eval(page).expect("eval")));
        });
        group.bench_with_input(BenchmarkId::new("block", size), &sparse, |b, page| {
            b.iter(|| black_box(evaluator.eval(page).expect("eval")));
        });
    }
    group.finish();
}

fn bench_expression_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_tree");
    let ctx = DriverContext::new(&DriverConfig::default());
    let mut rng = StdRng::seed_from_u64(7);

    // (a + b) * 2 > a
    let expr = Expression::comparison(
        Expression::arithmetic(
            Expression::arithmetic(
                Expression::column(0, DataType::Long),
                ArithmeticOp::Add,
                Expression::column(1, DataType::Long),
            ),
            ArithmeticOp::Mul,
            Expression::literal(Value::Long(2)),
        ),
        ComparisonOp::Gt,
        Expression::column(0, DataType::Long),
    );
    let factory = expr.to_factory().expect("factory");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let page = Page::new(vec![
            dense_longs(&ctx, &mut rng, size),
            dense_longs(&ctx, &mut rng, size),
        ])
        .expect("page");
        let mut evaluator = factory.get(&ctx);
        group.bench_with_input(BenchmarkId::from_parameter(size), &page, |b, page| {
            b.iter(|| black_box(evaluator.eval(page).expect("eval")));
        });
    }
    group.finish();
}

fn bench_filter_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_pipeline");
    group.sample_size(20);
    let mut rng = StdRng::seed_from_u64(11);
    let setup = DriverContext::new(&DriverConfig::default());
    let pages: Vec<Page> = (0..32)
        .map(|_| {
            Page::new(vec![
                sparse_longs(&setup, &mut rng, 2_048),
                dense_longs(&setup, &mut rng, 2_048),
            ])
            .expect("page")
        })
        .collect();

    let predicate = Expression::comparison(
        Expression::column(0, DataType::Long),
        ComparisonOp::Lt,
        Expression::column(1, DataType::Long),
    )
    .to_factory()
    .expect("factory");
    let pipeline = PipelineFactory::new().filter(Arc::clone(&predicate)).project(vec![1]);

    group.throughput(Throughput::Elements(32 * 2_048));
    group.bench_function("32x2048", |b| {
        b.iter(|| {
            let ctx = DriverContext::new(&DriverConfig::default());
            let root = pipeline.build(Box::new(PageSource::new(pages.clone())), &ctx);
            let output = Driver::new(ctx, root, CancellationToken::new())
                .collect()
                .expect("run");
            black_box(output.positions)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_comparison_paths,
    bench_expression_tree,
    bench_filter_pipeline
);
criterion_main!(benches);
