//! Run with:
//! ```bash
//! RUSTFLAGS="-C target-cpu=native" cargo bench --bench benchmark
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ivfdb::distance::{ip_distance, l2_distance};
use ivfdb::{Engine, EngineConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// OpenAI text-embedding-ada-002 / text-embedding-3-small output dimension.
const DIM: usize = 1536;
/// Number of vectors in the index for the main benchmarks.
const N_VECS: usize = 10_000;
/// Inverted lists trained for the main benchmarks.
const N_LISTS: usize = 100;
/// Neighbors requested per query.
const K: usize = 10;
/// Fixed RNG seed for reproducible benchmarks.
const SEED: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Generate `n` random f32 vectors of dimension `dim`.
/// Using a seeded RNG ensures the benchmark data is identical across runs,
/// making benchmark comparisons statistically valid.
fn generate_random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect())
        .collect()
}

/// Build an `Engine` pre-loaded with `n_vecs` random vectors of `dim` and an
/// IVF index trained over `n_lists` centroids.
fn build_engine(n_vecs: usize, dim: usize, n_lists: usize) -> Engine {
    let engine = Engine::open(EngineConfig::new(dim)).expect("engine open");
    let vecs = generate_random_vectors(n_vecs, dim, SEED);
    for v in &vecs {
        engine.add(v).expect("add");
    }
    engine.build(n_lists).expect("build");
    engine
}

/// Measures the end-to-end probe-and-refine `search()`: coarse centroid
/// ranking, bucket scan via the hand-unrolled `get_unchecked` distance
/// kernel, then the ascending-sort refine stage.
///
/// `black_box()` prevents the compiler from:
///   1. Hoisting the entire benchmark out of the loop (since it has no side effects).
///   2. Constant-folding the result away.
///   3. Reordering memory loads speculatively across benchmark iterations.
fn bench_search_ivf(c: &mut Criterion) {
    let engine = build_engine(N_VECS, DIM, N_LISTS);
    let query = generate_random_vectors(1, DIM, SEED + 1).remove(0);

    let mut group = c.benchmark_group("search_ivf");
    group.throughput(Throughput::Elements(N_VECS as u64));

    group.bench_function(
        BenchmarkId::new("probe_and_refine", format!("{N_VECS}vecs_dim{DIM}_lists{N_LISTS}")),
        |b| {
            b.iter(|| {
                black_box(
                    engine
                        .search(black_box(&query), black_box(K), 0.1, 8, 4)
                        .unwrap(),
                )
            })
        },
    );

    group.finish();
}

/// The brute-force baseline: a single inverted list covering the entire
/// dataset, so `search` degenerates into a linear scan. Compare against
/// `bench_search_ivf` to quantify the speedup from bucket pruning.
fn bench_search_brute_force(c: &mut Criterion) {
    let engine = build_engine(N_VECS, DIM, 1);
    let query = generate_random_vectors(1, DIM, SEED + 1).remove(0);

    let mut group = c.benchmark_group("search_brute_force");
    group.throughput(Throughput::Elements(N_VECS as u64));

    group.bench_function(
        BenchmarkId::new("single_list", format!("{N_VECS}vecs_dim{DIM}")),
        |b| {
            b.iter(|| {
                black_box(
                    engine
                        .search(black_box(&query), black_box(K), 1.0, 1, 4)
                        .unwrap(),
                )
            })
        },
    );

    group.finish();
}

/// Measures the raw squared-L2 kernel in isolation, without any IVF
/// bookkeeping around it — the lower bound every search path pays for.
fn bench_l2_kernel(c: &mut Criterion) {
    let a = generate_random_vectors(1, DIM, SEED).remove(0);
    let b_vec = generate_random_vectors(1, DIM, SEED + 2).remove(0);

    let mut group = c.benchmark_group("distance_kernel");
    group.throughput(Throughput::Elements(DIM as u64));
    group.bench_function(BenchmarkId::new("l2_distance", DIM), |bencher| {
        bencher.iter(|| black_box(l2_distance(black_box(&a), black_box(&b_vec)).unwrap()))
    });
    group.bench_function(BenchmarkId::new("ip_distance", DIM), |bencher| {
        bencher.iter(|| black_box(ip_distance(black_box(&a), black_box(&b_vec)).unwrap()))
    });
    group.finish();
}

/// Measures how search latency scales from 100 to 10,000 vectors with a
/// fixed, proportionally-sized number of inverted lists (`n_lists = n/100`,
/// floored at 1).
/// Expected: roughly constant per-query latency once `n_lists` scales with
/// `n`, since each query only scans a near-constant-size slice of buckets.
fn bench_scaling(c: &mut Criterion) {
    let query = generate_random_vectors(1, DIM, SEED + 99).remove(0);

    let mut group = c.benchmark_group("scaling_by_n_vecs");
    for n in [100usize, 500, 1_000, 5_000, 10_000] {
        let n_lists = (n / 100).max(1);
        let engine = build_engine(n, DIM, n_lists);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _n| {
            b.iter(|| black_box(engine.search(black_box(&query), K, 0.1, 8, 4).unwrap()))
        });
    }
    group.finish();
}

/// Measures how fast vectors can be appended to an open engine (no WAL, no
/// index build). This bounds the ingestion rate for live-write workloads.
fn bench_add(c: &mut Criterion) {
    let vecs = generate_random_vectors(N_VECS, DIM, SEED);

    let mut group = c.benchmark_group("add_throughput");
    group.throughput(Throughput::Elements(1));

    group.bench_function("add_single_vector", |b| {
        b.iter_batched(
            || Engine::open(EngineConfig::new(DIM)).expect("engine open"),
            |engine| {
                engine.add(black_box(&vecs[0])).unwrap();
                engine
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_search_ivf,
    bench_search_brute_force,
    bench_l2_kernel,
    bench_scaling,
    bench_add,
);
criterion_main!(benches);
