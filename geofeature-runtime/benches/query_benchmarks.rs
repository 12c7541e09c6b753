//! Criterion benchmarks for the runtime data store.
//!
//! Measures insertion and query time across store sizes (1k, 10k, 50k
//! features) for the main query shapes: spatial regions, exact names,
//! wildcard names and visible-only scans.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package geofeature-runtime
//! ```

// Criterion macros generate code that triggers missing_docs warnings.
#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geofeature_core::{Envelope, FeatureDataStore, FeatureQueryParameters, SpatialFilter};


use bench_support::{BENCHMARK_SEED, cluster_centres, clustered_store};

/// Store sizes to benchmark.
const STORE_SIZES: &[usize] = &[1_000, 10_000, 50_000];

/// Half-width of the query region around a cluster centre, in degrees.
const REGION_HALF_WIDTH: f64 = 0.05;

fn query_shapes() -> Vec<(&'static str, FeatureQueryParameters)> {
    let centre = cluster_centres(BENCHMARK_SEED)
        .first()
        .copied()
        .unwrap_or(geo::Coord { x: 0.5, y: 0.5 });
    #[expect(clippy::float_arithmetic, reason = "Required for region bounds")]
    let region = Envelope::from_bounds(
        centre.x - REGION_HALF_WIDTH,
        centre.y - REGION_HALF_WIDTH,
        centre.x + REGION_HALF_WIDTH,
        centre.y + REGION_HALF_WIDTH,
    );
    vec![
        (
            "region",
            FeatureQueryParameters::new().with_spatial_filter(SpatialFilter::Region(region)),
        ),
        ("exact_name", FeatureQueryParameters::new().with_names(["pier"])),
        ("wildcard_name", FeatureQueryParameters::new().with_names(["harb%"])),
        ("visible_only", FeatureQueryParameters::new().visible_only()),
    ]
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    for &size in STORE_SIZES {
        let Ok(store) = clustered_store(size, BENCHMARK_SEED) else {
            continue;
        };
        #[expect(clippy::as_conversions, reason = "Store sizes fit in u64")]
        let throughput_size = size as u64;
        group.throughput(Throughput::Elements(throughput_size));
        for (label, params) in query_shapes() {
            group.bench_with_input(BenchmarkId::new(label, size), &params, |b, params| {
                b.iter(|| store.query_features(params).map(Iterator::count));
            });
        }
    }
    group.finish();
}

fn bench_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(10);
    for &size in STORE_SIZES {
        #[expect(clippy::as_conversions, reason = "Store sizes fit in u64")]
        let throughput_size = size as u64;
        group.throughput(Throughput::Elements(throughput_size));
        group.bench_with_input(BenchmarkId::new("clustered", size), &size, |b, &count| {
            b.iter(|| clustered_store(count, BENCHMARK_SEED).map(|store| store.is_available()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries, bench_inserts);
criterion_main!(benches);
