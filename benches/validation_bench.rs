//! Criterion benchmarks for route validation and snapping.
//!
//! Benchmarks:
//!   - validate_route:   one long route against the bundled Spanish zones
//!   - validate_many:    a batch of candidates validated in parallel
//!   - point_in_polygon: single containment query on a city zone
//!   - snap:             projecting a fix onto a 500-vertex route
//!
//! Run with: cargo bench --bench validation_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::Path;

use zone_nav::core::types::{GeoPoint, VehicleClass};
use zone_nav::geometry;
use zone_nav::routing::{RouteGeometry, RouteValidator};
use zone_nav::zones::ZoneRegistry;

fn zones() -> ZoneRegistry {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/zones.toml");
    ZoneRegistry::load(&path).expect("bundled zone data")
}

/// A wavy west->east route across central Madrid with `n` vertices
fn madrid_route(n: usize) -> RouteGeometry {
    let points = (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            GeoPoint::new(-3.80 + 0.2 * t, 40.42 + 0.01 * (t * 40.0).sin())
        })
        .collect();
    RouteGeometry::new(points).expect("valid route")
}

// ---------------------------------------------------------------------------
// Benchmark: validation of a single route
// ---------------------------------------------------------------------------

fn bench_validate_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_route");
    let validator = RouteValidator::new(zones());
    let class = VehicleClass::new("B");
    let today = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");

    for vertices in [50, 500, 5_000] {
        let route = madrid_route(vertices);
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &route, |b, route| {
            b.iter(|| black_box(validator.validate(black_box(route), &class, &[], today)));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: parallel validation of alternatives
// ---------------------------------------------------------------------------

fn bench_validate_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_many");
    group.sample_size(50);

    let validator = RouteValidator::new(zones());
    let class = VehicleClass::new("B");
    let today = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
    let routes: Vec<RouteGeometry> = (0..16).map(|i| madrid_route(500 + i * 10)).collect();

    group.bench_function("16_routes_500_vertices", |b| {
        b.iter(|| black_box(validator.validate_many(black_box(&routes), &class, &[], today)));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: containment and snapping primitives
// ---------------------------------------------------------------------------

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");
    group.sample_size(500);

    let registry = zones();
    let ring = registry.zones()[0].boundary();
    let sol = GeoPoint::new(-3.7038, 40.4168);
    group.bench_function("point_in_polygon", |b| {
        b.iter(|| black_box(geometry::point_in_polygon(black_box(sol), ring)));
    });

    let route = madrid_route(500);
    group.bench_function("snap_500_vertices", |b| {
        b.iter(|| black_box(route.snap(black_box(sol))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_validate_route,
    bench_validate_many,
    bench_primitives
);
criterion_main!(benches);
