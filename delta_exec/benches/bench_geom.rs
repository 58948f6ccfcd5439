//! # Geometric Model Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use delta_lib::geom::{CachedGeometry, CartesianPoint, DeltaGeometry};

fn geom_benchmark(c: &mut Criterion) {
    let geom = DeltaGeometry::default();

    // Points across the working plane, as played back from a path
    let points: Vec<CartesianPoint> = (0..100)
        .map(|i| {
            let t = i as f64 * std::f64::consts::PI / 50.0;
            CartesianPoint::new(0.04 * t.cos(), 0.04 * t.sin(), -0.13)
        })
        .collect();

    let angles: Vec<_> = points.iter().filter_map(|p| geom.inverse(p).ok()).collect();

    c.bench_function("DeltaGeometry::inverse", |b| {
        b.iter(|| {
            for p in points.iter() {
                black_box(geom.inverse(p).ok());
            }
        })
    });

    c.bench_function("DeltaGeometry::direct", |b| {
        b.iter(|| {
            for a in angles.iter() {
                black_box(geom.direct(a).ok());
            }
        })
    });

    // Every point is cached after the first iteration
    let mut cached = CachedGeometry::new(geom);
    c.bench_function("CachedGeometry::inverse", |b| {
        b.iter(|| {
            for p in points.iter() {
                black_box(cached.inverse(p).ok());
            }
        })
    });
}

criterion_group!(benches, geom_benchmark);
criterion_main!(benches);
