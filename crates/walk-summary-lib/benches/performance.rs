//! Performance benchmarks for walk-summary-lib
//!
//! Run with: cargo bench --package walk-summary-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gpx::{Gpx, Track as GpxTrack, TrackSegment, Waypoint};
use walk_summary_lib::test_support::TempDirGuard;
use walk_summary_lib::{
    ArtifactStore, CompilerConfig, ElevationLookup, GeoPoint, Track, WalkCompiler, polyline,
    profile, simplify,
};

/// Generate a wiggly walk with the given number of points.
fn generate_points(num_points: usize, base_lat: f64, base_lon: f64) -> Vec<GeoPoint> {
    (0..num_points)
        .filter_map(|i| {
            let t = i as f64 / num_points as f64;
            let lat = base_lat + t * 0.1 + (t * 50.0).sin() * 0.001;
            let lon = base_lon + t * 0.1 + (t * 30.0).cos() * 0.001;
            let elevation = 100.0 + (t * 20.0).sin() * 50.0;
            GeoPoint::with_elevation_m(lat, lon, elevation).ok()
        })
        .collect()
}

fn generate_gpx(num_points: usize) -> Gpx {
    let mut gpx = Gpx::default();
    gpx.version = gpx::GpxVersion::Gpx11;
    let mut segment = TrackSegment::default();
    for point in generate_points(num_points, 51.5, -0.1) {
        segment.points.push(Waypoint::new(geo::Point::new(
            point.longitude(),
            point.latitude(),
        )));
    }
    let mut track = GpxTrack::default();
    track.segments.push(segment);
    gpx.tracks.push(track);
    gpx
}

/// Smooth synthetic terrain, so that lookups cost about as much as a cached tile read
struct Terrain;

impl ElevationLookup for Terrain {
    fn elevation_at(&self, latitude: f64, longitude: f64) -> walk_summary_lib::Result<Option<f64>> {
        Ok(Some((latitude * 100.0).sin() * 200.0 + (longitude * 80.0).cos() * 150.0))
    }
}

// ============================================================================
// Core Benchmarks
// ============================================================================

fn bench_polyline(c: &mut Criterion) {
    let mut group = c.benchmark_group("polyline");

    let points: Vec<[f64; 2]> = generate_points(50_000, 51.5, -0.1)
        .iter()
        .map(|p| [p.latitude(), p.longitude()])
        .collect();
    let encoded = polyline::encode(&points);

    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("encode_50k", |b| b.iter(|| polyline::encode(&points)));
    group.bench_function("decode_50k", |b| {
        b.iter(|| polyline::decode::<2>(&encoded).unwrap())
    });

    group.finish();
}

fn bench_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify");

    let points = generate_points(50_000, 51.5, -0.1);
    group.throughput(Throughput::Elements(points.len() as u64));
    for tolerance in [1.0, 5.0, 25.0] {
        group.bench_with_input(
            BenchmarkId::new("50k", tolerance),
            &tolerance,
            |b, &tolerance| b.iter(|| simplify::simplify(&points, tolerance)),
        );
    }

    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    let track = Track::new(generate_points(50_000, 51.5, -0.1)).unwrap();
    let length = track.length_m();
    group.throughput(Throughput::Elements(track.len() as u64));
    group.bench_function("50k_to_100", |b| {
        b.iter(|| profile::resample(track.points(), length, 100).unwrap())
    });

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.sample_size(20);

    let dir = TempDirGuard::new("bench").unwrap();
    let store = ArtifactStore::create(dir.path.join("gpx"), dir.path.join("generated")).unwrap();
    let compiler = WalkCompiler::new(CompilerConfig::default(), store, &Terrain);
    let gpx = generate_gpx(10_000);

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("in_memory_10k", |b| {
        b.iter(|| compiler.compile_gpx(&gpx).unwrap())
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_polyline,
    bench_simplify,
    bench_resample,
    bench_compile,
);

criterion_main!(benches);
