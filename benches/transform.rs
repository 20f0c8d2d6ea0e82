//! In-place addition over contiguous, transposed and broadcast operands.
//!
//! Run with: cargo bench --bench transform

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use scivar::{histogram, make_bins, plus_equals, BinRange, DataArray, Dim, Dimensions, Unit, Variable};
use std::time::Duration;

fn random(rng: &mut StdRng, dims: Dimensions, variances: bool) -> Variable {
    let n = dims.volume();
    let values: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    if variances {
        let vars: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        Variable::with_variances(dims, Unit::counts(), values, vars).unwrap()
    } else {
        Variable::new(dims, Unit::counts(), values).unwrap()
    }
}

fn bench_plus_equals(c: &mut Criterion) {
    let mut group = c.benchmark_group("plus_equals");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for size in [256, 1024] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let mut rng = StdRng::seed_from_u64(42);
        let dims = Dimensions::new(&[(Dim::Y, size), (Dim::X, size)]).unwrap();
        let a = random(&mut rng, dims, true);
        let b = random(&mut rng, dims, true);
        let b_t = b
            .transpose(&[Dim::X, Dim::Y])
            .unwrap()
            .copy()
            .unwrap();
        let row = random(&mut rng, Dimensions::single(Dim::X, size).unwrap(), true);

        group.bench_with_input(BenchmarkId::new("contiguous", size), &size, |bench, _| {
            let mut out = a.copy().unwrap();
            bench.iter(|| plus_equals(&mut out, &b).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("transposed", size), &size, |bench, _| {
            let mut out = a.copy().unwrap();
            bench.iter(|| plus_equals(&mut out, &b_t).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("broadcast", size), &size, |bench, _| {
            let mut out = a.copy().unwrap();
            bench.iter(|| plus_equals(&mut out, &row).unwrap());
        });
    }
    group.finish();
}

fn bench_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");
    group.sample_size(10);

    let ncell = 1000;
    let per_cell = 1000;
    let mut rng = StdRng::seed_from_u64(7);
    let nevent = ncell * per_cell;
    let events = Dimensions::single(Dim::Event, nevent).unwrap();
    let tof: Vec<f64> = (0..nevent).map(|_| rng.gen_range(0.0..100.0)).collect();
    let buffer = DataArray::new(Variable::new(events, Unit::counts(), vec![1.0; nevent]).unwrap())
        .with_coord(Dim::Tof, Variable::new(events, Unit::us(), tof).unwrap())
        .unwrap();
    let ranges: Vec<BinRange> = (0..ncell)
        .map(|i| BinRange::new(i * per_cell, (i + 1) * per_cell))
        .collect();
    let indices = Variable::new(
        Dimensions::single(Dim::Spectrum, ncell).unwrap(),
        Unit::dimensionless(),
        ranges,
    )
    .unwrap();
    let binned = make_bins(&indices, Dim::Event, buffer).unwrap();
    let edges: Vec<f64> = (0..=100).map(f64::from).collect();
    let edges = Variable::new(Dimensions::single(Dim::Tof, 101).unwrap(), Unit::us(), edges).unwrap();

    group.throughput(Throughput::Elements(nevent as u64));
    group.bench_function("events_1m", |bench| {
        bench.iter(|| histogram(&binned, &edges).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_plus_equals, bench_histogram);
criterion_main!(benches);
