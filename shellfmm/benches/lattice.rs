use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use shellfmm::tree::helpers::{charges_fixture, points_fixture};
use shellfmm::{
    FmmParameters, Lattice, LatticeSum, MlmStrategy, PeriodicFmmBuilder, PeriodicParameters,
    PointCharge, PointNearField, SquareMatrix,
};

fn lattice_sums(c: &mut Criterion) {
    let bases = [
        ("1D", vec![[0., 0., 4.]]),
        ("2D", vec![[4., 0., 0.], [1., 4., 0.]]),
        ("3D", vec![[4., 0., 0.], [0., 4., 0.], [0., 0., 4.]]),
    ];

    let mut group = c.benchmark_group("Lattice sums");
    group
        .sample_size(10)
        .measurement_time(Duration::from_secs(10));

    for (name, basis) in bases.iter() {
        let lattice = Lattice::new(basis).unwrap();
        let beta = std::f64::consts::PI.sqrt() / 4.;
        for strategy in [MlmStrategy::Ewald, MlmStrategy::Direct] {
            group.bench_function(format!("{name}, {strategy:?}, order=20"), |b| {
                b.iter(|| LatticeSum::new(&lattice, 20, 1, strategy, beta, 5).unwrap())
            });
        }
    }
}

fn periodic_cell(c: &mut Criterion) {
    // Neutral cell of random charges
    let n = 200;
    let positions = points_fixture(n, Some(-2.), Some(2.), Some(0));
    let mut charges = charges_fixture(n, -1., 1., Some(1));
    let mean = charges.iter().sum::<f64>() / n as f64;
    charges.iter_mut().for_each(|q| *q -= mean);

    let distributions: Vec<PointCharge> = positions
        .iter()
        .zip(charges.iter())
        .enumerate()
        .map(|(i, (&x, &q))| PointCharge::new(q, x, i))
        .collect();

    let mut fmm = PeriodicFmmBuilder::new()
        .cell(|builder| {
            Ok(builder
                .charge_distributions(distributions)?
                .parameters(FmmParameters {
                    lmax: 8,
                    ns: 3,
                    ..Default::default()
                })?
                .near_field(PointNearField)
                .density(SquareMatrix::identity(n))?)
        })
        .unwrap()
        .lattice(&[[6., 0., 0.], [0., 6., 0.], [0., 0., 6.]])
        .unwrap()
        .parameters(PeriodicParameters {
            validate_lattice_sum: false,
            ..Default::default()
        })
        .unwrap()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("Periodic cell");
    group
        .sample_size(10)
        .measurement_time(Duration::from_secs(15));

    group.bench_function(format!("3D, lmax=8, N={n}"), |b| {
        b.iter(|| fmm.evaluate().unwrap())
    });
}

criterion_group!(lattice, lattice_sums, periodic_cell);
criterion_main!(lattice);
