use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use shellfmm::traits::fmm::Evaluate;
use shellfmm::tree::helpers::{charges_fixture, points_fixture};
use shellfmm::{
    FmmBuilder, FmmParameters, GaussianCharge, GaussianNearField, PointCharge, PointNearField,
    SquareMatrix,
};

fn point_charges(c: &mut Criterion) {
    // Setup random charges
    let n = 2000;
    let positions = points_fixture(n, Some(-5.), Some(5.), Some(0));
    let charges = charges_fixture(n, -1., 1., Some(1));
    let distributions: Vec<PointCharge> = positions
        .iter()
        .zip(charges.iter())
        .enumerate()
        .map(|(i, (&x, &q))| PointCharge::new(q, x, i))
        .collect();

    let mut group = c.benchmark_group("Point charges");
    group
        .sample_size(10)
        .measurement_time(Duration::from_secs(15));

    for lmax in [6, 10] {
        let mut fmm = FmmBuilder::new()
            .charge_distributions(distributions.clone())
            .unwrap()
            .parameters(FmmParameters {
                lmax,
                ns: 4,
                ..Default::default()
            })
            .unwrap()
            .near_field(PointNearField)
            .density(SquareMatrix::identity(n))
            .unwrap()
            .build()
            .unwrap();

        group.bench_function(format!("lmax={lmax}, N={n}"), |b| {
            b.iter(|| fmm.evaluate().unwrap())
        });
    }
}

fn gaussian_charges(c: &mut Criterion) {
    // Diffuse and compact Gaussians
    let n = 1000;
    let positions = points_fixture(n, Some(-4.), Some(4.), Some(2));
    let exponents = charges_fixture(n, 0.5, 20., Some(3));
    let distributions: Vec<GaussianCharge> = positions
        .iter()
        .zip(exponents.iter())
        .enumerate()
        .map(|(i, (&x, &alpha))| GaussianCharge::new(1., alpha, x, i))
        .collect();

    let mut fmm = FmmBuilder::new()
        .charge_distributions(distributions)
        .unwrap()
        .parameters(FmmParameters {
            lmax: 8,
            ns: 3,
            ..Default::default()
        })
        .unwrap()
        .near_field(GaussianNearField)
        .density(SquareMatrix::identity(n))
        .unwrap()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("Gaussian charges");
    group
        .sample_size(10)
        .measurement_time(Duration::from_secs(15));

    group.bench_function(format!("lmax=8, N={n}"), |b| {
        b.iter(|| fmm.evaluate().unwrap())
    });
}

criterion_group!(molecular, point_charges, gaussian_charges);
criterion_main!(molecular);
