//! Helper functions used in testing tree implementations, specifically test point generators.
use rand::prelude::*;

/// Points fixture for testing, uniformly samples in each axis from min to max.
///
/// # Arguments
/// * `n_points` - The number of points to sample.
/// * `min` - The minimum coordinate value along each axis, defaults to 0.
/// * `max` - The maximum coordinate value along each axis, defaults to 1.
/// * `seed` - Random seed, defaults to 0.
pub fn points_fixture(
    n_points: usize,
    min: Option<f64>,
    max: Option<f64>,
    seed: Option<u64>,
) -> Vec<[f64; 3]> {
    let seed = seed.unwrap_or(0);
    let mut range = StdRng::seed_from_u64(seed);

    let between = if let (Some(min), Some(max)) = (min, max) {
        rand::distributions::Uniform::from(min..max)
    } else {
        rand::distributions::Uniform::from(0.0..1.0)
    };

    (0..n_points)
        .map(|_| {
            [
                between.sample(&mut range),
                between.sample(&mut range),
                between.sample(&mut range),
            ]
        })
        .collect()
}

/// Charges fixture for testing, uniformly samples in `[min, max)`.
pub fn charges_fixture(n_points: usize, min: f64, max: f64, seed: Option<u64>) -> Vec<f64> {
    let mut range = StdRng::seed_from_u64(seed.unwrap_or(1));
    let between = rand::distributions::Uniform::from(min..max);
    (0..n_points).map(|_| between.sample(&mut range)).collect()
}

/// The eight corners of a cube with half side `half_side` centred on the origin.
pub fn cube_corners(half_side: f64) -> Vec<[f64; 3]> {
    let mut corners = Vec::with_capacity(8);
    for x in [-half_side, half_side] {
        for y in [-half_side, half_side] {
            for z in [-half_side, half_side] {
                corners.push([x, y, z]);
            }
        }
    }
    corners
}

/// Euclidean distance between two points.
pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}
