//! Helper Functions
use std::time::{Duration, Instant};

use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    expansion::contract,
    fmm::types::SquareMatrix,
    traits::{
        charge::{ChargeDistribution, NearField},
        parallel::Ensemble,
    },
    tree::FmmBox,
};

/// Run `f`, measuring its wall time if `timed` is set.
pub fn optionally_time<T>(timed: bool, f: impl FnOnce() -> T) -> (T, Option<Duration>) {
    if timed {
        let start = Instant::now();
        let result = f();
        (result, Some(start.elapsed()))
    } else {
        (f(), None)
    }
}

/// Ownership of `n` round-robin distributed items by this worker.
pub fn owned_mask<E: Ensemble>(ensemble: &E, n: usize) -> Vec<bool> {
    (0..n).map(|i| ensemble.owns(i)).collect()
}

/// Sum complex data across the ensemble.
pub fn all_reduce_complex<E: Ensemble>(ensemble: &E, buffer: &mut [Complex64]) {
    if ensemble.size() > 1 {
        ensemble.all_reduce_sum(bytemuck::cast_slice_mut(buffer));
    }
}

/// Density weight of a charge distribution, two for off-diagonal shell pairs which stand for both
/// orderings.
pub fn density_weight<C: ChargeDistribution>(charge_distribution: &C) -> f64 {
    if charge_distribution.is_diagonal() {
        1.
    } else {
        2.
    }
}

/// Largest absolute density element of the block spanned by a charge distribution.
pub fn max_density<C: ChargeDistribution>(charge_distribution: &C, density: &SquareMatrix) -> f64 {
    let [o0, o1] = charge_distribution.offsets();
    let [n0, n1] = charge_distribution.sizes();
    let mut result = 0f64;
    for i0 in 0..n0 {
        for i1 in 0..n1 {
            result = result.max(density[[o0 + i0, o1 + i1]].abs());
        }
    }
    result
}

/// Accumulate the density weighted multipole integrals of a charge distribution.
///
/// # Arguments
/// * `charge_distribution` - Source charge distribution.
/// * `moments` - Its multipole integrals, `npairs` blocks of `ncoeffs`.
/// * `density` - Density matrix.
/// * `ncoeffs` - Number of coefficients per expansion.
/// * `multipole` - Accumulated into.
pub fn weighted_moments<C: ChargeDistribution>(
    charge_distribution: &C,
    moments: &[Complex64],
    density: &SquareMatrix,
    ncoeffs: usize,
    multipole: &mut [Complex64],
) {
    let [o0, o1] = charge_distribution.offsets();
    let [_, n1] = charge_distribution.sizes();
    let weight = density_weight(charge_distribution);

    for (pair, pair_moments) in moments.chunks_exact(ncoeffs).enumerate() {
        let (i0, i1) = (pair / n1, pair % n1);
        let d = weight * density[[o0 + i0, o1 + i1]];
        if d != 0. {
            multipole
                .iter_mut()
                .zip(pair_moments)
                .for_each(|(m, p)| *m += p * d);
        }
    }
}

/// Accumulate `Re sum L_lm O_lm` for every pair of a charge distribution.
pub fn contract_pairs(local: &[Complex64], moments: &[Complex64], ncoeffs: usize, out: &mut [f64]) {
    out.iter_mut()
        .zip(moments.chunks_exact(ncoeffs))
        .for_each(|(o, pair_moments)| *o += contract(local, pair_moments).re);
}

/// Contract the local expansion of each owned leaf with the multipole integrals of its members.
///
/// # Arguments
/// * `leaves` - Leaf boxes.
/// * `owned` - Ownership of each leaf by this worker.
/// * `locals` - Local expansions of all boxes, indexed by box identifier.
/// * `charge_distributions` - All charge distributions.
/// * `pair_moments` - Multipole integrals of each charge distribution about its leaf centre.
/// * `ncoeffs` - Number of coefficients per expansion.
///
/// Returns the values of every pair of each member charge distribution.
pub fn leaf_contractions<C: ChargeDistribution>(
    leaves: &[FmmBox],
    owned: &[bool],
    locals: &[Complex64],
    charge_distributions: &[C],
    pair_moments: &[Vec<Complex64>],
    ncoeffs: usize,
) -> Vec<(usize, Vec<f64>)> {
    leaves
        .par_iter()
        .zip(owned.par_iter())
        .filter(|(_, owned)| **owned)
        .flat_map_iter(|(leaf, _)| {
            let local = &locals[leaf.id * ncoeffs..(leaf.id + 1) * ncoeffs];
            leaf.members.iter().map(move |&target| {
                let mut values = vec![0f64; charge_distributions[target].npairs()];
                contract_pairs(local, &pair_moments[target], ncoeffs, &mut values);
                (target, values)
            })
        })
        .collect()
}

/// Whether the near field block between two charge distributions is negligible under Schwarz
/// screening.
pub fn screened<C: ChargeDistribution>(target: &C, source: &C, maxden: f64, thresh: f64) -> bool {
    match (target.schwarz(), source.schwarz()) {
        (Some(a), Some(b)) => a * b * maxden < thresh,
        _ => false,
    }
}

/// Accumulate the exact potential of a source charge distribution on every pair of a target.
///
/// # Arguments
/// * `near_field` - Exact integral evaluator.
/// * `target` - Target charge distribution.
/// * `source` - Source charge distribution, possibly displaced to a periodic image.
/// * `density` - Density matrix.
/// * `out` - Accumulated into, one value per target pair.
pub fn near_field_contribution<C, N>(
    near_field: &N,
    target: &C,
    source: &C,
    density: &SquareMatrix,
    out: &mut [f64],
) where
    C: ChargeDistribution,
    N: NearField<C>,
{
    let [o0, o1] = source.offsets();
    let [_, n1] = source.sizes();
    let nsource = source.npairs();
    let weight = density_weight(source);

    let densities: Vec<f64> = (0..nsource)
        .map(|q| weight * density[[o0 + q / n1, o1 + q % n1]])
        .collect();

    let block = near_field.coulomb(target, source);
    out.iter_mut()
        .zip(block.chunks_exact(nsource))
        .for_each(|(o, row)| {
            *o += row
                .iter()
                .zip(densities.iter())
                .map(|(v, d)| v * d)
                .sum::<f64>()
        });
}

/// Add the values of each pair of a charge distribution to a symmetric matrix, mirrored for
/// off-diagonal shell pairs.
pub fn scatter<C: ChargeDistribution>(
    charge_distribution: &C,
    values: &[f64],
    matrix: &mut SquareMatrix,
) {
    let [o0, o1] = charge_distribution.offsets();
    let [_, n1] = charge_distribution.sizes();
    let mirror = !charge_distribution.is_diagonal();

    for (pair, &value) in values.iter().enumerate() {
        let (i, j) = (o0 + pair / n1, o1 + pair % n1);
        matrix[[i, j]] += value;
        if mirror {
            matrix[[j, i]] += value;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::charges::{PointCharge, PointNearField};
    use approx::assert_relative_eq;

    /// Two basis function shells of sizes two and three.
    #[derive(Clone)]
    struct ShellPair;

    impl ChargeDistribution for ShellPair {
        fn centre(&self) -> [f64; 3] {
            [0.; 3]
        }

        fn extent(&self) -> f64 {
            0.
        }

        fn offsets(&self) -> [usize; 2] {
            [0, 2]
        }

        fn sizes(&self) -> [usize; 2] {
            [2, 3]
        }

        fn multipoles(&self, _centre: &[f64; 3], lmax: usize) -> Vec<Complex64> {
            let ncoeffs = (lmax + 1) * (lmax + 1);
            (0..6 * ncoeffs)
                .map(|i| Complex64::new((i / ncoeffs) as f64, 0.))
                .collect()
        }

        fn translate(&self, _shift: &[f64; 3]) -> Self {
            self.clone()
        }
    }

    #[test]
    fn test_weighted_moments_and_scatter() {
        let mut density = SquareMatrix::new(5);
        density[[1, 4]] = 0.5;
        density[[4, 1]] = 0.5;

        let cd = ShellPair;
        let moments = cd.multipoles(&[0.; 3], 1);
        let mut multipole = vec![Complex64::new(0., 0.); 4];
        weighted_moments(&cd, &moments, &density, 4, &mut multipole);

        // Pair (1, 2) of the shells is basis pair (1, 4), stored fifth, with weight two
        assert_relative_eq!(multipole[0].re, 2. * 0.5 * 5.);
        assert_relative_eq!(max_density(&cd, &density), 0.5);

        let mut matrix = SquareMatrix::new(5);
        scatter(&cd, &[0., 0., 0., 0., 0., 7.], &mut matrix);
        assert_relative_eq!(matrix[[1, 4]], 7.);
        assert_relative_eq!(matrix[[4, 1]], 7.);
        assert_relative_eq!(matrix.data().iter().sum::<f64>(), 14.);
    }

    #[test]
    fn test_near_field_contribution() {
        let a = PointCharge::new(2., [0., 0., 0.], 0);
        let b = PointCharge::new(-1., [0., 0., 4.], 1);
        let density = SquareMatrix::identity(2);

        let mut out = vec![0.];
        near_field_contribution(&PointNearField, &a, &b, &density, &mut out);
        assert_relative_eq!(out[0], -0.5);
        assert!(!screened(&a, &b, 1., 1.));
    }

    #[test]
    fn test_optionally_time() {
        let (value, duration) = optionally_time(false, || 3);
        assert_eq!(value, 3);
        assert!(duration.is_none());
        let (_, duration) = optionally_time(true, || 3);
        assert!(duration.is_some());
    }
}
