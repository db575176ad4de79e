//! Direct lattice summation with supercell refinement.
use num::Zero;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    expansion::{conj_regular, index, irregular, ncoeffs},
    lattice::types::Lattice,
};

/// Number of supercell refinement iterations.
pub const DIRECT_ITERATIONS: usize = 16;

fn add_assign(mut a: Vec<Complex64>, b: Vec<Complex64>) -> Vec<Complex64> {
    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
    a
}

/// Lattice sum coefficients by direct summation.
///
/// The images in the shell `ws < |n|_inf <= 3 ws + 1` are summed exactly. Every image further out
/// belongs to the far region of a lattice scaled by three, whose coefficients are those of the
/// original lattice divided by `3^(l+1)`, seen through the multipole of the `3^ndim` cells of a
/// supercell. Iterating this relation adds one further shell of supercells each time.
///
/// # Arguments
/// * `lattice` - The periodic lattice.
/// * `order` - Maximum angular momentum.
/// * `ws` - Images with `|n|_inf <= ws` are excluded.
pub fn compute_mlm_direct(lattice: &Lattice, order: usize, ws: u64) -> Vec<Complex64> {
    let n = ncoeffs(order);
    let ws = ws as i64;

    // Multipole of a supercell of unit charges
    let mstar = lattice
        .images(1)
        .into_par_iter()
        .map(|image| conj_regular(&lattice.vector(&image), order))
        .reduce(|| vec![Complex64::zero(); n], add_assign);

    let lstar = lattice
        .images(3 * ws + 1)
        .into_par_iter()
        .filter(|image| image.iter().any(|i| i.abs() > ws))
        .map(|image| irregular(&lattice.vector(&image), order))
        .reduce(|| vec![Complex64::zero(); n], add_assign);

    let mut mlm = vec![Complex64::zero(); n];
    for _ in 0..DIRECT_ITERATIONS {
        let mut scaled = mlm.clone();
        let mut scale = 1. / 3.;
        for l in 0..=order {
            let li = l as i64;
            for m in -li..=li {
                scaled[index(l, m)] *= scale;
            }
            scale /= 3.;
        }

        for l in 0..=order {
            let li = l as i64;
            for m in -li..=li {
                let mut tmp = lstar[index(l, m)];
                for j in 0..=(order - l) {
                    let ji = j as i64;
                    let sign = if j % 2 == 0 { 1. } else { -1. };
                    for k in -ji..=ji {
                        tmp += mstar[index(j, k)] * scaled[index(l + j, m + k)] * sign;
                    }
                }
                mlm[index(l, m)] = tmp;
            }
        }
    }

    mlm[0] = Complex64::zero();
    mlm
}
