//! Plain truncated lattice summation, a reference for testing only.
use num::Zero;
use num_complex::Complex64;

use crate::{
    expansion::{irregular, ncoeffs},
    lattice::types::Lattice,
};

/// Sum `I_lm(n)` over images `ws < |n|_inf <= extent` with no acceleration.
pub fn compute_mlm_slow(lattice: &Lattice, order: usize, ws: u64, extent: i64) -> Vec<Complex64> {
    let ws = ws as i64;
    let mut out = vec![Complex64::zero(); ncoeffs(order)];
    for image in lattice.images(extent) {
        if image.iter().all(|i| i.abs() <= ws) {
            continue;
        }
        let irr = irregular(&lattice.vector(&image), order);
        out.iter_mut().zip(irr).for_each(|(o, i)| *o += i);
    }
    out[0] = Complex64::zero();
    out
}
