//! Multipole and local expansion translation kernels.
//!
//! All kernels accumulate into their output slice, which must hold `ncoeffs(lmax)` coefficients.
use num::Zero;
use num_complex::Complex64;

use super::{
    harmonics::{conj_regular, irregular},
    index,
};

/// Shift a multipole expansion from a child centre to its parent centre.
///
/// `O_parent(l,m) += sum_{j<=l, k} O_child(j,k) R*_{l-j,m-k}(child - parent)`
///
/// # Arguments
/// * `child` - Multipole expansion about the child centre.
/// * `shift` - Child centre minus parent centre.
/// * `lmax` - Expansion order.
/// * `parent` - Multipole expansion about the parent centre, accumulated into.
pub fn m2m(child: &[Complex64], shift: &[f64; 3], lmax: usize, parent: &mut [Complex64]) {
    let reg = conj_regular(shift, lmax);

    for l in 0..=lmax {
        let li = l as i64;
        for m in -li..=li {
            let mut tmp = Complex64::zero();
            for j in 0..=l {
                let ji = j as i64;
                let lj = (l - j) as i64;
                // |m - k| <= l - j
                let kmin = (-ji).max(m - lj);
                let kmax = ji.min(m + lj);
                for k in kmin..=kmax {
                    tmp += child[index(j, k)] * reg[index(l - j, m - k)];
                }
            }
            parent[index(l, m)] += tmp;
        }
    }
}

/// Contract a multipole expansion with singular coefficients into a local expansion.
///
/// `L(j,k) += (-1)^j sum_{l,m} O(l,m) T(l+j, m+k)`
///
/// With `T = I(target - source)` this is the multipole to local translation, with `T` the lattice
/// coefficients it folds the periodic images into a local expansion about the cell centre.
///
/// # Arguments
/// * `multipole` - Source multipole expansion of order `lmax`.
/// * `singular` - Singular coefficients of order at least `2 * lmax`.
/// * `lmax` - Expansion order.
/// * `local` - Local expansion, accumulated into.
pub fn singular_to_local(
    multipole: &[Complex64],
    singular: &[Complex64],
    lmax: usize,
    local: &mut [Complex64],
) {
    for j in 0..=lmax {
        let ji = j as i64;
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        for k in -ji..=ji {
            let mut tmp = Complex64::zero();
            for l in 0..=lmax {
                let li = l as i64;
                for m in -li..=li {
                    tmp += multipole[index(l, m)] * singular[index(l + j, m + k)];
                }
            }
            local[index(j, k)] += tmp * sign;
        }
    }
}

/// Translate a multipole expansion into a local expansion about a well separated centre.
///
/// # Arguments
/// * `multipole` - Multipole expansion about the source centre.
/// * `shift` - Target centre minus source centre.
/// * `lmax` - Expansion order.
/// * `local` - Local expansion about the target centre, accumulated into.
pub fn m2l(multipole: &[Complex64], shift: &[f64; 3], lmax: usize, local: &mut [Complex64]) {
    let irr = irregular(shift, 2 * lmax);
    singular_to_local(multipole, &irr, lmax, local)
}

/// Shift a local expansion from a parent centre to a child centre.
///
/// `L_child(a,b) += sum_{j>=a, k} L_parent(j,k) R*_{j-a,k-b}(child - parent)`
///
/// # Arguments
/// * `parent` - Local expansion about the parent centre.
/// * `shift` - Child centre minus parent centre.
/// * `lmax` - Expansion order.
/// * `child` - Local expansion about the child centre, accumulated into.
pub fn l2l(parent: &[Complex64], shift: &[f64; 3], lmax: usize, child: &mut [Complex64]) {
    let reg = conj_regular(shift, lmax);

    for a in 0..=lmax {
        let ai = a as i64;
        for b in -ai..=ai {
            let mut tmp = Complex64::zero();
            for j in a..=lmax {
                let ji = j as i64;
                let ja = (j - a) as i64;
                // |k - b| <= j - a
                let kmin = (-ji).max(b - ja);
                let kmax = ji.min(b + ja);
                for k in kmin..=kmax {
                    tmp += parent[index(j, k)] * reg[index(j - a, k - b)];
                }
            }
            child[index(a, b)] += tmp;
        }
    }
}

/// Pair a local expansion with moments about the same centre, `sum L_lm O_lm`.
///
/// With point charge moments this is the potential energy of the charges in the local field.
pub fn contract(local: &[Complex64], moments: &[Complex64]) -> Complex64 {
    local.iter().zip(moments.iter()).map(|(l, o)| l * o).sum()
}
