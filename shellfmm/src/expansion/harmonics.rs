//! Regular and irregular solid harmonics
//!
//! Regular harmonics are `R_lm(r) = s(m) r^l P_l^|m|(cos t) e^{i m phi} / (l + |m|)!`, with the
//! Condon-Shortley phase in `P` and `s(m) = (-1)^m` for negative `m`. They are generated by
//! Cartesian recurrences so that they are polynomials, and may be evaluated at complex vectors.
use num::{One, Zero};
use num_complex::Complex64;

use super::{constants::factorial, index, ncoeffs};

/// Regular solid harmonics `R_lm(v)` for a complex vector, up to order `lmax`.
///
/// # Arguments
/// * `v` - Cartesian components, `r^2` is taken as `x^2 + y^2 + z^2` without conjugation.
/// * `lmax` - Maximum angular momentum.
pub fn regular_complex(v: &[Complex64; 3], lmax: usize) -> Vec<Complex64> {
    let [x, y, z] = *v;
    let r2 = x * x + y * y + z * z;
    let xp = x + Complex64::i() * y;
    let xm = x - Complex64::i() * y;

    let mut out = vec![Complex64::zero(); ncoeffs(lmax)];
    out[0] = Complex64::one();

    for l in 1..=lmax {
        let li = l as i64;
        let twol = (2 * l) as f64;
        out[index(l, li)] = -xp * out[index(l - 1, li - 1)] / twol;
        out[index(l, -li)] = xm * out[index(l - 1, -(li - 1))] / twol;

        for m in -(li - 1)..=(li - 1) {
            let a = m.unsigned_abs() as usize;
            let mut tmp = z * out[index(l - 1, m)] * (2 * l - 1) as f64;
            if l >= a + 2 {
                tmp -= r2 * out[index(l - 2, m)];
            }
            out[index(l, m)] = tmp / ((l + a) * (l - a)) as f64;
        }
    }

    out
}

/// Regular solid harmonics `R_lm(v)` up to order `lmax`.
pub fn regular(v: &[f64; 3], lmax: usize) -> Vec<Complex64> {
    let v = [
        Complex64::new(v[0], 0.),
        Complex64::new(v[1], 0.),
        Complex64::new(v[2], 0.),
    ];
    regular_complex(&v, lmax)
}

/// Conjugate regular solid harmonics `R*_lm(v)`, the kernel of multipole moments.
pub fn conj_regular(v: &[f64; 3], lmax: usize) -> Vec<Complex64> {
    let mut out = regular(v, lmax);
    out.iter_mut().for_each(|c| *c = c.conj());
    out
}

/// Harmonic polynomials `S_lm(v) = (l - |m|)! (l + |m|)! R_lm(v)`, so that `I_lm = S_lm / r^(2l+1)`.
pub fn scaled_harmonics(v: &[Complex64; 3], lmax: usize) -> Vec<Complex64> {
    let mut out = regular_complex(v, lmax);
    for l in 0..=lmax {
        let li = l as i64;
        for m in -li..=li {
            let a = m.unsigned_abs() as usize;
            out[index(l, m)] *= factorial(l - a) * factorial(l + a);
        }
    }
    out
}

/// Irregular solid harmonics `I_lm(v) = (l - |m|)! P_l^|m|(cos t) e^{i m phi} s(m) / r^(l+1)`.
///
/// The vector must be non-zero.
pub fn irregular(v: &[f64; 3], lmax: usize) -> Vec<Complex64> {
    let r2 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    let inv_r = 1.0 / r2.sqrt();
    let inv_r2 = inv_r * inv_r;

    let mut out = regular(v, lmax);
    let mut scale = inv_r;
    for l in 0..=lmax {
        let li = l as i64;
        for m in -li..=li {
            let a = m.unsigned_abs() as usize;
            out[index(l, m)] *= factorial(l - a) * factorial(l + a) * scale;
        }
        scale *= inv_r2;
    }
    out
}
