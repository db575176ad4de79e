//! Ewald summation of lattice sum coefficients.
//!
//! `I_lm(n) = S_lm(n) / |n|^(2l+1)`, with `S_lm` a harmonic polynomial, is split with the
//! regularised incomplete gamma functions into a short ranged part `S_lm Q(l+1/2, b^2 n^2) /
//! n^(2l+1)` summed in real space, and a smooth part `S_lm P(l+1/2, b^2 n^2) / n^(2l+1)` summed
//! over the whole lattice in reciprocal space. The smooth part of the excluded near images is
//! subtracted again in real space.
use std::f64::consts::PI;

use num::Zero;
use num_complex::Complex64;
use rayon::prelude::*;
use statrs::function::{erf::erfc, exponential::integral};

use crate::{
    expansion::{
        constants::{factorial, ODD_DOUBLE_FACTORIAL},
        index, ncoeffs, scaled_harmonics,
    },
    lattice::{
        quadrature::{lower_gamma_regularized, upper_gamma_regularized},
        types::Lattice,
    },
    traits::types::FmmError,
};

fn add_assign(mut a: Vec<Complex64>, b: Vec<Complex64>) -> Vec<Complex64> {
    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
    a
}

fn to_complex(v: &[f64; 3]) -> [Complex64; 3] {
    [
        Complex64::new(v[0], 0.),
        Complex64::new(v[1], 0.),
        Complex64::new(v[2], 0.),
    ]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalise(a: &[f64; 3]) -> [f64; 3] {
    let norm = dot(a, a).sqrt();
    [a[0] / norm, a[1] / norm, a[2] / norm]
}

/// `(2 pi i)^p / p!`
fn fourier_power(p: usize) -> Complex64 {
    Complex64::new(0., 2. * PI).powu(p as u32) / factorial(p)
}

/// Taylor coefficients `c_n`, in powers of the squared distance from the periodic subspace, of the
/// partial Fourier transform of `erf(beta r) / r` at reciprocal vector length `k`.
///
/// At `k = 0` the leading coefficient diverges and is returned as zero, callers drop it.
fn taylor_coefficients(
    ndim: usize,
    k: f64,
    beta: f64,
    n_max: usize,
) -> Result<Vec<f64>, FmmError> {
    let x = PI * PI * k * k / (beta * beta);
    let a2 = 4. * PI * PI * k * k;
    let mut c = vec![0f64; n_max + 1];

    let pre = if ndim == 2 {
        if k > 0. {
            c[0] = erfc(PI * k / beta) / k;
        }
        beta / PI.sqrt() * (-x).exp()
    } else {
        if k > 0. {
            c[0] = integral(x, 1).map_err(|e| {
                FmmError::Failed(format!("Exponential integral E1({}) failed: {}", x, e))
            })?;
        }
        beta * beta / PI * (-x).exp()
    };

    let mut rho = pre;
    for n in 0..n_max {
        let denominator = if ndim == 2 {
            ((2 * n + 2) * (2 * n + 1)) as f64
        } else {
            (4 * (n + 1) * (n + 1)) as f64
        };
        c[n + 1] = (a2 * c[n] - 4. * PI * rho) / denominator;
        rho *= -beta * beta / (n + 1) as f64;
    }

    Ok(c)
}

/// Real space part: short ranged kernel outside the near region, minus the smooth kernel inside.
fn real_space(lattice: &Lattice, order: usize, ws: u64, beta: f64, extent: i64) -> Vec<Complex64> {
    let n = ncoeffs(order);
    let ws = ws as i64;

    lattice
        .images(extent)
        .into_par_iter()
        .filter(|image| image.iter().any(|&i| i != 0))
        .map(|image| {
            let v = lattice.vector(&image);
            let r2 = dot(&v, &v);
            let r = r2.sqrt();
            let near = image.iter().all(|i| i.abs() <= ws);

            let mut out = scaled_harmonics(&to_complex(&v), order);
            let t = beta * beta * r2;
            let mut inv_r = 1. / r;
            for l in 0..=order {
                let weight = if near {
                    -lower_gamma_regularized(l, t)
                } else {
                    upper_gamma_regularized(l, t)
                };
                let li = l as i64;
                for m in -li..=li {
                    out[index(l, m)] *= weight * inv_r;
                }
                inv_r /= r2;
            }
            out
        })
        .reduce(|| vec![Complex64::zero(); n], add_assign)
}

/// Reciprocal space part for lattices periodic in three dimensions.
fn reciprocal_3d(lattice: &Lattice, order: usize, beta: f64, extent: i64) -> Vec<Complex64> {
    let n = ncoeffs(order);
    let volume = lattice.volume();
    let rbasis = lattice.reciprocal();

    lattice
        .images(extent)
        .into_par_iter()
        .filter(|image| image.iter().any(|&i| i != 0))
        .map(|image| {
            let mut k = [0f64; 3];
            for (nd, b) in image.iter().zip(rbasis.iter()) {
                for c in 0..3 {
                    k[c] += *nd as f64 * b[c];
                }
            }
            let k2 = dot(&k, &k);
            let g = (-PI * PI * k2 / (beta * beta)).exp() / (PI * k2) / volume;

            let mut out = scaled_harmonics(&to_complex(&k), order);
            for l in 0..=order {
                let prefactor = Complex64::new(0., -2. * PI).powu(l as u32)
                    / ODD_DOUBLE_FACTORIAL[l]
                    * g;
                let li = l as i64;
                for m in -li..=li {
                    out[index(l, m)] *= prefactor;
                }
            }
            out
        })
        .reduce(|| vec![Complex64::zero(); n], add_assign)
}

/// Reciprocal space part for lattices periodic in one dimension.
fn reciprocal_1d(
    lattice: &Lattice,
    order: usize,
    beta: f64,
    extent: i64,
) -> Result<Vec<Complex64>, FmmError> {
    let mut out = vec![Complex64::zero(); ncoeffs(order)];
    let e = normalise(&lattice.basis()[0]);
    let se = scaled_harmonics(&to_complex(&e), order);
    let b = lattice.reciprocal()[0];
    let volume = lattice.volume();

    for t in -extent..=extent {
        let kappa = t as f64 * dot(&b, &e);
        let c = taylor_coefficients(1, kappa.abs(), beta, order / 2 + 1)?;

        for l in 1..=order {
            let mut sum = Complex64::zero();
            for nn in 0..=(l / 2) {
                let p = l - 2 * nn;
                if t == 0 && (p > 0 || nn == 0) {
                    continue;
                }
                let sign = if nn % 2 == 0 { 1. } else { -1. };
                sum += fourier_power(p) * kappa.powi(p as i32) * c[nn] * sign;
            }

            let sign = if l % 2 == 0 { 1. } else { -1. };
            let prefactor = sum * sign / ODD_DOUBLE_FACTORIAL[l] / volume * factorial(l);
            let li = l as i64;
            for m in -li..=li {
                out[index(l, m)] += prefactor * se[index(l, m)];
            }
        }
    }

    Ok(out)
}

/// Reciprocal space part for lattices periodic in two dimensions.
fn reciprocal_2d(
    lattice: &Lattice,
    order: usize,
    beta: f64,
    extent: i64,
) -> Result<Vec<Complex64>, FmmError> {
    let mut out = vec![Complex64::zero(); ncoeffs(order)];
    let basis = lattice.basis();
    let volume = lattice.volume();
    let rbasis = lattice.reciprocal();

    // In plane orthonormal basis
    let e1 = normalise(&basis[0]);
    let d = dot(&basis[1], &e1);
    let e2 = normalise(&[
        basis[1][0] - d * e1[0],
        basis[1][1] - d * e1[1],
        basis[1][2] - d * e1[2],
    ]);

    // coefficients[l, m, a] of s^a in S_lm(s w + conj(w)), w = e1 + i e2, by a discrete Fourier
    // transform over order + 1 roots of unity
    let q = order + 1;
    let samples: Vec<(Complex64, Vec<Complex64>)> = (0..q)
        .map(|qq| {
            let s = Complex64::from_polar(1., 2. * PI * qq as f64 / q as f64);
            let v = [
                s * Complex64::new(e1[0], e2[0]) + Complex64::new(e1[0], -e2[0]),
                s * Complex64::new(e1[1], e2[1]) + Complex64::new(e1[1], -e2[1]),
                s * Complex64::new(e1[2], e2[2]) + Complex64::new(e1[2], -e2[2]),
            ];
            (s, scaled_harmonics(&v, order))
        })
        .collect();

    let mut coefficients = vec![Complex64::zero(); ncoeffs(order) * q];
    for l in 0..=order {
        let li = l as i64;
        for m in -li..=li {
            for a in 0..=l {
                let value: Complex64 = samples
                    .iter()
                    .map(|(s, sv)| sv[index(l, m)] * s.powi(-(a as i32)))
                    .sum();
                coefficients[index(l, m) * q + a] = value / q as f64;
            }
        }
    }

    let binomial = |n: usize, k: usize| factorial(n) / (factorial(k) * factorial(n - k));

    for t in lattice.images(extent) {
        let mut k = [0f64; 3];
        for (nd, b) in t.iter().zip(rbasis.iter()) {
            for c in 0..3 {
                k[c] += *nd as f64 * b[c];
            }
        }
        let knorm = dot(&k, &k).sqrt();
        let kappa = Complex64::new(dot(&k, &e1), dot(&k, &e2));
        let zero = t.iter().all(|&i| i == 0);
        let c = taylor_coefficients(2, knorm, beta, order / 2 + 1)?;

        for l in 1..=order {
            let sign = if l % 2 == 0 { 1. } else { -1. };
            let li = l as i64;
            for m in -li..=li {
                let mut sum = Complex64::zero();
                for nn in 0..=(l / 2) {
                    let p = l - 2 * nn;
                    if zero && (p > 0 || nn == 0) {
                        continue;
                    }
                    let mut inner = Complex64::zero();
                    for j in 0..=p {
                        inner += kappa.conj().powu(j as u32)
                            * kappa.powu((p - j) as u32)
                            * coefficients[index(l, m) * q + j + nn]
                            * (binomial(p, j) * factorial(l) / binomial(l, j + nn));
                    }
                    let nsign = if nn % 2 == 0 { 1. } else { -1. };
                    sum += fourier_power(p) * inner * c[nn] * nsign * 0.5f64.powi(p as i32);
                }
                out[index(l, m)] += sum * sign / ODD_DOUBLE_FACTORIAL[l] / volume;
            }
        }
    }

    Ok(out)
}

/// Lattice sum coefficients by Ewald summation.
///
/// # Arguments
/// * `lattice` - The periodic lattice.
/// * `order` - Maximum angular momentum.
/// * `ws` - Images with `|n|_inf <= ws` are excluded.
/// * `beta` - Splitting parameter, the real space kernel decays as `erfc(beta r)`.
/// * `extent` - Image cutoff `|n|_inf <= extent` of both the real and reciprocal space sums.
pub fn compute_mlm(
    lattice: &Lattice,
    order: usize,
    ws: u64,
    beta: f64,
    extent: i64,
) -> Result<Vec<Complex64>, FmmError> {
    let mut mlm = real_space(lattice, order, ws, beta, extent);

    let reciprocal = match lattice.ndim() {
        1 => reciprocal_1d(lattice, order, beta, extent)?,
        2 => reciprocal_2d(lattice, order, beta, extent)?,
        3 => reciprocal_3d(lattice, order, beta, extent),
        _ => {
            return Err(FmmError::Configuration(
                "System must be periodic in 1-, 2-, or 3-D".to_string(),
            ))
        }
    };

    mlm = add_assign(mlm, reciprocal);
    mlm[0] = Complex64::zero();
    Ok(mlm)
}
