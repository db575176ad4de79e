//! Gauss-Legendre root sets and incomplete gamma functions of half-integer order.
//!
//! The Ewald real space kernel needs `P(l + 1/2, T)` and `Q(l + 1/2, T)`, the regularised lower
//! and upper incomplete gamma functions. For moderate `T` these follow from the Boys integral
//! `F_l(T) = int_0^1 t^(2l) exp(-T t^2) dt`, evaluated with one Gauss-Legendre root set per rank
//! `l + 1`. For large `T` the upper function has a closed form.
use lazy_static::lazy_static;
use statrs::function::erf::erfc;

use crate::expansion::constants::HALF_INTEGER_GAMMA;

/// Largest supported rank, `l + 1`, of the root tables.
pub const MAX_RANK: usize = 51;

/// Number of quadrature nodes for rank zero, rank `r` uses `BASE_NODES + r`.
pub const BASE_NODES: usize = 32;

/// Above this argument the upper incomplete gamma function is evaluated in closed form.
pub const CLOSED_FORM_THRESHOLD: f64 = 60.;

/// Quadrature nodes and weights on `[0, 1]`.
#[derive(Debug, Clone)]
pub struct RootSet {
    /// Nodes in `(0, 1)`
    pub nodes: Vec<f64>,

    /// Weights, summing to one
    pub weights: Vec<f64>,
}

/// Legendre polynomial `P_n(x)` and its derivative.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut p0, mut p1) = (1.0, x);
    for k in 2..=n {
        let p2 = ((2 * k - 1) as f64 * x * p1 - (k - 1) as f64 * p0) / k as f64;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// Gauss-Legendre rule with `n` nodes, mapped from `[-1, 1]` to `[0, 1]`.
fn gauss_legendre(n: usize) -> RootSet {
    let mut nodes = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 1..=n {
        let mut x = (std::f64::consts::PI * (i as f64 - 0.25) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, dp) = legendre(n, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre(n, x);
        nodes.push(0.5 * (x + 1.0));
        weights.push(1.0 / ((1.0 - x * x) * dp * dp));
    }

    RootSet { nodes, weights }
}

lazy_static! {
    /// Root sets indexed by rank, `0..=MAX_RANK`.
    pub static ref ROOTS: Vec<RootSet> = (0..=MAX_RANK)
        .map(|rank| gauss_legendre(BASE_NODES + rank))
        .collect();
}

/// Root set for a given rank.
pub fn roots(rank: usize) -> &'static RootSet {
    assert!(
        rank <= MAX_RANK,
        "Rank {} exceeds the root table size {}",
        rank,
        MAX_RANK
    );
    &ROOTS[rank]
}

/// Boys integral `F_l(T) = int_0^1 t^(2l) exp(-T t^2) dt`.
pub fn boys(l: usize, t: f64) -> f64 {
    let set = roots(l + 1);
    set.nodes
        .iter()
        .zip(set.weights.iter())
        .map(|(x, w)| w * x.powi(2 * l as i32) * (-t * x * x).exp())
        .sum()
}

/// Closed form `Q(l + 1/2, T) = erfc(sqrt T) + exp(-T) sum_{j=1..l} T^(j-1/2) / Gamma(j+1/2)`.
fn upper_closed_form(l: usize, t: f64) -> f64 {
    let mut sum = erfc(t.sqrt());
    let mut term = (-t).exp() * t.sqrt() / HALF_INTEGER_GAMMA[1];
    for j in 1..=l {
        sum += term;
        term *= t / (j as f64 + 0.5);
    }
    sum
}

/// Regularised lower incomplete gamma function `P(l + 1/2, T)`.
pub fn lower_gamma_regularized(l: usize, t: f64) -> f64 {
    if t <= 0. {
        0.
    } else if t > CLOSED_FORM_THRESHOLD {
        1. - upper_closed_form(l, t)
    } else {
        2. * t.powf(l as f64 + 0.5) * boys(l, t) / HALF_INTEGER_GAMMA[l]
    }
}

/// Regularised upper incomplete gamma function `Q(l + 1/2, T)`.
pub fn upper_gamma_regularized(l: usize, t: f64) -> f64 {
    if t > CLOSED_FORM_THRESHOLD {
        upper_closed_form(l, t)
    } else {
        1. - lower_gamma_regularized(l, t)
    }
}
