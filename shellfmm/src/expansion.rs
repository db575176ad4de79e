//! Complex spherical harmonic expansions.
//!
//! Coefficients for `l = 0..=lmax`, `m = -l..=l` are stored flat at index `l^2 + l + m`. Multipoles
//! hold the moments `sum q R*_lm(x - c)` of conjugate regular solid harmonics, local expansions
//! are evaluated as `phi(r) = sum L_lm R*_lm(r - c)`.
pub mod constants;
pub mod harmonics;
pub mod translation;

pub use harmonics::{conj_regular, irregular, regular, regular_complex, scaled_harmonics};
pub use translation::{contract, l2l, m2l, m2m, singular_to_local};

/// Flat index of the `(l, m)` coefficient.
#[inline(always)]
pub fn index(l: usize, m: i64) -> usize {
    ((l * l + l) as i64 + m) as usize
}

/// Number of coefficients in an expansion of order `lmax`.
#[inline(always)]
pub fn ncoeffs(lmax: usize) -> usize {
    (lmax + 1) * (lmax + 1)
}
