//! Interfaces to the charge distribution collaborator.
//!
//! The FMM never evaluates Gaussian integrals itself. It consumes charge distributions (products of
//! two basis function shells) through [`ChargeDistribution`], and exact short range interactions
//! through [`NearField`].
use num_complex::Complex64;

/// A charge distribution formed by a pair of basis function shells.
///
/// Distributions are unordered shell pairs: a pair whose two offsets differ stands for both
/// orderings and so carries a density weight of two.
pub trait ChargeDistribution: Send + Sync {
    /// Spatial centre of the distribution.
    fn centre(&self) -> [f64; 3];

    /// Radius outside of which the distribution is treated as negligible.
    fn extent(&self) -> f64;

    /// Basis function offsets of the two shells, `[offset0, offset1]`.
    fn offsets(&self) -> [usize; 2];

    /// Number of basis functions in each shell.
    fn sizes(&self) -> [usize; 2];

    /// Square root of the largest `(ab|ab)` integral of this pair, if screening is wanted.
    fn schwarz(&self) -> Option<f64> {
        None
    }

    /// Multipole integrals of every basis function pair about `centre`, up to order `lmax`.
    ///
    /// # Arguments
    /// * `centre` - Expansion centre.
    /// * `lmax` - Maximum angular momentum of the expansion.
    ///
    /// Returns `npairs * ncoeffs(lmax)` values, pair `i0 * sizes[1] + i1` occupying a contiguous
    /// block holding the integrals of the conjugate regular solid harmonics `R*_lm(r - centre)`.
    fn multipoles(&self, centre: &[f64; 3], lmax: usize) -> Vec<Complex64>;

    /// A copy of this distribution displaced by a lattice vector.
    fn translate(&self, shift: &[f64; 3]) -> Self
    where
        Self: Sized;

    /// Number of basis function pairs.
    fn npairs(&self) -> usize {
        let [n0, n1] = self.sizes();
        n0 * n1
    }

    /// Whether both shells are the same, in which case the pair density weight is one.
    fn is_diagonal(&self) -> bool {
        let [o0, o1] = self.offsets();
        o0 == o1
    }
}

/// Exact evaluation of near field interactions between charge distributions.
pub trait NearField<C: ChargeDistribution>: Send + Sync {
    /// Coulomb integrals `(bra|ket)` in row major order with shape `[bra.npairs(), ket.npairs()]`.
    fn coulomb(&self, bra: &C, ket: &C) -> Vec<f64>;
}
