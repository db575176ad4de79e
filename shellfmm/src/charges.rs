//! Simple charge distributions implementing the collaborator traits.
//!
//! Each distribution is a single basis function pair on the diagonal of the density, so that a set
//! of them with a unit density describes a set of classical charges. They are used by the tests and
//! benchmarks, and as a template for adapters over real shell pairs.
use num_complex::Complex64;
use statrs::function::erf::erf;

use crate::{
    expansion::conj_regular,
    traits::charge::{ChargeDistribution, NearField},
    tree::helpers::distance,
};

/// Distances below this are treated as coincident.
const COINCIDENT: f64 = 1e-14;

/// `-ln` of the density tail beyond the extent of a Gaussian charge.
const GAUSSIAN_EXTENT_LOG: f64 = 27.6;

/// A point charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCharge {
    /// Charge
    pub charge: f64,

    /// Position
    pub position: [f64; 3],

    /// Radius reported to the tree.
    pub extent: f64,

    /// Basis function index of the pair, `[offset, offset]`.
    pub offset: usize,
}

impl PointCharge {
    /// Constructor
    pub fn new(charge: f64, position: [f64; 3], offset: usize) -> Self {
        Self {
            charge,
            position,
            extent: 0.,
            offset,
        }
    }

    /// A point charge reporting a radius, which widens its near field region.
    pub fn with_extent(mut self, extent: f64) -> Self {
        self.extent = extent;
        self
    }
}

impl ChargeDistribution for PointCharge {
    fn centre(&self) -> [f64; 3] {
        self.position
    }

    fn extent(&self) -> f64 {
        self.extent
    }

    fn offsets(&self) -> [usize; 2] {
        [self.offset, self.offset]
    }

    fn sizes(&self) -> [usize; 2] {
        [1, 1]
    }

    fn multipoles(&self, centre: &[f64; 3], lmax: usize) -> Vec<Complex64> {
        let v = [
            self.position[0] - centre[0],
            self.position[1] - centre[1],
            self.position[2] - centre[2],
        ];
        conj_regular(&v, lmax)
            .into_iter()
            .map(|r| r * self.charge)
            .collect()
    }

    fn translate(&self, shift: &[f64; 3]) -> Self {
        let mut out = *self;
        for (x, s) in out.position.iter_mut().zip(shift.iter()) {
            *x += s;
        }
        out
    }
}

/// Exact Coulomb interaction between point charges. Coincident charges do not interact.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointNearField;

impl NearField<PointCharge> for PointNearField {
    fn coulomb(&self, bra: &PointCharge, ket: &PointCharge) -> Vec<f64> {
        let r = distance(&bra.position, &ket.position);
        if r < COINCIDENT {
            vec![0.]
        } else {
            vec![bra.charge * ket.charge / r]
        }
    }
}

/// A normalised spherical Gaussian charge density, `q (a / pi)^(3/2) exp(-a |r - x|^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianCharge {
    /// Total charge
    pub charge: f64,

    /// Gaussian exponent
    pub exponent: f64,

    /// Centre
    pub position: [f64; 3],

    /// Basis function index of the pair, `[offset, offset]`.
    pub offset: usize,
}

impl GaussianCharge {
    /// Constructor
    pub fn new(charge: f64, exponent: f64, position: [f64; 3], offset: usize) -> Self {
        Self {
            charge,
            exponent,
            position,
            offset,
        }
    }
}

impl ChargeDistribution for GaussianCharge {
    fn centre(&self) -> [f64; 3] {
        self.position
    }

    fn extent(&self) -> f64 {
        (GAUSSIAN_EXTENT_LOG / self.exponent).sqrt()
    }

    fn offsets(&self) -> [usize; 2] {
        [self.offset, self.offset]
    }

    fn sizes(&self) -> [usize; 2] {
        [1, 1]
    }

    fn schwarz(&self) -> Option<f64> {
        // sqrt((a|a)) for the self interaction q^2 sqrt(2 a / pi)
        Some(self.charge.abs() * (2. * self.exponent / std::f64::consts::PI).sqrt().sqrt())
    }

    /// Solid harmonics are harmonic, so their average over a spherical density equals their value
    /// at its centre.
    fn multipoles(&self, centre: &[f64; 3], lmax: usize) -> Vec<Complex64> {
        let v = [
            self.position[0] - centre[0],
            self.position[1] - centre[1],
            self.position[2] - centre[2],
        ];
        conj_regular(&v, lmax)
            .into_iter()
            .map(|r| r * self.charge)
            .collect()
    }

    fn translate(&self, shift: &[f64; 3]) -> Self {
        let mut out = *self;
        for (x, s) in out.position.iter_mut().zip(shift.iter()) {
            *x += s;
        }
        out
    }
}

/// Exact Coulomb interaction between Gaussian charges, `q_a q_b erf(sqrt(p) r) / r` with
/// `p = a b / (a + b)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianNearField;

impl NearField<GaussianCharge> for GaussianNearField {
    fn coulomb(&self, bra: &GaussianCharge, ket: &GaussianCharge) -> Vec<f64> {
        let p = bra.exponent * ket.exponent / (bra.exponent + ket.exponent);
        let r = distance(&bra.position, &ket.position);
        let qq = bra.charge * ket.charge;
        if r < COINCIDENT {
            vec![2. * qq * (p / std::f64::consts::PI).sqrt()]
        } else {
            vec![qq * erf(p.sqrt() * r) / r]
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expansion::{contract, irregular};
    use approx::assert_relative_eq;

    #[test]
    fn test_point_charge_multipoles() {
        let charge = PointCharge::new(-2., [0.1, 0.2, 0.3], 0);
        let om = charge.multipoles(&[0., 0., 0.], 12);
        let far = [3., -2., 4.];
        let potential = contract(&om, &irregular(&far, 12)).re;
        assert_relative_eq!(
            potential,
            -2. / distance(&far, &charge.position),
            max_relative = 1e-12
        );
        assert_eq!(charge.npairs(), 1);
        assert!(charge.is_diagonal());
    }

    #[test]
    fn test_gaussian_near_field() {
        let a = GaussianCharge::new(1., 2., [0., 0., 0.], 0);
        let b = GaussianCharge::new(1., 2., [0., 0., 8.], 1);

        // Self interaction
        let self_energy = GaussianNearField.coulomb(&a, &a)[0];
        assert_relative_eq!(
            self_energy,
            (4. / std::f64::consts::PI).sqrt(),
            max_relative = 1e-14
        );
        assert_relative_eq!(a.schwarz().unwrap().powi(2), self_energy, max_relative = 1e-14);

        // Far apart, point-like
        assert_relative_eq!(
            GaussianNearField.coulomb(&a, &b)[0],
            1. / 8.,
            max_relative = 1e-14
        );

        let shifted = b.translate(&[0., 0., -8.]);
        assert_eq!(shifted.position, a.position);
    }
}
