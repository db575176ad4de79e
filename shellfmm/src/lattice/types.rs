//! Lattice geometry and lattice sum coefficients.
use itertools::Itertools;
use log::{info, warn};
use num_complex::Complex64;

use crate::{
    expansion::{ncoeffs, singular_to_local},
    lattice::{compute_mlm, compute_mlm_direct, quadrature::MAX_RANK},
    traits::types::FmmError,
};

/// Highest order compared when cross checking lattice sum strategies.
pub const VALIDATION_ORDER: usize = 4;

/// A Bravais lattice periodic in one, two or three dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// Primitive vectors, one per periodic dimension.
    basis: Vec<[f64; 3]>,
}

/// Strategy used to evaluate the lattice sum coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MlmStrategy {
    /// Truncated summation refined by self-similar supercell iterations.
    Direct,

    /// Ewald split into real and reciprocal space sums.
    #[default]
    Ewald,
}

/// Lattice sum coefficients `M_lm` up to some order, stored flat at `l^2 + l + m`.
#[derive(Debug, Clone)]
pub struct LatticeSum {
    /// Maximum angular momentum of the coefficients, twice the expansion order.
    pub order: usize,

    /// Images with `|n|_inf <= ws` are excluded from the sum.
    pub ws: u64,

    /// Strategy the coefficients were computed with.
    pub strategy: MlmStrategy,

    /// Number of periodic dimensions of the lattice.
    pub ndim: usize,

    /// The coefficients, `M_00 = 0`.
    pub coefficients: Vec<Complex64>,
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

impl Lattice {
    /// Constructor from the primitive vectors.
    ///
    /// # Arguments
    /// * `basis` - One, two or three linearly independent vectors.
    pub fn new(basis: &[[f64; 3]]) -> Result<Self, FmmError> {
        if basis.is_empty() || basis.len() > 3 {
            return Err(FmmError::Configuration(
                "System must be periodic in 1-, 2-, or 3-D".to_string(),
            ));
        }

        let lattice = Lattice {
            basis: basis.to_vec(),
        };

        let scale = basis.iter().map(|a| dot(a, a)).product::<f64>();
        if lattice.gram_determinant() <= 1e-12 * scale {
            return Err(FmmError::Configuration(
                "Lattice vectors are linearly dependent".to_string(),
            ));
        }

        Ok(lattice)
    }

    /// Number of periodic dimensions.
    pub fn ndim(&self) -> usize {
        self.basis.len()
    }

    /// Primitive vectors.
    pub fn basis(&self) -> &[[f64; 3]] {
        &self.basis
    }

    /// Lattice vector `sum_d n_d a_d`.
    pub fn vector(&self, n: &[i64]) -> [f64; 3] {
        let mut out = [0f64; 3];
        for (nd, a) in n.iter().zip(self.basis.iter()) {
            for i in 0..3 {
                out[i] += *nd as f64 * a[i];
            }
        }
        out
    }

    /// Gram matrix `G_ij = a_i . a_j`.
    pub fn gram(&self) -> Vec<Vec<f64>> {
        self.basis
            .iter()
            .map(|a| self.basis.iter().map(|b| dot(a, b)).collect())
            .collect()
    }

    fn gram_determinant(&self) -> f64 {
        let g = self.gram();
        match g.len() {
            1 => g[0][0],
            2 => g[0][0] * g[1][1] - g[0][1] * g[1][0],
            _ => {
                g[0][0] * (g[1][1] * g[2][2] - g[1][2] * g[2][1])
                    - g[0][1] * (g[1][0] * g[2][2] - g[1][2] * g[2][0])
                    + g[0][2] * (g[1][0] * g[2][1] - g[1][1] * g[2][0])
            }
        }
    }

    /// Length, area or volume of the unit cell.
    pub fn volume(&self) -> f64 {
        self.gram_determinant().sqrt()
    }

    /// Reciprocal vectors `b_i` in the span of the lattice, with `a_i . b_j = delta_ij`.
    pub fn reciprocal(&self) -> Vec<[f64; 3]> {
        let g = self.gram();
        let det = self.gram_determinant();

        let inverse: Vec<Vec<f64>> = match g.len() {
            1 => vec![vec![1. / g[0][0]]],
            2 => vec![
                vec![g[1][1] / det, -g[0][1] / det],
                vec![-g[1][0] / det, g[0][0] / det],
            ],
            _ => {
                let cofactor = |i: usize, j: usize| {
                    let (r0, r1) = ((i + 1) % 3, (i + 2) % 3);
                    let (c0, c1) = ((j + 1) % 3, (j + 2) % 3);
                    g[r0][c0] * g[r1][c1] - g[r0][c1] * g[r1][c0]
                };
                (0..3)
                    .map(|i| (0..3).map(|j| cofactor(j, i) / det).collect())
                    .collect()
            }
        };

        inverse
            .iter()
            .map(|row| {
                let mut b = [0f64; 3];
                for (gij, a) in row.iter().zip(self.basis.iter()) {
                    for c in 0..3 {
                        b[c] += gij * a[c];
                    }
                }
                b
            })
            .collect()
    }

    /// Integer image indices with `|n|_inf <= extent`, in lexicographic order.
    pub fn images(&self, extent: i64) -> Vec<Vec<i64>> {
        (0..self.ndim())
            .map(|_| -extent..=extent)
            .multi_cartesian_product()
            .collect()
    }
}

impl LatticeSum {
    /// Compute lattice sum coefficients up to `order`.
    ///
    /// # Arguments
    /// * `lattice` - The periodic lattice.
    /// * `order` - Maximum angular momentum, twice the expansion order of the FMM.
    /// * `ws` - Images with `|n|_inf <= ws` are treated as near field and excluded.
    /// * `strategy` - Summation strategy.
    /// * `beta` - Ewald splitting parameter, unused by the direct strategy.
    /// * `extent` - Image cutoff of the Ewald real and reciprocal sums.
    pub fn new(
        lattice: &Lattice,
        order: usize,
        ws: u64,
        strategy: MlmStrategy,
        beta: f64,
        extent: i64,
    ) -> Result<Self, FmmError> {
        let coefficients = match strategy {
            MlmStrategy::Direct => compute_mlm_direct(lattice, order, ws),
            MlmStrategy::Ewald => {
                if order + 1 > MAX_RANK {
                    return Err(FmmError::Configuration(format!(
                        "Lattice sum order {} exceeds the supported maximum {}",
                        order,
                        MAX_RANK - 1
                    )));
                }
                if beta <= 0. {
                    return Err(FmmError::Configuration(format!(
                        "Ewald parameter must be positive, found {}",
                        beta
                    )));
                }
                compute_mlm(lattice, order, ws, beta, extent)?
            }
        };

        info!(
            "Lattice sum: {}-D, order {}, ws {}, strategy {:?}",
            lattice.ndim(),
            order,
            ws,
            strategy
        );

        Ok(LatticeSum {
            order,
            ws,
            strategy,
            ndim: lattice.ndim(),
            coefficients,
        })
    }

    /// First coefficient compared when cross checking. In 3-D the `l = 1` and `l = 2` sums are
    /// conditionally convergent and take a shape dependent value that differs between strategies.
    fn first_compared(&self) -> usize {
        if self.ndim == 3 {
            ncoeffs(2)
        } else {
            0
        }
    }

    /// Largest absolute deviation from another set of coefficients, over the orders both hold up
    /// to [`VALIDATION_ORDER`]. Direct summation converges poorly at high order.
    pub fn max_deviation(&self, other: &LatticeSum) -> f64 {
        let n = ncoeffs(self.order.min(other.order).min(VALIDATION_ORDER));
        let first = self.first_compared().min(n);
        self.coefficients[first..n]
            .iter()
            .zip(other.coefficients[first..n].iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0f64, f64::max)
    }

    /// Compare against coefficients from the other strategy.
    ///
    /// Returns the largest absolute deviation if it is within `thresh`, and an accuracy error
    /// otherwise.
    pub fn check_against(&self, other: &LatticeSum, thresh: f64) -> Result<f64, FmmError> {
        let max_deviation = self.max_deviation(other);
        if max_deviation > thresh {
            warn!(
                "{:?} and {:?} lattice sums deviate by {:e}, threshold {:e}",
                self.strategy, other.strategy, max_deviation, thresh
            );
            Err(FmmError::Accuracy {
                max_deviation,
                thresh,
            })
        } else {
            Ok(max_deviation)
        }
    }

    /// Local expansion of order `lmax` about the cell centre due to all far images of a cell
    /// multipole expansion of the same order.
    pub fn local(&self, multipole: &[Complex64], lmax: usize) -> Result<Vec<Complex64>, FmmError> {
        if 2 * lmax > self.order {
            return Err(FmmError::Configuration(format!(
                "Lattice sum of order {} cannot translate expansions of order {}",
                self.order, lmax
            )));
        }
        let mut out = vec![Complex64::new(0., 0.); ncoeffs(lmax)];
        singular_to_local(multipole, &self.coefficients, lmax, &mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lattice_dimensionality() {
        assert!(matches!(
            Lattice::new(&[]),
            Err(FmmError::Configuration(_))
        ));
        assert!(matches!(
            Lattice::new(&[[1., 0., 0.]; 4]),
            Err(FmmError::Configuration(_))
        ));
        assert!(matches!(
            Lattice::new(&[[1., 0., 0.], [2., 0., 0.]]),
            Err(FmmError::Configuration(_))
        ));
        assert_eq!(Lattice::new(&[[0., 0., 2.]]).unwrap().ndim(), 1);
    }

    #[test]
    fn test_reciprocal_vectors() {
        let bases = vec![
            vec![[0.3, 0.8, 0.5]],
            vec![[1., 0., 0.], [0.3, 1.1, 0.]],
            vec![[1., 0.1, 0.], [0.2, 1.3, 0.], [0.1, -0.2, 0.9]],
        ];
        for basis in bases {
            let lattice = Lattice::new(&basis).unwrap();
            let reciprocal = lattice.reciprocal();
            for (i, a) in basis.iter().enumerate() {
                for (j, b) in reciprocal.iter().enumerate() {
                    let expected = if i == j { 1. } else { 0. };
                    assert_relative_eq!(dot(a, b), expected, epsilon = 1e-14);
                }
            }
        }

        let lattice = Lattice::new(&[[2., 0., 0.], [0., 3., 0.], [0., 0., 0.5]]).unwrap();
        assert_relative_eq!(lattice.volume(), 3., epsilon = 1e-14);
        assert_eq!(lattice.images(1).len(), 27);
        assert_eq!(lattice.vector(&[1, -1, 2]), [2., -3., 1.]);
    }

    #[test]
    fn test_check_against() {
        let a = LatticeSum {
            order: 2,
            ws: 1,
            strategy: MlmStrategy::Direct,
            ndim: 2,
            coefficients: vec![Complex64::new(0., 0.); 9],
        };
        let mut b = a.clone();
        b.strategy = MlmStrategy::Ewald;
        b.coefficients[4] = Complex64::new(1e-3, 0.);

        assert_relative_eq!(a.check_against(&b, 1e-2).unwrap(), 1e-3);
        assert!(matches!(
            a.check_against(&b, 1e-6),
            Err(FmmError::Accuracy { .. })
        ));

        // Shape dependent dipole and quadrupole sums are not compared in 3-D
        let mut c = a.clone();
        c.ndim = 3;
        assert_eq!(c.max_deviation(&b), 0.);
    }

    fn cross_check(basis: &[[f64; 3]], order: usize) -> (LatticeSum, LatticeSum) {
        let lattice = Lattice::new(basis).unwrap();
        let cell_length = lattice.volume().powf(1. / lattice.ndim() as f64);
        let beta = std::f64::consts::PI.sqrt() / cell_length;
        let direct = LatticeSum::new(&lattice, order, 1, MlmStrategy::Direct, beta, 5).unwrap();
        let ewald = LatticeSum::new(&lattice, order, 1, MlmStrategy::Ewald, beta, 5).unwrap();
        (direct, ewald)
    }

    #[test]
    fn test_strategies_agree_on_non_cubic_cells() {
        let bases = vec![
            vec![[1., 0., 0.], [0., 1., 0.], [0., 0., 1.5]],
            vec![[1., 0., 0.], [0., 1.2, 0.], [0., 0., 0.9]],
            vec![[1., 0., 0.], [0.3, 1.1, 0.]],
            vec![[0.3, 0.8, 0.5]],
        ];
        for basis in bases {
            let (direct, ewald) = cross_check(&basis, 20);
            assert_eq!(direct.ndim, basis.len());
            let deviation = direct.check_against(&ewald, 1e-3).unwrap();
            assert!(deviation < 1e-4);
        }
    }

    #[test]
    fn test_elongated_cell_quadrupole_depends_on_strategy() {
        let (direct, ewald) = cross_check(&[[1., 0., 0.], [0., 1., 0.], [0., 0., 1.5]], 20);

        // M_20 of the direct sum follows the cubic supercell shape, Ewald drops the surface term
        let i = crate::expansion::index(2, 0);
        assert!((direct.coefficients[i] - ewald.coefficients[i]).norm() > 0.5);
        assert!(direct.max_deviation(&ewald) < 1e-4);
    }
}
