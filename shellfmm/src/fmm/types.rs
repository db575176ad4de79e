//! Data structures for the shell pair FMM
use std::ops::{Index, IndexMut};

use num_complex::Complex64;

use crate::{
    fmm::{
        constants::{
            DEFAULT_EXPANSION_ORDER, DEFAULT_EXTENT_SUM, DEFAULT_SUBDIVISIONS, DEFAULT_THRESH,
            DEFAULT_VALIDATION_THRESH, DEFAULT_WS, MAX_EXPANSION_ORDER,
        },
        ensemble::SingleProcess,
    },
    lattice::{Lattice, LatticeSum, MlmStrategy},
    traits::{
        charge::{ChargeDistribution, NearField},
        parallel::Ensemble,
        types::{FmmError, FmmOperatorTime},
    },
    tree::{constants::MAX_SUBDIVISIONS, BoxTree},
};

/// Dense square matrix of basis function dimension, stored in column major order.
///
/// Used for densities, Coulomb matrices and periodic image blocks, all of which are symmetric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquareMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// Zero matrix of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0f64; dim * dim],
        }
    }

    /// Identity matrix of dimension `dim`.
    pub fn identity(dim: usize) -> Self {
        let mut result = Self::new(dim);
        for i in 0..dim {
            result[[i, i]] = 1.;
        }
        result
    }

    /// Wrap column major data of dimension `dim`.
    pub fn from_vec(dim: usize, data: Vec<f64>) -> Result<Self, std::io::Error> {
        if data.len() != dim * dim {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Expected {} elements for a square matrix of dimension {}, found {}",
                    dim * dim,
                    dim,
                    data.len()
                ),
            ));
        }
        Ok(Self { dim, data })
    }

    /// Dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Column major data
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable column major data
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Frobenius inner product, `sum_ij A_ij B_ij`.
    pub fn dot(&self, other: &SquareMatrix) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Set every element to zero.
    pub fn fill_zero(&mut self) {
        self.data.iter_mut().for_each(|x| *x = 0.);
    }
}

impl Index<[usize; 2]> for SquareMatrix {
    type Output = f64;

    fn index(&self, [i, j]: [usize; 2]) -> &f64 {
        &self.data[j * self.dim + i]
    }
}

impl IndexMut<[usize; 2]> for SquareMatrix {
    fn index_mut(&mut self, [i, j]: [usize; 2]) -> &mut f64 {
        &mut self.data[j * self.dim + i]
    }
}

/// Runtime parameters of the FMM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmmParameters {
    /// Expansion order
    pub lmax: usize,

    /// Number of binary subdivisions of the domain at the finest level.
    pub ns: u64,

    /// Well-separateness parameter, boxes are neighbours if `|c_a - c_b| <= (1 + ws)(r_a + r_b)`.
    pub ws: u64,

    /// Schwarz screening threshold for near field blocks.
    pub thresh: f64,
}

impl Default for FmmParameters {
    fn default() -> Self {
        Self {
            lmax: DEFAULT_EXPANSION_ORDER,
            ns: DEFAULT_SUBDIVISIONS,
            ws: DEFAULT_WS,
            thresh: DEFAULT_THRESH,
        }
    }
}

impl FmmParameters {
    /// Check that every parameter is within its supported range.
    pub fn validate(&self) -> Result<(), FmmError> {
        if self.lmax > MAX_EXPANSION_ORDER {
            return Err(FmmError::Configuration(format!(
                "Expansion order {} exceeds the maximum of {}",
                self.lmax, MAX_EXPANSION_ORDER
            )));
        }
        if self.ns > MAX_SUBDIVISIONS {
            return Err(FmmError::Configuration(format!(
                "ns={} exceeds the maximum of {}",
                self.ns, MAX_SUBDIVISIONS
            )));
        }
        if self.ws == 0 {
            return Err(FmmError::Configuration(
                "Well-separateness parameter must be at least 1".to_string(),
            ));
        }
        if !(self.thresh >= 0. && self.thresh.is_finite()) {
            return Err(FmmError::Configuration(format!(
                "Screening threshold must be finite and non-negative, found {}",
                self.thresh
            )));
        }
        Ok(())
    }
}

/// Holds all data required to evaluate the Coulomb matrix of a set of charge distributions with a
/// spherical harmonic FMM.
///
/// Expansions are stored flat, box `i` occupying `[i * ncoeffs, (i + 1) * ncoeffs)`, and since
/// boxes are numbered by level each level is a contiguous block.
///
/// # Fields
/// - `tree` - Box tree over the charge distribution centres.
///
/// - `pair_moments` - Multipole integrals of each charge distribution about the centre of its leaf,
///   computed once at construction.
///
/// - `maxden` - Largest absolute density element of each charge distribution's block, used for
///   Schwarz screening.
///
/// - `far_field` - Whether the multipole passes run. False when no box at any level interacts.
pub struct ShellFmm<C, N, E = SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Box tree over the charge distribution centres.
    pub tree: BoxTree,

    /// Charge distributions, indexed as in the tree's member lists.
    pub charge_distributions: Vec<C>,

    /// Exact near field evaluator.
    pub near_field: N,

    /// Workers sharing the evaluation.
    pub ensemble: E,

    /// Runtime parameters
    pub params: FmmParameters,

    /// Number of coefficients per expansion.
    pub ncoeffs: usize,

    /// Dimension of the basis.
    pub nbasis: usize,

    /// Density the Coulomb matrix is evaluated for.
    pub density: SquareMatrix,

    /// Largest absolute density element per charge distribution.
    pub maxden: Vec<f64>,

    /// Leaf containing each charge distribution.
    pub leaf_of: Vec<usize>,

    /// Multipole integrals per charge distribution about its leaf centre.
    pub pair_moments: Vec<Vec<Complex64>>,

    /// Multipole expansions of all boxes.
    pub multipoles: Vec<Complex64>,

    /// Local expansions of all boxes.
    pub locals: Vec<Complex64>,

    /// Coulomb matrix from the last evaluation.
    pub coulomb: SquareMatrix,

    /// Coulomb energy from the last evaluation.
    pub energy: f64,

    /// Whether the multipole passes run.
    pub far_field: bool,

    /// Whether operators are timed.
    pub timed: bool,

    /// Operator runtimes of the last evaluation.
    pub operator_times: Vec<FmmOperatorTime>,
}

/// Builder for a [`ShellFmm`].
///
/// ```
/// # use shellfmm::{FmmBuilder, FmmParameters, PointCharge, PointNearField, SquareMatrix};
/// # use shellfmm::traits::fmm::{Evaluate, Fmm};
/// let charges = vec![
///     PointCharge::new(1.0, [0.0, 0.0, 0.0], 0),
///     PointCharge::new(1.0, [0.0, 0.0, 2.0], 1),
/// ];
/// let mut fmm = FmmBuilder::new()
///     .charge_distributions(charges)
///     .unwrap()
///     .parameters(FmmParameters { ns: 1, ..Default::default() })
///     .unwrap()
///     .near_field(PointNearField)
///     .density(SquareMatrix::identity(2))
///     .unwrap()
///     .build()
///     .unwrap();
/// fmm.evaluate().unwrap();
/// assert!((fmm.energy() - 0.5).abs() < 1e-14);
/// ```
pub struct FmmBuilder<C, N, E = SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Charge distributions
    pub charge_distributions: Option<Vec<C>>,

    /// Dimension of the basis spanned by the charge distributions.
    pub nbasis: Option<usize>,

    /// Runtime parameters, defaulted if unset.
    pub params: Option<FmmParameters>,

    /// Near field evaluator
    pub near_field: Option<N>,

    /// Density
    pub density: Option<SquareMatrix>,

    /// Workers sharing the evaluation.
    pub ensemble: E,

    /// Whether operators are timed.
    pub timed: bool,

    /// Whether the multipole passes always run, even when the tree has no interactions.
    pub force_far_field: bool,
}

/// A point nucleus of the periodic cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nucleus {
    /// Nuclear charge
    pub charge: f64,

    /// Position
    pub position: [f64; 3],
}

/// Runtime parameters of the periodic far field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicParameters {
    /// Scale of the Ewald splitting parameter, `beta = sqrt(pi) * beta_scale`.
    pub beta_scale: f64,

    /// Image cutoff of the Ewald sums and of the far field nuclear repulsion.
    pub extent_sum: i64,

    /// Strategy used for the lattice sum.
    pub strategy: MlmStrategy,

    /// Whether the lattice sum is cross checked against the other strategy.
    pub validate_lattice_sum: bool,

    /// Largest tolerated deviation of the cross check.
    pub validation_thresh: f64,
}

impl Default for PeriodicParameters {
    fn default() -> Self {
        Self {
            beta_scale: 1.0,
            extent_sum: DEFAULT_EXTENT_SUM,
            strategy: MlmStrategy::Ewald,
            validate_lattice_sum: true,
            validation_thresh: DEFAULT_VALIDATION_THRESH,
        }
    }
}

/// A periodic system: the FMM over one unit cell, its near periodic images and the lattice far
/// field of all remaining images.
pub struct PeriodicFmm<C, N, E = SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// FMM over the charge distributions of the unit cell.
    pub fmm: ShellFmm<C, N, E>,

    /// Periodic lattice
    pub lattice: Lattice,

    /// Nuclei of the unit cell.
    pub nuclei: Vec<Nucleus>,

    /// Runtime parameters of the periodic far field.
    pub params: PeriodicParameters,

    /// Lattice sum coefficients of order `2 lmax`.
    pub lattice_sum: LatticeSum,

    /// Set if the lattice sum cross check failed.
    pub accuracy_warning: Option<FmmError>,

    /// Expansion centre of the cell, the mean of the charge distribution centres.
    pub cell_centre: [f64; 3],

    /// Near images `0 < |n|_inf <= ws`.
    pub images: Vec<Vec<i64>>,

    /// Coulomb matrix of the unit cell due to the density of each near image.
    pub image_blocks: Vec<SquareMatrix>,

    /// Coulomb matrix due to the electrons and nuclei of all far images.
    pub far_field: SquareMatrix,

    /// Electronic minus nuclear multipole expansion of the cell.
    pub cell_multipole: Vec<Complex64>,

    /// Local expansion of the far images about the cell centre.
    pub lattice_local: Vec<Complex64>,

    /// `1/2 sum (J_0 + sum_n K_n) D` from the last evaluation.
    pub coulomb_energy: f64,

    /// `1/2 Re <Lambda, Omega>` of the cell in its far images.
    pub far_field_energy: f64,

    /// Nuclear repulsion with the nuclei of far images.
    pub nuclear_repulsion_ff: f64,
}

/// Builder for a [`PeriodicFmm`].
pub struct PeriodicFmmBuilder<C, N, E = SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Builder of the unit cell FMM.
    pub fmm: FmmBuilder<C, N, E>,

    /// Periodic lattice
    pub lattice: Option<Lattice>,

    /// Nuclei of the unit cell.
    pub nuclei: Vec<Nucleus>,

    /// Runtime parameters of the periodic far field, defaulted if unset.
    pub params: Option<PeriodicParameters>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_square_matrix_from_vec() {
        let matrix = SquareMatrix::from_vec(2, vec![1., 2., 3., 4.]).unwrap();
        assert_eq!(matrix.dim(), 2);
        // Column major
        assert_eq!(matrix[[1, 0]], 2.);
        assert_eq!(matrix[[0, 1]], 3.);
        assert_eq!(matrix.dot(&SquareMatrix::identity(2)), 5.);

        assert!(SquareMatrix::from_vec(3, vec![0.; 8]).is_err());
    }
}
