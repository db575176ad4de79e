//! FMM traits
use num_complex::Complex64;

use crate::fmm::types::SquareMatrix;

use super::{tree::SingleTree, types::FmmError};

/// Interface for source field translations.
pub trait SourceTranslation {
    /// Leaf multipoles, contracting the moments of each member charge distribution with the density.
    fn p2m(&mut self) -> Result<(), FmmError>;

    /// Multipole to multipole translations, applied during upward pass. Defined over each level of a tree.
    ///
    /// # Arguments
    /// * `level` - The parent level at which this translation is being applied.
    fn m2m(&mut self, level: u64) -> Result<(), FmmError>;
}

/// Interface for target field translations.
pub trait TargetTranslation {
    /// Local to local translations, applied during downward pass. Defined over each level of a tree.
    ///
    /// # Arguments
    /// * `level` - The child level at which this translation is being applied.
    fn l2l(&mut self, level: u64) -> Result<(), FmmError>;

    /// Contract the local expansion of each leaf against the multipole integrals of its members.
    fn l2p(&mut self) -> Result<(), FmmError>;

    /// Exact near field contributions between the members of neighbouring leaves.
    fn p2p(&mut self) -> Result<(), FmmError>;
}

/// Interface for the source to target (multipole to local / M2L) field translations.
pub trait SourceToTargetTranslation {
    /// Interface for multipole to local translation, defined over each level of a tree.
    ///
    /// # Arguments
    /// * `level` - The level of the tree at which this translation is being applied.
    fn m2l(&mut self, level: u64) -> Result<(), FmmError>;
}

/// Interface for a spherical harmonic FMM over charge distributions.
pub trait Fmm {
    /// Type of tree
    type Tree: SingleTree;

    /// Get the multipole expansion data associated with a box as a slice
    /// # Arguments
    /// * `index` - The box identifier.
    fn multipole(&self, index: usize) -> Option<&[Complex64]>;

    /// Get the local expansion data associated with a box as a slice
    /// # Arguments
    /// * `index` - The box identifier.
    fn local(&self, index: usize) -> Option<&[Complex64]>;

    /// Get the expansion order associated with this FMM
    fn expansion_order(&self) -> usize;

    /// Get the number of multipole/local coefficients associated with this FMM
    fn ncoeffs(&self) -> usize;

    /// Get the tree associated with this FMM
    fn tree(&self) -> &Self::Tree;

    /// Symmetric Coulomb matrix from the last evaluation
    fn coulomb(&self) -> &SquareMatrix;

    /// Coulomb energy, `1/2 sum J D`, from the last evaluation
    fn energy(&self) -> f64;

    /// Clear the data buffers and attach a new density for re-evaluation.
    ///
    /// # Arguments
    /// * `density` - new density matrix, its dimension must match the basis.
    fn clear(&mut self, density: &SquareMatrix) -> Result<(), FmmError>;
}

/// Sequencing of the passes making up an FMM evaluation.
pub trait Evaluate
where
    Self: Fmm,
{
    /// Leaf multipoles
    fn evaluate_leaf_sources(&mut self) -> Result<(), FmmError>;

    /// Multipole to multipole translations, from the leaves to the coarsest level
    fn evaluate_upward_pass(&mut self) -> Result<(), FmmError>;

    /// Multipole to local translations at every level, then local to local translations from the
    /// coarsest level down to the leaves
    fn evaluate_downward_pass(&mut self) -> Result<(), FmmError>;

    /// Near field and far field contributions at the leaves, reduced over the ensemble
    fn evaluate_leaf_targets(&mut self) -> Result<(), FmmError>;

    /// Evaluate the Coulomb matrix and energy for the attached density
    fn evaluate(&mut self) -> Result<(), FmmError>;
}
