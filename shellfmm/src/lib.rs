//! # ShellFMM
//!
//! A fast multipole method for the Coulomb matrix `J_ij = sum_kl (ij|kl) D_kl` of a density over
//! shell pair charge distributions, for molecules and for systems periodic in one, two or three
//! dimensions.
//!
//! Notable features of this library are:
//! * Complex spherical harmonic expansions with P2M, M2M, M2L and L2L translations over a box tree
//!   built bottom-up from a uniform grid of leaves.
//! * Lattice sums by direct supercell refinement or Ewald summation, which fold the far periodic
//!   images of the unit cell into a single local expansion.
//! * Exact near field integrals and multipole moments supplied through traits, so that any
//!   integral library can provide the charge distributions.
//! * Round-robin distribution of the tree passes over an ensemble of workers, optionally via MPI.
//!
//! ## Example Usage
//!
//! ```
//! use shellfmm::{FmmBuilder, FmmParameters, PointCharge, PointNearField, SquareMatrix};
//! use shellfmm::traits::fmm::{Evaluate, Fmm};
//!
//! let charges = vec![
//!     PointCharge::new(1., [0., 0., 1.], 0),
//!     PointCharge::new(1., [0., 0., -1.], 1),
//! ];
//!
//! let mut fmm = FmmBuilder::new()
//!     .charge_distributions(charges)
//!     .unwrap()
//!     .parameters(FmmParameters::default())
//!     .unwrap()
//!     .near_field(PointNearField)
//!     .density(SquareMatrix::identity(2))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! fmm.evaluate().unwrap();
//! assert!((fmm.energy() - 0.5).abs() < 1e-12);
//! ```
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod charges;
pub mod expansion;
pub mod fmm;
pub mod lattice;
pub mod traits;
pub mod tree;

// Public API
#[doc(inline)]
pub use charges::{GaussianCharge, GaussianNearField, PointCharge, PointNearField};
#[doc(inline)]
pub use fmm::{
    FmmBuilder, FmmParameters, Nucleus, PeriodicFmm, PeriodicFmmBuilder, PeriodicParameters,
    ShellFmm, SingleProcess, SquareMatrix,
};
#[doc(inline)]
pub use lattice::{Lattice, LatticeSum, MlmStrategy};
#[doc(inline)]
pub use traits::types::FmmError;
#[doc(inline)]
pub use tree::BoxTree;
