//! # Lattice Sums
//!
//! Coefficients `M_lm = sum_n I_lm(n)` over the lattice vectors `n` outside the `ws` near region,
//! which fold the far periodic images of a cell into a local expansion about the cell centre. The
//! sum is conditionally convergent for low `l`, so two strategies are provided: a direct summation
//! refined by self-similar supercell iterations, and an Ewald split into real and reciprocal space
//! parts. Lattices periodic in one, two or three dimensions are supported.
mod direct;
mod ewald;
pub mod quadrature;
#[cfg(test)]
mod slow;
pub mod types;

pub use direct::compute_mlm_direct;
pub use ewald::compute_mlm;
pub use types::{Lattice, LatticeSum, MlmStrategy};
