//! # Trait Definitions
pub mod charge;
pub mod fmm;
pub mod parallel;
pub mod tree;
pub mod types;
