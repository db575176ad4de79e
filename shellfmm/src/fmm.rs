//! A fast multipole method over shell pair charge distributions, with periodic boundary conditions.
mod builder;
pub mod constants;
mod data_access;
pub mod ensemble;
pub mod helpers;
pub mod types;

mod field_translation;

pub use ensemble::SingleProcess;
pub use types::{
    FmmBuilder, FmmParameters, Nucleus, PeriodicFmm, PeriodicFmmBuilder, PeriodicParameters,
    ShellFmm, SquareMatrix,
};

mod eval;
mod periodic;
