//! Implementation of data access for the shell pair FMM
use num::Zero;
use num_complex::Complex64;

use crate::{
    fmm::{
        helpers::max_density,
        types::{ShellFmm, SquareMatrix},
    },
    traits::{
        charge::{ChargeDistribution, NearField},
        fmm::Fmm,
        parallel::Ensemble,
        types::FmmError,
    },
    tree::BoxTree,
};

impl<C, N, E> Fmm for ShellFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    type Tree = BoxTree;

    fn multipole(&self, index: usize) -> Option<&[Complex64]> {
        self.multipoles
            .get(index * self.ncoeffs..(index + 1) * self.ncoeffs)
    }

    fn local(&self, index: usize) -> Option<&[Complex64]> {
        self.locals.get(index * self.ncoeffs..(index + 1) * self.ncoeffs)
    }

    fn expansion_order(&self) -> usize {
        self.params.lmax
    }

    fn ncoeffs(&self) -> usize {
        self.ncoeffs
    }

    fn tree(&self) -> &Self::Tree {
        &self.tree
    }

    fn coulomb(&self) -> &SquareMatrix {
        &self.coulomb
    }

    fn energy(&self) -> f64 {
        self.energy
    }

    fn clear(&mut self, density: &SquareMatrix) -> Result<(), FmmError> {
        if density.dim() != self.nbasis {
            return Err(FmmError::Configuration(format!(
                "Density of dimension {} does not match a basis of dimension {}",
                density.dim(),
                self.nbasis
            )));
        }

        self.density = density.clone();
        self.maxden = self
            .charge_distributions
            .iter()
            .map(|cd| max_density(cd, density))
            .collect();

        self.multipoles.iter_mut().for_each(|m| *m = Complex64::zero());
        self.locals.iter_mut().for_each(|l| *l = Complex64::zero());
        self.coulomb.fill_zero();
        self.energy = 0.;
        self.operator_times.clear();
        Ok(())
    }
}
