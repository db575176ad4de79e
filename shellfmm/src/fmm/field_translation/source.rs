//! Multipole expansion translations
use num::Zero;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    expansion::m2m,
    fmm::{
        helpers::{all_reduce_complex, owned_mask, weighted_moments},
        types::ShellFmm,
    },
    traits::{
        charge::{ChargeDistribution, NearField},
        fmm::SourceTranslation,
        parallel::Ensemble,
        tree::SingleTree,
        types::FmmError,
    },
};

impl<C, N, E> SourceTranslation for ShellFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    fn p2m(&mut self) -> Result<(), FmmError> {
        let Some(leaves) = self.tree.level_range(0) else {
            return Err(FmmError::Failed(
                "P2M failed, no leaves found in tree".to_string(),
            ));
        };

        let ncoeffs = self.ncoeffs;
        let owned = owned_mask(&self.ensemble, leaves.len());
        let boxes = &self.tree.boxes[leaves.clone()];
        let charge_distributions = &self.charge_distributions;
        let pair_moments = &self.pair_moments;
        let density = &self.density;

        let leaf_multipoles =
            &mut self.multipoles[leaves.start * ncoeffs..leaves.end * ncoeffs];

        leaf_multipoles
            .par_chunks_exact_mut(ncoeffs)
            .zip(boxes.par_iter())
            .zip(owned.par_iter())
            .for_each(|((multipole, leaf), &owned)| {
                multipole.iter_mut().for_each(|m| *m = Complex64::zero());
                if owned {
                    for &member in leaf.members.iter() {
                        weighted_moments(
                            &charge_distributions[member],
                            &pair_moments[member],
                            density,
                            ncoeffs,
                            multipole,
                        );
                    }
                }
            });

        all_reduce_complex(&self.ensemble, leaf_multipoles);
        Ok(())
    }

    fn m2m(&mut self, level: u64) -> Result<(), FmmError> {
        let (Some(parents), Some(children)) = (
            self.tree.level_range(level),
            level
                .checked_sub(1)
                .and_then(|child_level| self.tree.level_range(child_level)),
        ) else {
            return Err(FmmError::Failed(format!(
                "M2M failed, level {} and its children not found in tree",
                level
            )));
        };

        let ncoeffs = self.ncoeffs;
        let lmax = self.params.lmax;
        let owned = owned_mask(&self.ensemble, parents.len());
        let boxes = &self.tree.boxes;

        // Children are numbered before their parents
        let (lower, upper) = self.multipoles.split_at_mut(parents.start * ncoeffs);
        let child_multipoles = &lower[children.start * ncoeffs..];
        let parent_multipoles = &mut upper[..parents.len() * ncoeffs];

        parent_multipoles
            .par_chunks_exact_mut(ncoeffs)
            .zip(boxes[parents.clone()].par_iter())
            .zip(owned.par_iter())
            .for_each(|((multipole, parent), &owned)| {
                multipole.iter_mut().for_each(|m| *m = Complex64::zero());
                if owned {
                    for &child in parent.children.iter() {
                        let c = &boxes[child].centre;
                        let shift = [
                            c[0] - parent.centre[0],
                            c[1] - parent.centre[1],
                            c[2] - parent.centre[2],
                        ];
                        let offset = (child - children.start) * ncoeffs;
                        m2m(
                            &child_multipoles[offset..offset + ncoeffs],
                            &shift,
                            lmax,
                            multipole,
                        );
                    }
                }
            });

        all_reduce_complex(&self.ensemble, parent_multipoles);
        Ok(())
    }
}
