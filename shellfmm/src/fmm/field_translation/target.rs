//! Local expansion translations and leaf evaluation
use rayon::prelude::*;

use crate::{
    expansion::l2l,
    fmm::{
        helpers::{leaf_contractions, near_field_contribution, owned_mask, scatter, screened},
        types::ShellFmm,
    },
    traits::{
        charge::{ChargeDistribution, NearField},
        fmm::TargetTranslation,
        parallel::Ensemble,
        tree::SingleTree,
        types::FmmError,
    },
};

impl<C, N, E> TargetTranslation for ShellFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    fn l2l(&mut self, level: u64) -> Result<(), FmmError> {
        let (Some(children), Some(parents)) = (
            self.tree.level_range(level),
            self.tree.level_range(level + 1),
        ) else {
            return Err(FmmError::Failed(format!(
                "L2L failed, level {} and its parents not found in tree",
                level
            )));
        };

        let ncoeffs = self.ncoeffs;
        let lmax = self.params.lmax;
        let boxes = &self.tree.boxes;

        let (lower, upper) = self.locals.split_at_mut(parents.start * ncoeffs);
        let parent_locals = &upper[..parents.len() * ncoeffs];

        lower[children.start * ncoeffs..children.end * ncoeffs]
            .par_chunks_exact_mut(ncoeffs)
            .zip(boxes[children].par_iter())
            .for_each(|(local, child)| {
                if let Some(parent) = child.parent {
                    let p = &boxes[parent].centre;
                    let shift = [
                        child.centre[0] - p[0],
                        child.centre[1] - p[1],
                        child.centre[2] - p[2],
                    ];
                    let offset = (parent - parents.start) * ncoeffs;
                    l2l(
                        &parent_locals[offset..offset + ncoeffs],
                        &shift,
                        lmax,
                        local,
                    );
                }
            });

        Ok(())
    }

    fn l2p(&mut self) -> Result<(), FmmError> {
        let Some(leaves) = self.tree.level_range(0) else {
            return Err(FmmError::Failed(
                "L2P failed, no leaves found in tree".to_string(),
            ));
        };

        let owned = owned_mask(&self.ensemble, leaves.len());
        let contributions = leaf_contractions(
            &self.tree.boxes[leaves],
            &owned,
            &self.locals,
            &self.charge_distributions,
            &self.pair_moments,
            self.ncoeffs,
        );

        for (target, values) in contributions {
            scatter(
                &self.charge_distributions[target],
                &values,
                &mut self.coulomb,
            );
        }

        Ok(())
    }

    fn p2p(&mut self) -> Result<(), FmmError> {
        let Some(leaves) = self.tree.level_range(0) else {
            return Err(FmmError::Failed(
                "P2P failed, no leaves found in tree".to_string(),
            ));
        };

        let owned = owned_mask(&self.ensemble, leaves.len());
        let thresh = self.params.thresh;
        let boxes = &self.tree.boxes;
        let charge_distributions = &self.charge_distributions;
        let near_field = &self.near_field;
        let density = &self.density;
        let maxden = &self.maxden;

        let contributions: Vec<(usize, Vec<f64>)> = boxes[leaves]
            .par_iter()
            .zip(owned.par_iter())
            .filter(|(_, owned)| **owned)
            .flat_map_iter(|(leaf, _)| {
                leaf.members.iter().map(move |&target| {
                    let a = &charge_distributions[target];
                    let mut values = vec![0f64; a.npairs()];
                    for &neighbour in leaf.neighbours.iter() {
                        for &source in boxes[neighbour].members.iter() {
                            let b = &charge_distributions[source];
                            if !screened(a, b, maxden[source], thresh) {
                                near_field_contribution(near_field, a, b, density, &mut values);
                            }
                        }
                    }
                    (target, values)
                })
            })
            .collect();

        for (target, values) in contributions {
            scatter(
                &self.charge_distributions[target],
                &values,
                &mut self.coulomb,
            );
        }

        Ok(())
    }
}
