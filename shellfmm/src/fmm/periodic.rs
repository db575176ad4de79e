//! Evaluation of periodic systems.
//!
//! The Coulomb matrix of a periodic system is assembled from three parts:
//!
//! 1. The FMM over the unit cell, `J_0`.
//! 2. One block `K_n` per near image `0 < |n|_inf <= ws`, the potential of the cell's density
//!    displaced by lattice vector `n`. Leaf pairs that are well separated across the image are
//!    translated with M2L from leaf multipoles, the rest are evaluated exactly.
//! 3. The far field of all remaining images, whose cell multipole (electronic minus nuclear) is
//!    folded into a local expansion about the cell centre by the lattice sum, carried down the tree
//!    and contracted at the leaves.
use log::{info, warn};
use num::Zero;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    expansion::{conj_regular, contract, l2l, m2l, m2m},
    fmm::{
        helpers::{
            contract_pairs, leaf_contractions, near_field_contribution, optionally_time,
            owned_mask, scatter, screened,
        },
        types::{PeriodicFmm, SquareMatrix},
    },
    traits::{
        charge::{ChargeDistribution, NearField},
        fmm::{Evaluate, Fmm},
        parallel::Ensemble,
        tree::SingleTree,
        types::{FmmError, FmmOperatorType},
    },
    tree::{are_neighbours, helpers::distance},
};

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

impl<C, N, E> PeriodicFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Evaluate the cell FMM, the near image blocks and the lattice far field for the attached
    /// density.
    pub fn evaluate(&mut self) -> Result<(), FmmError> {
        self.fmm.evaluate()?;

        let (result, duration) = optionally_time(self.fmm.timed, || {
            self.near_images()?;
            self.lattice_far_field()
        });
        result?;
        self.fmm.record(FmmOperatorType::Lattice, duration);

        self.nuclear_repulsion_ff = self.nuclear_repulsion();

        let density = &self.fmm.density;
        self.coulomb_energy = self.fmm.energy()
            + 0.5
                * self
                    .image_blocks
                    .iter()
                    .map(|block| block.dot(density))
                    .sum::<f64>();

        info!(
            "Periodic energies: Coulomb {:.12}, far field {:.12}, far field nuclear repulsion {:.12}",
            self.coulomb_energy, self.far_field_energy, self.nuclear_repulsion_ff
        );

        Ok(())
    }

    /// Clear the data buffers and attach a new density for re-evaluation.
    pub fn clear(&mut self, density: &SquareMatrix) -> Result<(), FmmError> {
        self.fmm.clear(density)?;
        self.image_blocks.iter_mut().for_each(|b| b.fill_zero());
        self.far_field.fill_zero();
        self.coulomb_energy = 0.;
        self.far_field_energy = 0.;
        Ok(())
    }

    /// The periodic Coulomb matrix, `J_0 + sum_n K_n` plus the far field of all other images.
    pub fn coulomb(&self) -> SquareMatrix {
        let mut result = self.fmm.coulomb().clone();
        for block in self.image_blocks.iter().chain(std::iter::once(&self.far_field)) {
            result
                .data_mut()
                .iter_mut()
                .zip(block.data())
                .for_each(|(r, b)| *r += b);
        }
        result
    }

    /// Block of each near image, leaves of the cell are distributed round-robin.
    fn near_images(&mut self) -> Result<(), FmmError> {
        let fmm = &self.fmm;
        let Some(leaves) = fmm.tree.level_range(0) else {
            return Err(FmmError::Failed(
                "Near images failed, no leaves found in tree".to_string(),
            ));
        };

        let ncoeffs = fmm.ncoeffs;
        let lmax = fmm.params.lmax;
        let ws = fmm.params.ws;
        let thresh = fmm.params.thresh;
        let leaves = &fmm.tree.boxes[leaves];
        let owned = owned_mask(&fmm.ensemble, leaves.len());

        let charge_distributions = &fmm.charge_distributions;
        let pair_moments = &fmm.pair_moments;
        let multipoles = &fmm.multipoles;
        let near_field = &fmm.near_field;
        let density = &fmm.density;
        let maxden = &fmm.maxden;

        for (image, block) in self.images.iter().zip(self.image_blocks.iter_mut()) {
            let shift = self.lattice.vector(image);

            let contributions: Vec<(usize, Vec<f64>)> = leaves
                .par_iter()
                .zip(owned.par_iter())
                .filter(|(_, owned)| **owned)
                .flat_map_iter(|(target, _)| {
                    let mut local = vec![Complex64::zero(); ncoeffs];
                    let mut direct = Vec::new();

                    for (j, source) in leaves.iter().enumerate() {
                        let centre = [
                            source.centre[0] + shift[0],
                            source.centre[1] + shift[1],
                            source.centre[2] + shift[2],
                        ];
                        if are_neighbours(
                            &target.centre,
                            target.extent,
                            &centre,
                            source.extent,
                            ws,
                        ) {
                            direct.push(j);
                        } else {
                            m2l(
                                &multipoles[source.id * ncoeffs..(source.id + 1) * ncoeffs],
                                &sub(&target.centre, &centre),
                                lmax,
                                &mut local,
                            );
                        }
                    }

                    target
                        .members
                        .iter()
                        .map(|&a| {
                            let cd = &charge_distributions[a];
                            let mut values = vec![0f64; cd.npairs()];
                            contract_pairs(&local, &pair_moments[a], ncoeffs, &mut values);

                            for &source in direct.iter() {
                                for &b in leaves[source].members.iter() {
                                    let image = &charge_distributions[b];
                                    if !screened(cd, image, maxden[b], thresh) {
                                        near_field_contribution(
                                            near_field,
                                            cd,
                                            &image.translate(&shift),
                                            density,
                                            &mut values,
                                        );
                                    }
                                }
                            }
                            (a, values)
                        })
                        .collect::<Vec<_>>()
                })
                .collect();

            block.fill_zero();
            for (a, values) in contributions {
                scatter(&charge_distributions[a], &values, block);
            }
            if fmm.ensemble.size() > 1 {
                fmm.ensemble.all_reduce_sum(block.data_mut());
            }
        }

        Ok(())
    }

    /// Local expansion of the far images about the cell centre, contracted at the leaves.
    fn lattice_far_field(&mut self) -> Result<(), FmmError> {
        let fmm = &self.fmm;
        let ncoeffs = fmm.ncoeffs;
        let lmax = fmm.params.lmax;
        let boxes = &fmm.tree.boxes;
        let depth = fmm.tree.depth();

        let (Some(top), Some(leaves)) = (fmm.tree.level_range(depth), fmm.tree.level_range(0))
        else {
            return Err(FmmError::Failed(
                "Lattice far field failed, tree levels not found".to_string(),
            ));
        };

        // Cell multipole about the cell centre
        let mut omega = vec![Complex64::zero(); ncoeffs];
        for id in top.clone() {
            m2m(
                &fmm.multipoles[id * ncoeffs..(id + 1) * ncoeffs],
                &sub(&boxes[id].centre, &self.cell_centre),
                lmax,
                &mut omega,
            );
        }
        for nucleus in self.nuclei.iter() {
            let moments = conj_regular(&sub(&nucleus.position, &self.cell_centre), lmax);
            omega
                .iter_mut()
                .zip(moments)
                .for_each(|(o, m)| *o -= m * nucleus.charge);
        }

        if omega[0].norm() > 1e-8 * omega.iter().map(|o| o.norm()).fold(1f64, f64::max) {
            warn!(
                "Unit cell carries a net charge of {:e}, the lattice sum neutralises it",
                omega[0].re
            );
        }

        let lambda = self.lattice_sum.local(&omega, lmax)?;
        self.far_field_energy = 0.5 * contract(&lambda, &omega).re;

        // Carry the local expansion from the cell centre down to the leaves
        let mut locals = vec![Complex64::zero(); boxes.len() * ncoeffs];
        for id in top {
            l2l(
                &lambda,
                &sub(&boxes[id].centre, &self.cell_centre),
                lmax,
                &mut locals[id * ncoeffs..(id + 1) * ncoeffs],
            );
        }
        for level in (0..depth).rev() {
            let (Some(children), Some(parents)) =
                (fmm.tree.level_range(level), fmm.tree.level_range(level + 1))
            else {
                continue;
            };
            let (lower, upper) = locals.split_at_mut(parents.start * ncoeffs);
            for child in children {
                if let Some(parent) = boxes[child].parent {
                    let offset = (parent - parents.start) * ncoeffs;
                    l2l(
                        &upper[offset..offset + ncoeffs],
                        &sub(&boxes[child].centre, &boxes[parent].centre),
                        lmax,
                        &mut lower[child * ncoeffs..(child + 1) * ncoeffs],
                    );
                }
            }
        }

        let owned = owned_mask(&fmm.ensemble, leaves.len());
        let contributions = leaf_contractions(
            &boxes[leaves],
            &owned,
            &locals,
            &fmm.charge_distributions,
            &fmm.pair_moments,
            ncoeffs,
        );

        self.far_field.fill_zero();
        for (a, values) in contributions {
            scatter(&fmm.charge_distributions[a], &values, &mut self.far_field);
        }
        if fmm.ensemble.size() > 1 {
            fmm.ensemble.all_reduce_sum(self.far_field.data_mut());
        }

        self.cell_multipole = omega;
        self.lattice_local = lambda;
        Ok(())
    }

    /// `1/2 sum Z_a Z_b / |r_a - r_b - n|` over the images `ws < |n|_inf <= extent_sum`.
    fn nuclear_repulsion(&self) -> f64 {
        let ws = self.fmm.params.ws as i64;
        let images = self.lattice.images(self.params.extent_sum);
        let lattice = &self.lattice;
        let nuclei = &self.nuclei;

        0.5 * images
            .par_iter()
            .filter(|image| image.iter().any(|i| i.abs() > ws))
            .map(|image| {
                let shift = lattice.vector(image);
                let mut result = 0.;
                for a in nuclei.iter() {
                    for b in nuclei.iter() {
                        let rb = [
                            b.position[0] + shift[0],
                            b.position[1] + shift[1],
                            b.position[2] + shift[2],
                        ];
                        result += a.charge * b.charge / distance(&a.position, &rb);
                    }
                }
                result
            })
            .sum::<f64>()
    }
}
