//! Multipole to local field translations
use rayon::prelude::*;

use crate::{
    expansion::m2l,
    fmm::types::ShellFmm,
    traits::{
        charge::{ChargeDistribution, NearField},
        fmm::SourceToTargetTranslation,
        parallel::Ensemble,
        tree::SingleTree,
        types::FmmError,
    },
};

impl<C, N, E> SourceToTargetTranslation for ShellFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Every worker translates every box of the level, so no reduction is required.
    fn m2l(&mut self, level: u64) -> Result<(), FmmError> {
        let Some(targets) = self.tree.level_range(level) else {
            return Err(FmmError::Failed(format!(
                "M2L failed, level {} not found in tree",
                level
            )));
        };

        let ncoeffs = self.ncoeffs;
        let lmax = self.params.lmax;
        let boxes = &self.tree.boxes;
        let multipoles = &self.multipoles;

        self.locals[targets.start * ncoeffs..targets.end * ncoeffs]
            .par_chunks_exact_mut(ncoeffs)
            .zip(boxes[targets].par_iter())
            .for_each(|(local, target)| {
                for &source in target.interactions.iter() {
                    let s = &boxes[source].centre;
                    let shift = [
                        target.centre[0] - s[0],
                        target.centre[1] - s[1],
                        target.centre[2] - s[2],
                    ];
                    m2l(
                        &multipoles[source * ncoeffs..(source + 1) * ncoeffs],
                        &shift,
                        lmax,
                        local,
                    );
                }
            });

        Ok(())
    }
}
