//! Builder objects to construct FMMs
use log::{info, warn};
use num::Zero;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    expansion::ncoeffs,
    fmm::{
        ensemble::SingleProcess,
        helpers::max_density,
        types::{
            FmmBuilder, FmmParameters, Nucleus, PeriodicFmm, PeriodicFmmBuilder,
            PeriodicParameters, ShellFmm, SquareMatrix,
        },
    },
    lattice::{Lattice, LatticeSum, MlmStrategy},
    traits::{
        charge::{ChargeDistribution, NearField},
        parallel::Ensemble,
        tree::SingleTree,
        types::FmmError,
    },
    tree::BoxTree,
};

impl<C, N> FmmBuilder<C, N, SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
{
    /// Initialise an empty FMM builder, evaluating on a single worker.
    pub fn new() -> Self {
        Self {
            charge_distributions: None,
            nbasis: None,
            params: None,
            near_field: None,
            density: None,
            ensemble: SingleProcess,
            timed: false,
            force_far_field: false,
        }
    }
}

impl<C, N> Default for FmmBuilder<C, N, SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, N, E> FmmBuilder<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Associate the builder with a set of charge distributions, the basis dimension is the
    /// largest basis function index they span.
    ///
    /// # Arguments
    /// * `charge_distributions` - Shell pairs, each spanning a block of the density.
    pub fn charge_distributions(
        mut self,
        charge_distributions: Vec<C>,
    ) -> Result<Self, std::io::Error> {
        if charge_distributions.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Must have a positive number of charge distributions",
            ));
        }

        if charge_distributions
            .iter()
            .any(|cd| cd.sizes().contains(&0) || !cd.extent().is_finite())
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Charge distributions must have non-empty shells and a finite extent",
            ));
        }

        let nbasis = charge_distributions
            .iter()
            .map(|cd| {
                let [o0, o1] = cd.offsets();
                let [n0, n1] = cd.sizes();
                (o0 + n0).max(o1 + n1)
            })
            .max()
            .unwrap_or(0);

        self.nbasis = Some(nbasis);
        self.charge_distributions = Some(charge_distributions);
        Ok(self)
    }

    /// Specify runtime parameters.
    pub fn parameters(mut self, params: FmmParameters) -> Result<Self, FmmError> {
        params.validate()?;
        self.params = Some(params);
        Ok(self)
    }

    /// Specify the exact near field evaluator.
    pub fn near_field(mut self, near_field: N) -> Self {
        self.near_field = Some(near_field);
        self
    }

    /// Attach a density, whose dimension must match the basis of the charge distributions.
    pub fn density(mut self, density: SquareMatrix) -> Result<Self, std::io::Error> {
        let Some(nbasis) = self.nbasis else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Must specify charge distributions before the density",
            ));
        };

        if density.dim() != nbasis {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "Density of dimension {} does not match a basis of dimension {}",
                    density.dim(),
                    nbasis
                ),
            ));
        }

        self.density = Some(density);
        Ok(self)
    }

    /// Distribute the evaluation over an ensemble of workers.
    pub fn ensemble<F: Ensemble>(self, ensemble: F) -> FmmBuilder<C, N, F> {
        FmmBuilder {
            charge_distributions: self.charge_distributions,
            nbasis: self.nbasis,
            params: self.params,
            near_field: self.near_field,
            density: self.density,
            ensemble,
            timed: self.timed,
            force_far_field: self.force_far_field,
        }
    }

    /// Record operator runtimes during evaluation.
    pub fn timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    /// Run the multipole passes even if the tree has no interacting boxes.
    pub fn force_far_field(mut self, force_far_field: bool) -> Self {
        self.force_far_field = force_far_field;
        self
    }

    /// Finalize and build the FMM
    pub fn build(self) -> Result<ShellFmm<C, N, E>, FmmError> {
        let Some(charge_distributions) = self.charge_distributions else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Must specify charge distributions before building",
            )
            .into());
        };

        let Some(near_field) = self.near_field else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Must specify a near field evaluator before building",
            )
            .into());
        };

        let Some(density) = self.density else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Must specify a density before building",
            )
            .into());
        };

        let nbasis = density.dim();
        let params = self.params.unwrap_or_default();
        params.validate()?;

        let centres = charge_distributions
            .iter()
            .map(|cd| cd.centre())
            .collect::<Vec<_>>();
        let extents = charge_distributions
            .iter()
            .map(|cd| cd.extent())
            .collect::<Vec<_>>();
        let tree = BoxTree::new(&centres, &extents, params.ns, params.ws)?;

        let mut leaf_of = vec![0usize; charge_distributions.len()];
        for leaf in tree.leaves() {
            for &member in leaf.members.iter() {
                leaf_of[member] = leaf.id;
            }
        }

        let lmax = params.lmax;
        let pair_moments = charge_distributions
            .par_iter()
            .zip(leaf_of.par_iter())
            .map(|(cd, &leaf)| cd.multipoles(&tree.boxes[leaf].centre, lmax))
            .collect::<Vec<_>>();

        let ncoeffs = ncoeffs(lmax);
        if let Some(i) = pair_moments
            .iter()
            .zip(charge_distributions.iter())
            .position(|(m, cd)| m.len() != cd.npairs() * ncoeffs)
        {
            return Err(FmmError::Failed(format!(
                "Charge distribution {} returned {} multipole integrals, expected {}",
                i,
                pair_moments[i].len(),
                charge_distributions[i].npairs() * ncoeffs
            )));
        }

        let maxden = charge_distributions
            .iter()
            .map(|cd| max_density(cd, &density))
            .collect();

        let far_field = self.force_far_field || tree.do_far_field();
        if !far_field {
            warn!("No box has an interaction list, the far field passes will be skipped");
        }

        let n_boxes = tree.n_boxes();
        info!(
            "Shell pair FMM: {} charge distributions, basis {}, lmax {}, ns {}, ws {}",
            charge_distributions.len(),
            nbasis,
            lmax,
            params.ns,
            params.ws
        );

        Ok(ShellFmm {
            tree,
            charge_distributions,
            near_field,
            ensemble: self.ensemble,
            params,
            ncoeffs,
            nbasis,
            density,
            maxden,
            leaf_of,
            pair_moments,
            multipoles: vec![Complex64::zero(); n_boxes * ncoeffs],
            locals: vec![Complex64::zero(); n_boxes * ncoeffs],
            coulomb: SquareMatrix::new(nbasis),
            energy: 0.,
            far_field,
            timed: self.timed,
            operator_times: Vec::new(),
        })
    }
}

impl<C, N> PeriodicFmmBuilder<C, N, SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
{
    /// Initialise an empty periodic FMM builder, evaluating on a single worker.
    pub fn new() -> Self {
        Self {
            fmm: FmmBuilder::new(),
            lattice: None,
            nuclei: Vec::new(),
            params: None,
        }
    }
}

impl<C, N> Default for PeriodicFmmBuilder<C, N, SingleProcess>
where
    C: ChargeDistribution,
    N: NearField<C>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, N, E> PeriodicFmmBuilder<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    /// Configure the unit cell FMM.
    ///
    /// # Arguments
    /// * `configure` - Applied to the builder of the unit cell FMM.
    pub fn cell<F, G>(self, configure: G) -> Result<PeriodicFmmBuilder<C, N, F>, FmmError>
    where
        F: Ensemble,
        G: FnOnce(FmmBuilder<C, N, E>) -> Result<FmmBuilder<C, N, F>, FmmError>,
    {
        Ok(PeriodicFmmBuilder {
            fmm: configure(self.fmm)?,
            lattice: self.lattice,
            nuclei: self.nuclei,
            params: self.params,
        })
    }

    /// Specify the periodic lattice by its primitive vectors.
    pub fn lattice(mut self, basis: &[[f64; 3]]) -> Result<Self, FmmError> {
        self.lattice = Some(Lattice::new(basis)?);
        Ok(self)
    }

    /// Specify the nuclei of the unit cell.
    pub fn nuclei(mut self, nuclei: Vec<Nucleus>) -> Self {
        self.nuclei = nuclei;
        self
    }

    /// Specify runtime parameters of the periodic far field.
    pub fn parameters(mut self, params: PeriodicParameters) -> Result<Self, FmmError> {
        if !(params.beta_scale > 0. && params.beta_scale.is_finite()) {
            return Err(FmmError::Configuration(format!(
                "Ewald scale must be positive, found {}",
                params.beta_scale
            )));
        }
        if params.extent_sum < 1 {
            return Err(FmmError::Configuration(format!(
                "Image cutoff must be at least 1, found {}",
                params.extent_sum
            )));
        }
        self.params = Some(params);
        Ok(self)
    }

    /// Finalize and build the periodic FMM, computing the lattice sum.
    ///
    /// A failed cross check of the lattice sum does not fail the build, it is logged and stored
    /// as [`PeriodicFmm::accuracy_warning`].
    pub fn build(self) -> Result<PeriodicFmm<C, N, E>, FmmError> {
        let Some(lattice) = self.lattice else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Must specify a lattice before building",
            )
            .into());
        };
        let params = self.params.unwrap_or_default();

        // Near image translations need the multipoles of every leaf
        let fmm = self.fmm.force_far_field(true).build()?;
        let lmax = fmm.params.lmax;
        let ws = fmm.params.ws;

        if params.extent_sum <= ws as i64 {
            return Err(FmmError::Configuration(format!(
                "Image cutoff {} must exceed ws={}",
                params.extent_sum, ws
            )));
        }

        // Splitting in units of the cell length
        let cell_length = lattice.volume().powf(1. / lattice.ndim() as f64);
        let beta = std::f64::consts::PI.sqrt() * params.beta_scale / cell_length;
        let lattice_sum = LatticeSum::new(
            &lattice,
            2 * lmax,
            ws,
            params.strategy,
            beta,
            params.extent_sum,
        )?;

        let accuracy_warning = if params.validate_lattice_sum {
            let other = match params.strategy {
                MlmStrategy::Ewald => MlmStrategy::Direct,
                MlmStrategy::Direct => MlmStrategy::Ewald,
            };
            let reference =
                LatticeSum::new(&lattice, 2 * lmax, ws, other, beta, params.extent_sum)?;
            lattice_sum
                .check_against(&reference, params.validation_thresh)
                .err()
        } else {
            None
        };

        let n = fmm.charge_distributions.len() as f64;
        let mut cell_centre = [0f64; 3];
        for cd in fmm.charge_distributions.iter() {
            let c = cd.centre();
            for i in 0..3 {
                cell_centre[i] += c[i] / n;
            }
        }

        let images = lattice
            .images(ws as i64)
            .into_iter()
            .filter(|image| image.iter().any(|&i| i != 0))
            .collect::<Vec<_>>();

        let nbasis = fmm.nbasis;
        let ncoeffs = fmm.ncoeffs;
        let image_blocks = images.iter().map(|_| SquareMatrix::new(nbasis)).collect();

        info!(
            "Periodic FMM: {}-D lattice, {} near images, {} nuclei",
            lattice.ndim(),
            images.len(),
            self.nuclei.len()
        );

        Ok(PeriodicFmm {
            fmm,
            lattice,
            nuclei: self.nuclei,
            params,
            lattice_sum,
            accuracy_warning,
            cell_centre,
            images,
            image_blocks,
            far_field: SquareMatrix::new(nbasis),
            cell_multipole: vec![Complex64::zero(); ncoeffs],
            lattice_local: vec![Complex64::zero(); ncoeffs],
            coulomb_energy: 0.,
            far_field_energy: 0.,
            nuclear_repulsion_ff: 0.,
        })
    }
}
