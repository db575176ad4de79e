//! Evaluation of the shell pair FMM
use log::debug;
use num::Zero;
use num_complex::Complex64;

use crate::{
    fmm::{helpers::optionally_time, types::ShellFmm},
    traits::{
        charge::{ChargeDistribution, NearField},
        fmm::{
            Evaluate, SourceToTargetTranslation, SourceTranslation, TargetTranslation,
        },
        parallel::Ensemble,
        tree::SingleTree,
        types::{FmmError, FmmOperatorTime, FmmOperatorType},
    },
};

impl<C, N, E> ShellFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    pub(crate) fn record(&mut self, operator: FmmOperatorType, duration: Option<std::time::Duration>) {
        if let Some(d) = duration {
            let time = FmmOperatorTime::from_duration(operator, d);
            debug!("{}", time);
            self.operator_times.push(time);
        }
    }
}

impl<C, N, E> Evaluate for ShellFmm<C, N, E>
where
    C: ChargeDistribution,
    N: NearField<C>,
    E: Ensemble,
{
    #[inline(always)]
    fn evaluate_leaf_sources(&mut self) -> Result<(), FmmError> {
        let (result, duration) = optionally_time(self.timed, || self.p2m());

        result?;
        self.record(FmmOperatorType::P2M, duration);

        Ok(())
    }

    #[inline(always)]
    fn evaluate_upward_pass(&mut self) -> Result<(), FmmError> {
        for level in 1..=self.tree.depth() {
            let (result, duration) = optionally_time(self.timed, || self.m2m(level));

            result?;
            self.record(FmmOperatorType::M2M(level), duration);
        }

        Ok(())
    }

    #[inline(always)]
    fn evaluate_downward_pass(&mut self) -> Result<(), FmmError> {
        self.locals.iter_mut().for_each(|l| *l = Complex64::zero());

        let depth = self.tree.depth();
        for level in (0..=depth).rev() {
            if level < depth {
                let (result, duration) = optionally_time(self.timed, || self.l2l(level));

                result?;
                self.record(FmmOperatorType::L2L(level), duration);
            }

            let (result, duration) = optionally_time(self.timed, || self.m2l(level));

            result?;
            self.record(FmmOperatorType::M2L(level), duration);
        }

        Ok(())
    }

    #[inline(always)]
    fn evaluate_leaf_targets(&mut self) -> Result<(), FmmError> {
        self.coulomb.fill_zero();

        let (result, duration) = optionally_time(self.timed, || self.p2p());

        result?;
        self.record(FmmOperatorType::P2P, duration);

        if self.far_field {
            let (result, duration) = optionally_time(self.timed, || self.l2p());

            result?;
            self.record(FmmOperatorType::L2P, duration);
        }

        // Each worker holds the rows of its own leaves
        if self.ensemble.size() > 1 {
            self.ensemble.all_reduce_sum(self.coulomb.data_mut());
        }

        self.energy = 0.5 * self.coulomb.dot(&self.density);
        Ok(())
    }

    fn evaluate(&mut self) -> Result<(), FmmError> {
        self.operator_times.clear();

        if self.far_field {
            self.evaluate_leaf_sources()?;
            self.evaluate_upward_pass()?;
            self.evaluate_downward_pass()?;
        }
        self.evaluate_leaf_targets()?;

        debug!("Coulomb energy {:.12}", self.energy);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use approx::assert_relative_eq;
    use statrs::function::erf::erf;

    use super::*;
    use crate::{
        charges::{GaussianCharge, GaussianNearField, PointCharge, PointNearField},
        expansion::conj_regular,
        fmm::{
            ensemble::test::ThreadEnsemble,
            types::{FmmBuilder, FmmParameters, SquareMatrix},
        },
        traits::fmm::Fmm,
        tree::helpers::{charges_fixture, cube_corners, distance, points_fixture},
    };

    fn point_charges(positions: &[[f64; 3]], charges: &[f64]) -> Vec<PointCharge> {
        positions
            .iter()
            .zip(charges.iter())
            .enumerate()
            .map(|(i, (&x, &q))| PointCharge::new(q, x, i))
            .collect()
    }

    fn point_fmm(
        charges: Vec<PointCharge>,
        params: FmmParameters,
    ) -> ShellFmm<PointCharge, PointNearField> {
        let n = charges.len();
        FmmBuilder::new()
            .charge_distributions(charges)
            .unwrap()
            .parameters(params)
            .unwrap()
            .near_field(PointNearField)
            .density(SquareMatrix::identity(n))
            .unwrap()
            .build()
            .unwrap()
    }

    /// Potential energy of each point charge due to all others.
    fn brute_force(charges: &[PointCharge]) -> Vec<f64> {
        charges
            .iter()
            .map(|a| {
                charges
                    .iter()
                    .filter(|b| b.offset != a.offset)
                    .map(|b| a.charge * b.charge / distance(&a.position, &b.position))
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_cube_corners() {
        let corners = cube_corners(1.0);
        let expected = 12. / 2. + 12. / (2. * 2f64.sqrt()) + 4. / (2. * 3f64.sqrt());
        assert_relative_eq!(expected, 11.397341225498534, epsilon = 1e-12);

        for ns in [1, 2] {
            let params = FmmParameters {
                lmax: 4,
                ns,
                ws: 1,
                ..Default::default()
            };
            let mut fmm = point_fmm(point_charges(&corners, &[1.; 8]), params);
            fmm.evaluate().unwrap();

            // A single subdivision puts every corner in one cell
            let n_leaves = if ns == 1 { 1 } else { 8 };
            assert_eq!(fmm.tree.n_leaves(), n_leaves);
            assert_eq!(fmm.far_field, ns == 2);
            assert_relative_eq!(fmm.energy(), expected, max_relative = 1e-13);
        }
    }

    #[test]
    fn test_well_separated_gaussians() {
        let exponent = 10.;
        let charges = vec![
            GaussianCharge::new(1., exponent, [-5., 0., 0.], 0),
            GaussianCharge::new(1., exponent, [5., 0., 0.], 1),
        ];
        let params = FmmParameters {
            lmax: 10,
            ns: 2,
            ws: 1,
            ..Default::default()
        };

        let mut fmm = FmmBuilder::new()
            .charge_distributions(charges.clone())
            .unwrap()
            .parameters(params)
            .unwrap()
            .near_field(GaussianNearField)
            .density(SquareMatrix::identity(2))
            .unwrap()
            .build()
            .unwrap();
        fmm.evaluate().unwrap();

        assert!(fmm.tree.do_far_field());
        assert!(!fmm.tree.finest_level_has_interactions());

        let p = exponent / 2.;
        let self_energy = (2. * exponent / std::f64::consts::PI).sqrt();
        let expected = self_energy + erf(p.sqrt() * 10.) / 10.;
        assert_relative_eq!(fmm.energy(), expected, max_relative = 1e-6);
        assert_relative_eq!(fmm.coulomb()[[0, 0]], fmm.coulomb()[[1, 1]], epsilon = 1e-14);
    }

    #[test]
    fn test_gaussian_cluster() {
        let charges = vec![
            GaussianCharge::new(1.0, 10., [-6., 0., 0.], 0),
            GaussianCharge::new(0.5, 10., [-5., 0.5, 0.], 1),
            GaussianCharge::new(-0.7, 10., [6., 0., 0.], 2),
        ];
        let params = FmmParameters {
            lmax: 10,
            ns: 2,
            ws: 1,
            ..Default::default()
        };

        let mut fmm = FmmBuilder::new()
            .charge_distributions(charges.clone())
            .unwrap()
            .parameters(params)
            .unwrap()
            .near_field(GaussianNearField)
            .density(SquareMatrix::identity(3))
            .unwrap()
            .build()
            .unwrap();
        fmm.evaluate().unwrap();
        assert!(fmm.far_field);

        for (i, a) in charges.iter().enumerate() {
            let expected: f64 = charges
                .iter()
                .map(|b| GaussianNearField.coulomb(a, b)[0])
                .sum();
            assert_relative_eq!(fmm.coulomb()[[i, i]], expected, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_random_point_charges() {
        let n = 60;
        let positions = points_fixture(n, Some(-1.0), Some(1.0), Some(3));
        let q = charges_fixture(n, 0.1, 1.0, Some(4));
        let charges = point_charges(&positions, &q);
        let params = FmmParameters {
            lmax: 12,
            ns: 3,
            ws: 2,
            ..Default::default()
        };

        let mut fmm = point_fmm(charges.clone(), params);
        fmm.evaluate().unwrap();
        assert!(fmm.tree.do_far_field());

        let expected = brute_force(&charges);
        for (i, e) in expected.iter().enumerate() {
            assert_relative_eq!(fmm.coulomb()[[i, i]], *e, max_relative = 1e-5);
        }
        assert_relative_eq!(
            fmm.energy(),
            0.5 * expected.iter().sum::<f64>(),
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_clear_and_reevaluate() {
        let _ = env_logger::builder().is_test(true).try_init();

        let n = 30;
        let positions = points_fixture(n, Some(-1.0), Some(1.0), Some(5));
        let charges = point_charges(&positions, &vec![1.; n]);
        let params = FmmParameters {
            lmax: 8,
            ns: 2,
            ws: 1,
            ..Default::default()
        };

        let mut fmm = point_fmm(charges, params);
        fmm.timed = true;
        fmm.evaluate().unwrap();
        let energy = fmm.energy();
        assert!(!fmm.operator_times.is_empty());

        let mut density = SquareMatrix::identity(n);
        density.data_mut().iter_mut().for_each(|d| *d *= 2.);
        fmm.clear(&density).unwrap();
        assert_eq!(fmm.energy(), 0.);
        fmm.evaluate().unwrap();
        assert_relative_eq!(fmm.energy(), 4. * energy, max_relative = 1e-12);

        assert!(matches!(
            fmm.clear(&SquareMatrix::identity(n + 1)),
            Err(FmmError::Configuration(_))
        ));
    }

    #[test]
    fn test_schwarz_screening() {
        let charges = vec![
            GaussianCharge::new(1., 1., [0., 0., 0.], 0),
            GaussianCharge::new(1., 1., [0., 0., 0.5], 1),
        ];

        let build = |thresh: f64| {
            let mut fmm = FmmBuilder::new()
                .charge_distributions(charges.clone())
                .unwrap()
                .parameters(FmmParameters {
                    ns: 1,
                    thresh,
                    ..Default::default()
                })
                .unwrap()
                .near_field(GaussianNearField)
                .density(SquareMatrix::identity(2))
                .unwrap()
                .build()
                .unwrap();
            fmm.evaluate().unwrap();
            fmm.energy()
        };

        assert!(build(1e-10) > 0.);
        assert_eq!(build(10.), 0.);
    }

    #[test]
    fn test_thread_ensemble_matches_serial() {
        let n = 50;
        let positions = points_fixture(n, Some(-1.0), Some(1.0), Some(7));
        let q = charges_fixture(n, -1.0, 1.0, Some(8));
        let charges = point_charges(&positions, &q);
        let params = FmmParameters {
            lmax: 8,
            ns: 3,
            ws: 1,
            ..Default::default()
        };

        let mut serial = point_fmm(charges.clone(), params);
        serial.evaluate().unwrap();

        let handles: Vec<_> = ThreadEnsemble::group(3)
            .into_iter()
            .map(|ensemble| {
                let charges = charges.clone();
                thread::spawn(move || {
                    let mut fmm = FmmBuilder::new()
                        .charge_distributions(charges)
                        .unwrap()
                        .parameters(params)
                        .unwrap()
                        .near_field(PointNearField)
                        .density(SquareMatrix::identity(n))
                        .unwrap()
                        .ensemble(ensemble)
                        .build()
                        .unwrap();
                    fmm.evaluate().unwrap();
                    (fmm.coulomb.clone(), fmm.energy)
                })
            })
            .collect();

        for handle in handles {
            let (coulomb, energy) = handle.join().unwrap();
            for (a, b) in coulomb.data().iter().zip(serial.coulomb().data()) {
                assert_relative_eq!(a, b, epsilon = 1e-12, max_relative = 1e-12);
            }
            assert_relative_eq!(energy, serial.energy(), max_relative = 1e-12);
        }
    }

    /// A unit point charge standing for the product of two basis functions.
    #[derive(Clone)]
    struct PointPair {
        offsets: [usize; 2],
        position: [f64; 3],
    }

    impl ChargeDistribution for PointPair {
        fn centre(&self) -> [f64; 3] {
            self.position
        }

        fn extent(&self) -> f64 {
            0.
        }

        fn offsets(&self) -> [usize; 2] {
            self.offsets
        }

        fn sizes(&self) -> [usize; 2] {
            [1, 1]
        }

        fn multipoles(&self, centre: &[f64; 3], lmax: usize) -> Vec<Complex64> {
            let v = [
                self.position[0] - centre[0],
                self.position[1] - centre[1],
                self.position[2] - centre[2],
            ];
            conj_regular(&v, lmax)
        }

        fn translate(&self, shift: &[f64; 3]) -> Self {
            let mut out = self.clone();
            for i in 0..3 {
                out.position[i] += shift[i];
            }
            out
        }
    }

    struct PointPairNearField;

    impl NearField<PointPair> for PointPairNearField {
        fn coulomb(&self, bra: &PointPair, ket: &PointPair) -> Vec<f64> {
            let r = distance(&bra.position, &ket.position);
            if r < 1e-14 {
                vec![0.]
            } else {
                vec![1. / r]
            }
        }
    }

    #[test]
    fn test_off_diagonal_pairs() {
        let nbasis = 6;
        let pairs: Vec<[usize; 2]> = (0..nbasis)
            .flat_map(|i| (i..nbasis).map(move |j| [i, j]))
            .collect();
        let positions = points_fixture(pairs.len(), Some(-2.0), Some(2.0), Some(11));
        let charge_distributions: Vec<PointPair> = pairs
            .iter()
            .zip(positions.iter())
            .map(|(&offsets, &position)| PointPair { offsets, position })
            .collect();

        let values = charges_fixture(nbasis * nbasis, -1.0, 1.0, Some(12));
        let symmetric = (0..nbasis * nbasis)
            .map(|k| {
                let (i, j) = (k % nbasis, k / nbasis);
                values[i.max(j) * nbasis + i.min(j)]
            })
            .collect();
        let density = SquareMatrix::from_vec(nbasis, symmetric).unwrap();

        let mut fmm = FmmBuilder::new()
            .charge_distributions(charge_distributions.clone())
            .unwrap()
            .parameters(FmmParameters {
                lmax: 14,
                ns: 2,
                ws: 2,
                ..Default::default()
            })
            .unwrap()
            .near_field(PointPairNearField)
            .density(density.clone())
            .unwrap()
            .build()
            .unwrap();
        fmm.evaluate().unwrap();

        // Sum over both orderings of every source pair
        let mut expected = SquareMatrix::new(nbasis);
        for a in charge_distributions.iter() {
            let mut value = 0.;
            for b in charge_distributions.iter() {
                let [k, l] = b.offsets;
                let weight = if k == l { 1. } else { 2. };
                value += weight * density[[k, l]] * PointPairNearField.coulomb(a, b)[0];
            }
            let [i, j] = a.offsets;
            expected[[i, j]] = value;
            expected[[j, i]] = value;
        }

        for (a, b) in fmm.coulomb().data().iter().zip(expected.data()) {
            assert_relative_eq!(a, b, epsilon = 1e-6, max_relative = 1e-6);
        }
        assert_relative_eq!(
            fmm.energy(),
            0.5 * expected.dot(&density),
            epsilon = 1e-6,
            max_relative = 1e-6
        );
    }
}
