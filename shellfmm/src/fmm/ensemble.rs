//! Implementations of the worker ensemble.
use crate::traits::parallel::Ensemble;

/// The trivial ensemble of a single worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Ensemble for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _buffer: &mut [f64]) {}
}

#[cfg(feature = "mpi")]
mod mpi_ensemble {
    use mpi::{
        collective::{CommunicatorCollectives, SystemOperation},
        topology::SimpleCommunicator,
        traits::Communicator,
    };

    use crate::traits::parallel::Ensemble;

    impl Ensemble for SimpleCommunicator {
        fn rank(&self) -> usize {
            Communicator::rank(self) as usize
        }

        fn size(&self) -> usize {
            Communicator::size(self) as usize
        }

        fn all_reduce_sum(&self, buffer: &mut [f64]) {
            let local = buffer.to_vec();
            self.all_reduce_into(&local[..], buffer, SystemOperation::sum());
        }
    }
}
