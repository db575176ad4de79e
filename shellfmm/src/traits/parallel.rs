//! Interface to a fixed ensemble of cooperating workers

/// A fixed-size group of workers running the same program, each with a distinct rank.
///
/// Work is distributed round-robin, `index % size == rank`, and partial results are combined with
/// a summing all-reduce.
pub trait Ensemble {
    /// Rank of this worker, in `0..size`.
    fn rank(&self) -> usize;

    /// Number of workers.
    fn size(&self) -> usize;

    /// Sum `buffer` element-wise across all workers, leaving the result on every worker.
    fn all_reduce_sum(&self, buffer: &mut [f64]);

    /// Whether the item at `index` is owned by this worker.
    fn owns(&self, index: usize) -> bool {
        index % self.size() == self.rank()
    }
}
