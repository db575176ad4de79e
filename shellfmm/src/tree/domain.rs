//! Constructor for a Domain.
use crate::tree::{
    constants::BOX_SIZE_FACTOR,
    types::Domain,
};

impl Domain {
    /// Compute the domain enclosing a set of centres. The domain is a cube about the origin whose
    /// side is slightly more than twice the largest absolute coordinate, so that no centre lies on
    /// its edge.
    ///
    /// # Arguments
    /// * `centres` - Charge distribution centres.
    /// * `ns` - Number of binary subdivisions at the finest level.
    pub fn from_local_points(centres: &[[f64; 3]], ns: u64) -> Domain {
        let radius = centres
            .iter()
            .flat_map(|c| c.iter())
            .fold(0f64, |acc, x| acc.max(x.abs()));

        // All centres at the origin
        let radius = if radius > 0. { radius } else { 1. };

        let box_size = BOX_SIZE_FACTOR * radius;
        let unit_size = box_size / (1u64 << ns) as f64;

        Domain {
            box_size,
            unit_size,
            ns,
        }
    }

    /// Number of grid cells per axis at the finest level.
    pub fn n_cells(&self) -> i64 {
        1i64 << self.ns
    }

    /// Finest level grid index of a point, in `0..=n_cells` along each axis.
    pub fn key(&self, point: &[f64; 3]) -> [i64; 3] {
        let half = self.n_cells() / 2;
        let mut key = [0i64; 3];
        for (k, x) in key.iter_mut().zip(point.iter()) {
            let cell = (x.abs() / self.unit_size).floor() as i64;
            *k = if *x >= 0. { cell + half } else { half - cell };
        }
        key
    }
}
