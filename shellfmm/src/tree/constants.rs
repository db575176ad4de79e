//! Crate wide constants for box trees

/// Ratio of the domain side length to the largest absolute centre coordinate.
pub const BOX_SIZE_FACTOR: f64 = 2.05;

/// Maximum number of subdivisions of the domain at the finest level.
pub const MAX_SUBDIVISIONS: u64 = 16;
