//! Crate wide constants

/// Largest supported expansion order, bounded by the lattice sum root table at rank `2 lmax + 1`.
pub const MAX_EXPANSION_ORDER: usize = 25;

/// Default expansion order.
pub const DEFAULT_EXPANSION_ORDER: usize = 10;

/// Default number of binary subdivisions of the domain at the finest level.
pub const DEFAULT_SUBDIVISIONS: u64 = 4;

/// Default well-separateness parameter.
pub const DEFAULT_WS: u64 = 1;

/// Default Schwarz screening threshold for near field blocks.
pub const DEFAULT_THRESH: f64 = 1e-10;

/// Default image cutoff of the Ewald real and reciprocal space sums.
pub const DEFAULT_EXTENT_SUM: i64 = 5;

/// Default largest tolerated deviation between the direct and Ewald lattice sums.
pub const DEFAULT_VALIDATION_THRESH: f64 = 1e-3;
