//! Utility types for trait definitions.
use std::{fmt, time::Duration};

/// Type to handle FMM related errors
#[derive(Debug)]
pub enum FmmError {
    /// Invalid user supplied configuration, e.g. lattice dimensionality or expansion order
    Configuration(String),

    /// The direct and Ewald lattice sums disagree beyond the requested threshold
    Accuracy {
        /// Largest absolute deviation between the two coefficient sets
        max_deviation: f64,
        /// Threshold the deviation was checked against
        thresh: f64,
    },

    /// Failure to run some business logic
    Failed(String),

    /// I/O failure
    Io(std::io::Error),
}

impl std::fmt::Display for FmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmmError::Configuration(e) => write!(f, "Configuration: {}", e),
            FmmError::Accuracy {
                max_deviation,
                thresh,
            } => write!(
                f,
                "Accuracy: lattice sums deviate by {:e}, threshold {:e}",
                max_deviation, thresh
            ),
            FmmError::Failed(e) => write!(f, "Failed: {}", e),
            FmmError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FmmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FmmError::Io(e) => Some(e),
            FmmError::Configuration(_e) => None,
            FmmError::Accuracy { .. } => None,
            FmmError::Failed(_e) => None,
        }
    }
}

impl From<std::io::Error> for FmmError {
    fn from(value: std::io::Error) -> Self {
        FmmError::Io(value)
    }
}

/// Enumeration of operator types for timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmmOperatorType {
    /// Leaf multipoles from charge distribution moments
    P2M,

    /// Multipole to multipole (level)
    M2M(u64),

    /// Multipole to local (level)
    M2L(u64),

    /// Local to local (level)
    L2L(u64),

    /// Contraction of leaf local expansions
    L2P,

    /// Direct near field evaluation
    P2P,

    /// Periodic images, both near field blocks and the lattice far field
    Lattice,
}

/// Timing of a single operator
#[derive(Debug, Clone, Copy)]
pub struct FmmOperatorTime {
    /// Operator name
    pub operator: FmmOperatorType,

    /// Time in milliseconds
    pub time: u64,
}

impl FmmOperatorTime {
    /// Constructor from a measured duration
    pub fn from_duration(operator: FmmOperatorType, duration: Duration) -> Self {
        Self {
            operator,
            time: duration.as_millis() as u64,
        }
    }
}

impl fmt::Display for FmmOperatorTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} ms", self.operator, self.time)
    }
}
