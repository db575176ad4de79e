//! Process wide numerical tables, initialised once.
use lazy_static::lazy_static;

/// Largest argument of the factorial table, 170! is the last finite `f64` factorial.
pub const MAX_FACTORIAL: usize = 170;

lazy_static! {
    /// `n!` for `n = 0..=MAX_FACTORIAL`.
    pub static ref FACTORIAL: Vec<f64> = {
        let mut out = vec![1.0; MAX_FACTORIAL + 1];
        for n in 1..=MAX_FACTORIAL {
            out[n] = out[n - 1] * n as f64;
        }
        out
    };

    /// `(2n - 1)!!` for `n = 0..=MAX_FACTORIAL / 2`, with `(-1)!! = 1`.
    pub static ref ODD_DOUBLE_FACTORIAL: Vec<f64> = {
        let mut out = vec![1.0; MAX_FACTORIAL / 2 + 1];
        for n in 1..out.len() {
            out[n] = out[n - 1] * (2 * n - 1) as f64;
        }
        out
    };

    /// `Gamma(n + 1/2)` for `n = 0..=MAX_FACTORIAL / 2`.
    pub static ref HALF_INTEGER_GAMMA: Vec<f64> = {
        let mut out = vec![std::f64::consts::PI.sqrt(); MAX_FACTORIAL / 2 + 1];
        for n in 1..out.len() {
            out[n] = out[n - 1] * (n as f64 - 0.5);
        }
        out
    };
}

/// `n!`
#[inline(always)]
pub fn factorial(n: usize) -> f64 {
    FACTORIAL[n]
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tables() {
        assert_eq!(factorial(0), 1.0);
        assert_eq!(factorial(5), 120.0);
        assert!(factorial(MAX_FACTORIAL).is_finite());
        assert_eq!(ODD_DOUBLE_FACTORIAL[3], 15.0);
        assert_relative_eq!(
            HALF_INTEGER_GAMMA[1],
            0.5 * std::f64::consts::PI.sqrt(),
            max_relative = 1e-15
        );
        assert_relative_eq!(
            HALF_INTEGER_GAMMA[3],
            15.0 / 8.0 * std::f64::consts::PI.sqrt(),
            max_relative = 1e-15
        );
    }
}
