//! Uniform sampling inside an axis-aligned box.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::rng_util;
use crate::sampler::{Sampler, check_dim};

/// Samples each coordinate independently and uniformly from `[low, high)`.
///
/// # Examples
///
/// ```
/// use globalopt::sampler::{Sampler, Uniform};
///
/// let sampler = Uniform::with_seed(vec![(-1.0, 1.0), (0.0, 10.0)], 42).unwrap();
/// let mut x = [0.0; 2];
/// sampler.sample(&mut x).unwrap();
///
/// assert!((-1.0..1.0).contains(&x[0]));
/// assert!((0.0..10.0).contains(&x[1]));
/// ```
pub struct Uniform {
    bounds: Vec<(f64, f64)>,
    rng: Mutex<fastrand::Rng>,
}

impl Uniform {
    /// Creates a uniform sampler with a default random seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if any `low > high` or a bound is
    /// not finite.
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self> {
        Self::build(bounds, fastrand::Rng::new())
    }

    /// Creates a uniform sampler with a fixed seed for reproducibility.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if any `low > high` or a bound is
    /// not finite.
    pub fn with_seed(bounds: Vec<(f64, f64)>, seed: u64) -> Result<Self> {
        Self::build(bounds, fastrand::Rng::with_seed(seed))
    }

    /// Creates a sampler over the unit hypercube `[0, 1)^dim`.
    #[must_use]
    pub fn unit(dim: usize) -> Self {
        Self {
            bounds: vec![(0.0, 1.0); dim],
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    fn build(bounds: Vec<(f64, f64)>, rng: fastrand::Rng) -> Result<Self> {
        for &(low, high) in &bounds {
            if !(low.is_finite() && high.is_finite()) || low > high {
                return Err(Error::InvalidBounds { low, high });
            }
        }
        Ok(Self {
            bounds,
            rng: Mutex::new(rng),
        })
    }

    /// The per-coordinate bounds.
    #[must_use]
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Log density of the distribution at `x`.
    ///
    /// Returns `-∞` outside the box. Degenerate coordinates (`low == high`)
    /// are treated as point masses and contribute nothing.
    #[must_use]
    pub fn log_prob(&self, x: &[f64]) -> f64 {
        if x.len() != self.bounds.len() {
            return f64::NEG_INFINITY;
        }
        let mut log_p = 0.0;
        for (&xi, &(low, high)) in x.iter().zip(&self.bounds) {
            if xi < low || xi > high {
                return f64::NEG_INFINITY;
            }
            if high > low {
                log_p -= (high - low).ln();
            }
        }
        log_p
    }
}

impl Sampler for Uniform {
    fn dim(&self) -> usize {
        self.bounds.len()
    }

    fn sample(&self, x: &mut [f64]) -> Result<()> {
        check_dim(self.bounds.len(), x)?;
        let mut rng = self.rng.lock();
        for (xi, &(low, high)) in x.iter_mut().zip(&self.bounds) {
            *xi = rng_util::f64_range(&mut rng, low, high);
        }
        Ok(())
    }
}
