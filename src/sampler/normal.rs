//! Gaussian sampling with a diagonal covariance.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::rng_util;
use crate::sampler::{Sampler, check_dim};

/// Samples `x_j = mean_j + std_j * z_j` with independent standard normal `z_j`.
pub struct Normal {
    mean: Vec<f64>,
    std_dev: Vec<f64>,
    rng: Mutex<fastrand::Rng>,
}

impl Normal {
    /// Creates a normal sampler with a default random seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `mean` and `std_dev` differ in
    /// length, and [`Error::InvalidStdDev`] for a negative or non-finite
    /// standard deviation.
    pub fn new(mean: Vec<f64>, std_dev: Vec<f64>) -> Result<Self> {
        Self::build(mean, std_dev, fastrand::Rng::new())
    }

    /// Creates a normal sampler with a fixed seed for reproducibility.
    ///
    /// # Errors
    ///
    /// See [`Normal::new`].
    pub fn with_seed(mean: Vec<f64>, std_dev: Vec<f64>, seed: u64) -> Result<Self> {
        Self::build(mean, std_dev, fastrand::Rng::with_seed(seed))
    }

    fn build(mean: Vec<f64>, std_dev: Vec<f64>, rng: fastrand::Rng) -> Result<Self> {
        if mean.len() != std_dev.len() {
            return Err(Error::DimensionMismatch {
                expected: mean.len(),
                got: std_dev.len(),
            });
        }
        if let Some(&bad) = std_dev.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(Error::InvalidStdDev(bad));
        }
        Ok(Self {
            mean,
            std_dev,
            rng: Mutex::new(rng),
        })
    }

    /// Log density at `x`.
    ///
    /// Coordinates with zero standard deviation are point masses: they
    /// contribute nothing when `x_j` equals the mean and `-∞` otherwise.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn log_prob(&self, x: &[f64]) -> f64 {
        if x.len() != self.mean.len() {
            return f64::NEG_INFINITY;
        }
        let half_ln_2pi = 0.5 * (2.0 * core::f64::consts::PI).ln();
        let mut log_p = 0.0;
        for ((&xi, &mu), &sigma) in x.iter().zip(&self.mean).zip(&self.std_dev) {
            if sigma == 0.0 {
                if xi != mu {
                    return f64::NEG_INFINITY;
                }
                continue;
            }
            let z = (xi - mu) / sigma;
            log_p -= half_ln_2pi + sigma.ln() + 0.5 * z * z;
        }
        log_p
    }
}

impl Sampler for Normal {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn sample(&self, x: &mut [f64]) -> Result<()> {
        check_dim(self.mean.len(), x)?;
        let mut rng = self.rng.lock();
        for ((xi, &mu), &sigma) in x.iter_mut().zip(&self.mean).zip(&self.std_dev) {
            *xi = mu + sigma * rng_util::standard_normal(&mut rng);
        }
        Ok(())
    }
}
