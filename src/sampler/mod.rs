//! Random-vector samplers used to propose candidate points.
//!
//! - [`uniform`] - Independent uniform draws inside a box
//! - [`normal`] - Gaussian draws with a diagonal covariance
//! - [`replay`] - A fixed sequence of points, for reproducible runs

pub mod normal;
pub mod replay;
pub mod uniform;

use std::sync::Arc;

use crate::error::{Error, Result};

pub use normal::Normal;
pub use replay::ReplaySampler;
pub use uniform::Uniform;

/// Draws random points of a fixed dimension.
///
/// Implementations are shared across threads, so `sample` takes `&self`
/// and keeps any generator state behind interior mutability.
pub trait Sampler: Send + Sync {
    /// Number of coordinates in every sample.
    fn dim(&self) -> usize;

    /// Overwrites `x` with one sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `x.len() != self.dim()`, or
    /// any implementation-specific failure to produce a sample.
    fn sample(&self, x: &mut [f64]) -> Result<()>;
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn sample(&self, x: &mut [f64]) -> Result<()> {
        (**self).sample(x)
    }
}

impl<S: Sampler + ?Sized> Sampler for Arc<S> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn sample(&self, x: &mut [f64]) -> Result<()> {
        (**self).sample(x)
    }
}

/// Checks that a destination buffer matches the sampler dimension.
pub(crate) fn check_dim(expected: usize, x: &[f64]) -> Result<()> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected,
            got: x.len(),
        })
    }
}
