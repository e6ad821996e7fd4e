//! Deterministic replay of a fixed list of points.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::sampler::{Sampler, check_dim};

/// Returns the given points in order, starting over after the last one.
///
/// Useful for debugging drivers and for runs that must see exactly the same
/// candidates regardless of how many workers take part.
///
/// # Examples
///
/// ```
/// use globalopt::sampler::{ReplaySampler, Sampler};
///
/// let sampler = ReplaySampler::new(vec![vec![5.0], vec![-3.0]]).unwrap();
/// let mut x = [0.0];
/// sampler.sample(&mut x).unwrap();
/// assert_eq!(x, [5.0]);
/// sampler.sample(&mut x).unwrap();
/// assert_eq!(x, [-3.0]);
/// sampler.sample(&mut x).unwrap();
/// assert_eq!(x, [5.0]);
/// ```
pub struct ReplaySampler {
    points: Vec<Vec<f64>>,
    cursor: Mutex<usize>,
}

impl ReplaySampler {
    /// Creates a replay sampler over `points`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySamples`] if `points` is empty and
    /// [`Error::DimensionMismatch`] if the points differ in length.
    pub fn new(points: Vec<Vec<f64>>) -> Result<Self> {
        let dim = points.first().ok_or(Error::EmptySamples)?.len();
        if let Some(bad) = points.iter().find(|p| p.len() != dim) {
            return Err(Error::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }
        Ok(Self {
            points,
            cursor: Mutex::new(0),
        })
    }

    /// Number of samples drawn so far.
    #[must_use]
    pub fn drawn(&self) -> usize {
        *self.cursor.lock()
    }
}

impl Sampler for ReplaySampler {
    fn dim(&self) -> usize {
        self.points[0].len()
    }

    fn sample(&self, x: &mut [f64]) -> Result<()> {
        check_dim(self.dim(), x)?;
        let mut cursor = self.cursor.lock();
        x.copy_from_slice(&self.points[*cursor % self.points.len()]);
        *cursor += 1;
        Ok(())
    }
}
