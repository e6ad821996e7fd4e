//! The [`Objective`] trait defines what gets minimized.
//!
//! Plain closures work directly:
//!
//! ```
//! use globalopt::Objective;
//!
//! let sphere = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
//! assert_eq!(sphere.evaluate(&[3.0, 4.0]), 25.0);
//! ```
//!
//! Implement the trait on a struct to add a problem-specific stopping rule
//! through [`Objective::status`].

use crate::types::Status;

/// A scalar function to be minimized.
///
/// Objectives are evaluated concurrently on blocking worker threads, so they
/// must be `Send + Sync + 'static`.
pub trait Objective: Send + Sync + 'static {
    /// Objective value at `x`.
    fn evaluate(&self, x: &[f64]) -> f64;

    /// Checked after every evaluation. Returning anything other than
    /// [`Status::NotTerminated`] ends the run with that status.
    ///
    /// Default: never terminates.
    fn status(&self) -> Status {
        Status::NotTerminated
    }
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
{
    fn evaluate(&self, x: &[f64]) -> f64 {
        self(x)
    }
}
