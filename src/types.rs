//! Core result types for global optimization runs.

use core::fmt;
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::task::Location;

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    /// The run is still going.
    NotTerminated,
    /// The objective reported success.
    Success,
    /// The driver reported convergence with `MethodDone`.
    MethodConverge,
    /// The objective dropped below the configured threshold.
    FunctionThreshold,
    /// The objective stopped improving.
    FunctionConvergence,
    /// The objective reached negative infinity.
    FunctionNegativeInfinity,
    /// The major-iteration limit was reached.
    IterationLimit,
    /// The runtime limit was reached.
    RuntimeLimit,
    /// The function-evaluation limit was reached.
    FunctionEvaluationLimit,
    /// The run failed.
    Failure,
}

impl Status {
    /// Returns `true` when the status stops the run before any
    /// convergence criterion was met.
    #[must_use]
    pub const fn is_limit(self) -> bool {
        matches!(
            self,
            Self::IterationLimit | Self::RuntimeLimit | Self::FunctionEvaluationLimit
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotTerminated => "not terminated",
            Self::Success => "success",
            Self::MethodConverge => "method converged",
            Self::FunctionThreshold => "function threshold reached",
            Self::FunctionConvergence => "function converged",
            Self::FunctionNegativeInfinity => "function reached negative infinity",
            Self::IterationLimit => "iteration limit reached",
            Self::RuntimeLimit => "runtime limit reached",
            Self::FunctionEvaluationLimit => "function evaluation limit reached",
            Self::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// Counters collected while a run progresses.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stats {
    /// Number of `MajorIteration` reports seen.
    pub major_iterations: usize,
    /// Number of objective evaluations completed.
    pub func_evaluations: usize,
    /// Wall-clock time since the run started.
    pub runtime: Duration,
}

/// The outcome of a run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Solution {
    /// The best location reported by the driver.
    pub location: Location,
    /// Counters at the end of the run.
    pub stats: Stats,
    /// Why the run stopped.
    pub status: Status,
}
