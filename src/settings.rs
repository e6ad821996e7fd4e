//! Run configuration and termination criteria.

use core::time::Duration;

use crate::types::Status;

/// Stops a run once the objective has not improved enough for a number of
/// consecutive major iterations.
///
/// An iteration counts as an improvement when the reported value drops by
/// more than `absolute`, or by more than `relative` times the magnitude of
/// the best value so far.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionConverge {
    absolute: f64,
    relative: f64,
    iterations: usize,
    best: Option<f64>,
    stalled: usize,
}

impl FunctionConverge {
    /// Creates a criterion with an absolute tolerance over `iterations`
    /// stalled major iterations. `iterations == 0` disables it.
    #[must_use]
    pub fn new(absolute: f64, iterations: usize) -> Self {
        Self {
            absolute,
            relative: 0.0,
            iterations,
            best: None,
            stalled: 0,
        }
    }

    /// Sets the relative tolerance.
    #[must_use]
    pub fn relative(mut self, relative: f64) -> Self {
        self.relative = relative;
        self
    }

    /// Forgets any previously seen values.
    pub fn init(&mut self) {
        self.best = None;
        self.stalled = 0;
    }

    /// Feeds one reported value and returns the resulting status.
    pub fn converged(&mut self, f: f64) -> Status {
        if self.iterations == 0 {
            return Status::NotTerminated;
        }
        let Some(best) = self.best else {
            self.best = Some(f);
            return Status::NotTerminated;
        };
        let gain = best - f;
        let improved = (self.absolute > 0.0 && gain > self.absolute)
            || (self.relative > 0.0 && gain > self.relative * best.abs());
        if improved {
            self.best = Some(f);
            self.stalled = 0;
            return Status::NotTerminated;
        }
        self.stalled += 1;
        if self.stalled < self.iterations {
            Status::NotTerminated
        } else {
            Status::FunctionConvergence
        }
    }
}

/// Settings for [`minimize_global`](crate::minimize_global).
///
/// Zero-valued limits are disabled.
///
/// # Defaults
///
/// - Function threshold: `-∞`
/// - Function convergence: absolute `1e-10` over 100 iterations
/// - Concurrency: available parallelism
/// - Iteration, evaluation and runtime limits: none
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use globalopt::Settings;
///
/// let settings = Settings::new()
///     .concurrent(4)
///     .func_evaluations(1_000)
///     .runtime(Duration::from_secs(5));
///
/// assert_eq!(settings.concurrency(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    pub(crate) function_threshold: f64,
    pub(crate) function_converge: Option<FunctionConverge>,
    pub(crate) major_iterations: usize,
    pub(crate) func_evaluations: usize,
    pub(crate) runtime: Option<Duration>,
    pub(crate) concurrent: usize,
}

impl Settings {
    /// Creates settings with the defaults listed above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            function_threshold: f64::NEG_INFINITY,
            function_converge: Some(FunctionConverge::new(1e-10, 100)),
            major_iterations: 0,
            func_evaluations: 0,
            runtime: None,
            concurrent: std::thread::available_parallelism().map_or(1, usize::from),
        }
    }

    /// Stop once a reported value is below `threshold`.
    #[must_use]
    pub fn function_threshold(mut self, threshold: f64) -> Self {
        self.function_threshold = threshold;
        self
    }

    /// Replace the function-convergence criterion; `None` disables it.
    #[must_use]
    pub fn function_converge(mut self, converge: Option<FunctionConverge>) -> Self {
        self.function_converge = converge;
        self
    }

    /// Stop after `n` major iterations.
    #[must_use]
    pub fn major_iterations(mut self, n: usize) -> Self {
        self.major_iterations = n;
        self
    }

    /// Stop after `n` function evaluations.
    #[must_use]
    pub fn func_evaluations(mut self, n: usize) -> Self {
        self.func_evaluations = n;
        self
    }

    /// Stop once the run has lasted `limit`.
    #[must_use]
    pub fn runtime(mut self, limit: Duration) -> Self {
        self.runtime = Some(limit);
        self
    }

    /// Number of concurrent evaluation tasks offered to the driver.
    #[must_use]
    pub fn concurrent(mut self, n: usize) -> Self {
        self.concurrent = n;
        self
    }

    /// The concurrency that will be requested, treating 0 as 1.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrent.max(1)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
