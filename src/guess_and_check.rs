//! Guess-and-check: the reference global driver.
//!
//! Every free task gets a fresh random point; every evaluation is compared
//! with the incumbent. It is not a good optimizer, but it exercises every
//! branch of the task protocol and is useful for comparison and debugging.

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::sampler::Sampler;
use crate::task::{Action, GlobalMethod, Needs, Operation, Phase, Task, TaskLedger};

/// A global driver that evaluates the objective at random locations and
/// keeps the best one.
///
/// # Examples
///
/// ```
/// use globalopt::sampler::Uniform;
/// use globalopt::{GuessAndCheck, Settings, Status, minimize_global};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> globalopt::Result<()> {
/// let sampler = Uniform::with_seed(vec![(-5.0, 5.0); 2], 42)?;
/// let mut method = GuessAndCheck::new(sampler);
/// let settings = Settings::new().concurrent(2).func_evaluations(200);
///
/// let solution = minimize_global(
///     |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>(),
///     2,
///     &settings,
///     &mut method,
/// )
/// .await?;
///
/// assert_eq!(solution.status, Status::FunctionEvaluationLimit);
/// assert_eq!(solution.location.f, method.best_f());
/// # Ok(())
/// # }
/// ```
pub struct GuessAndCheck<S> {
    sampler: S,
    best_f: f64,
    best_x: Vec<f64>,
    ledger: TaskLedger,
}

impl<S: Sampler> GuessAndCheck<S> {
    /// Creates a driver drawing candidates from `sampler`.
    #[must_use]
    pub fn new(sampler: S) -> Self {
        Self {
            sampler,
            best_f: f64::INFINITY,
            best_x: Vec::new(),
            ledger: TaskLedger::new(0),
        }
    }

    /// The best objective value absorbed so far, `+∞` before the first.
    #[must_use]
    pub fn best_f(&self) -> f64 {
        self.best_f
    }

    /// The point that produced [`best_f`](Self::best_f).
    #[must_use]
    pub fn best_x(&self) -> &[f64] {
        &self.best_x
    }

    /// The sampler candidates are drawn from.
    #[must_use]
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Folds an evaluated task into the incumbent and turns it into the
    /// `MajorIteration` report.
    ///
    /// A strictly better task replaces the incumbent; any other task has its
    /// value and point overwritten with the incumbent's.
    ///
    /// Fails with [`Error::DimensionMismatch`] if the task's point does not
    /// have the dimension given to [`init_global`](GlobalMethod::init_global).
    pub(crate) fn absorb(&mut self, task: &mut Task) -> Result<()> {
        let loc = &mut task.location;
        self.check_dim(&loc.x)?;
        if loc.f < self.best_f {
            self.best_f = loc.f;
            self.best_x.copy_from_slice(&loc.x);
            trace_debug!(index = task.index, best_f = self.best_f, "new incumbent");
        } else {
            loc.f = self.best_f;
            loc.x.copy_from_slice(&self.best_x);
        }
        task.op = Operation::MajorIteration;
        Ok(())
    }

    fn check_dim(&self, x: &[f64]) -> Result<()> {
        if x.len() == self.best_x.len() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.best_x.len(),
                got: x.len(),
            })
        }
    }

    async fn send_new_loc(&mut self, operation: &mpsc::Sender<Task>, mut task: Task) -> Result<()> {
        self.sampler.sample(&mut task.location.x)?;
        task.op = Operation::FuncEvaluation;
        self.dispatch(operation, task).await
    }

    async fn update_major(&mut self, operation: &mpsc::Sender<Task>, mut task: Task) -> Result<()> {
        self.absorb(&mut task)?;
        self.dispatch(operation, task).await
    }

    async fn dispatch(&mut self, operation: &mpsc::Sender<Task>, task: Task) -> Result<()> {
        self.ledger.dispatch(task.index, task.op)?;
        operation
            .send(task)
            .await
            .map_err(|_| Error::OperationsClosed)
    }

    /// Checks a received task against the protocol and the ledger.
    fn accept(&mut self, phase: Phase, task: &Task) -> Result<Action> {
        let action = phase.classify(task.op)?;
        if action != Action::Finish {
            self.ledger.receive(task.index, task.op)?;
        }
        Ok(action)
    }
}

impl<S: Sampler> GlobalMethod for GuessAndCheck<S> {
    fn needs(&self) -> Needs {
        Needs {
            gradient: false,
            hessian: false,
        }
    }

    fn init_global(&mut self, dim: usize, tasks: usize) -> usize {
        self.best_f = f64::INFINITY;
        self.best_x.clear();
        self.best_x.resize(dim, 0.0);
        tasks
    }

    async fn run_global(
        &mut self,
        operation: mpsc::Sender<Task>,
        mut result: mpsc::Receiver<Task>,
        tasks: Vec<Task>,
    ) -> Result<()> {
        self.ledger = TaskLedger::new(tasks.len());
        for task in &tasks {
            self.check_dim(&task.location.x)?;
        }
        for (i, mut task) in tasks.into_iter().enumerate() {
            task.index = i + 1;
            self.send_new_loc(&operation, task).await?;
        }

        loop {
            let Some(task) = result.recv().await else {
                return Err(Error::ResultsClosed);
            };
            match self.accept(Phase::Active, &task)? {
                Action::Finish => break,
                Action::Refill => self.send_new_loc(&operation, task).await?,
                Action::Absorb => self.update_major(&operation, task).await?,
                Action::Ignore => {}
            }
        }
        trace_debug!(in_flight = self.ledger.in_flight(), "draining");

        while let Some(task) = result.recv().await {
            if self.accept(Phase::Draining, &task)? == Action::Absorb {
                self.update_major(&operation, task).await?;
            }
        }

        trace_info!(best_f = self.best_f, "run finished");
        drop(operation);
        Ok(())
    }
}
