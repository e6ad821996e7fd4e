//! The worker-pool side of the task protocol.
//!
//! [`minimize_global`] runs a [`GlobalMethod`] against an [`Objective`].
//! Three pieces cooperate:
//!
//! - the *distributor* reads tasks from the driver, hands evaluations to the
//!   workers and forwards reports to the combiner;
//! - the *workers* evaluate the objective on blocking threads and pass the
//!   results to the combiner;
//! - the *combiner* updates statistics, checks termination, and returns
//!   every task to the driver.
//!
//! Shutdown runs in this order. The combiner sends `PostIteration` to the
//! driver and fires `done`. The distributor closes the worker queue, so no
//! new evaluation starts. Workers finish what they hold and sign off; when
//! the last one has, the combiner closes the result channel. The driver
//! absorbs the remaining results, sends its final reports and closes the
//! operation channel. The distributor forwards those reports and exits,
//! which closes the combiner's queue and ends the run.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::objective::Objective;
use crate::settings::{FunctionConverge, Settings};
use crate::task::{GlobalMethod, Location, Operation, Phase, Task};
use crate::types::{Solution, Stats, Status};

/// Messages flowing into the combiner.
enum StatsMessage {
    /// A worker finished evaluating a task.
    Evaluated(Task),
    /// The driver sent a non-evaluation task.
    Report(Task),
    /// A worker's evaluation panicked.
    WorkerFailed(String),
    /// A worker has exited.
    WorkerDone,
}

/// Minimizes `objective` over a `dim`-dimensional space with `method`.
///
/// The method is initialized with `dim` and the configured concurrency, and
/// then run until a termination criterion from `settings` fires. The
/// returned [`Solution`] holds the last location the method reported, which
/// is the incumbent for well-behaved methods.
///
/// # Errors
///
/// - [`Error::InvalidDimension`] if `dim == 0`.
/// - [`Error::UnsupportedNeeds`] if the method requires derivatives.
/// - [`Error::InvalidTaskCount`] if the method asks for zero tasks or more
///   than offered.
/// - [`Error::ProtocolViolation`] if the method sends an operation the
///   runner does not accept, or any error the method itself returns.
/// - [`Error::TaskError`] if an evaluation panics.
/// - [`Error::DimensionMismatch`] if the method reports a point of the
///   wrong dimension.
pub async fn minimize_global<O, M>(
    objective: O,
    dim: usize,
    settings: &Settings,
    method: &mut M,
) -> Result<Solution>
where
    O: Objective,
    M: GlobalMethod,
{
    let start = Instant::now();
    if dim == 0 {
        return Err(Error::InvalidDimension);
    }
    let needs = method.needs();
    if needs.gradient || needs.hessian {
        return Err(Error::UnsupportedNeeds {
            gradient: needs.gradient,
            hessian: needs.hessian,
        });
    }

    let requested = settings.concurrency();
    let n_tasks = method.init_global(dim, requested);
    if n_tasks == 0 || n_tasks > requested {
        return Err(Error::InvalidTaskCount {
            requested,
            returned: n_tasks,
        });
    }

    let run = drive(objective, dim, n_tasks, settings, method, start);
    #[cfg(feature = "tracing")]
    let run = tracing::Instrument::instrument(
        run,
        tracing::info_span!("minimize_global", dim, n_tasks),
    );
    run.await
}

/// Wires up the channels and tasks of one run and waits for it to finish.
async fn drive<O, M>(
    objective: O,
    dim: usize,
    n_tasks: usize,
    settings: &Settings,
    method: &mut M,
    start: Instant,
) -> Result<Solution>
where
    O: Objective,
    M: GlobalMethod,
{
    trace_info!(dim, n_tasks, "starting global optimization");

    let (operation_tx, operation_rx) = mpsc::channel(n_tasks);
    // One extra slot so the PostIteration sentinel never blocks.
    let (result_tx, result_rx) = mpsc::channel(n_tasks + 1);
    let (worker_tx, worker_rx) = mpsc::channel(n_tasks);
    let (stats_tx, stats_rx) = mpsc::channel(n_tasks);
    let (done_tx, done_rx) = oneshot::channel();

    let distributor = tokio::spawn(distribute(operation_rx, worker_tx, stats_tx.clone(), done_rx));

    let objective = Arc::new(objective);
    let worker_rx = Arc::new(Mutex::new(worker_rx));
    let workers: Vec<JoinHandle<()>> = (0..n_tasks)
        .map(|_| {
            tokio::spawn(work(
                Arc::clone(&objective),
                Arc::clone(&worker_rx),
                stats_tx.clone(),
            ))
        })
        .collect();
    drop(stats_tx);

    let tasks = (0..n_tasks).map(|_| Task::new(dim)).collect();
    let mut combiner = Combiner {
        objective: &*objective,
        settings,
        converger: settings.function_converge.clone(),
        stats: Stats::default(),
        opt_loc: Location::new(dim),
        start,
        n_tasks,
        workers_done: 0,
        status: Status::NotTerminated,
        error: None,
        results: Some(result_tx),
        done: Some(done_tx),
    };
    if let Some(converger) = combiner.converger.as_mut() {
        converger.init();
    }

    let (method_outcome, ()) = tokio::join!(
        method.run_global(operation_tx, result_rx, tasks),
        combiner.run(stats_rx),
    );

    let distributor_outcome = distributor
        .await
        .map_err(|e| Error::TaskError(e.to_string()))?;
    for worker in workers {
        worker.await.map_err(|e| Error::TaskError(e.to_string()))?;
    }
    distributor_outcome?;
    method_outcome?;
    if let Some(error) = combiner.error {
        return Err(error);
    }

    combiner.stats.runtime = start.elapsed();
    trace_info!(
        status = %combiner.status,
        f = combiner.opt_loc.f,
        func_evaluations = combiner.stats.func_evaluations,
        "global optimization finished"
    );
    Ok(Solution {
        location: combiner.opt_loc,
        stats: combiner.stats,
        status: combiner.status,
    })
}

/// Routes tasks from the driver to the workers or the combiner.
async fn distribute(
    mut operations: mpsc::Receiver<Task>,
    workers: mpsc::Sender<Task>,
    stats: mpsc::Sender<StatsMessage>,
    mut done: oneshot::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            next = operations.recv() => {
                // The driver stopped early; its own error explains why.
                let Some(task) = next else { return Ok(()) };
                match task.op {
                    Operation::NoOperation | Operation::MajorIteration | Operation::MethodDone => {
                        if stats.send(StatsMessage::Report(task)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Operation::FuncEvaluation => {
                        if workers.send(task).await.is_err() {
                            return Ok(());
                        }
                    }
                    op @ (Operation::InitIteration
                    | Operation::PostIteration
                    | Operation::GradEvaluation
                    | Operation::HessEvaluation) => {
                        return Err(Error::ProtocolViolation {
                            op,
                            phase: Phase::Active,
                        });
                    }
                }
            }
            _ = &mut done => break,
        }
    }

    // No evaluation starts after this point.
    drop(workers);
    trace_debug!("distributor draining");
    while let Some(task) = operations.recv().await {
        if task.op == Operation::MajorIteration
            && stats.send(StatsMessage::Report(task)).await.is_err()
        {
            break;
        }
    }
    Ok(())
}

/// Evaluates tasks until the worker queue is closed.
async fn work<O: Objective>(
    objective: Arc<O>,
    tasks: Arc<Mutex<mpsc::Receiver<Task>>>,
    stats: mpsc::Sender<StatsMessage>,
) {
    loop {
        let next = tasks.lock().await.recv().await;
        let Some(mut task) = next else { break };
        let obj = Arc::clone(&objective);
        let evaluated = tokio::task::spawn_blocking(move || {
            task.location.f = obj.evaluate(&task.location.x);
            task
        })
        .await;
        let message = match evaluated {
            Ok(task) => StatsMessage::Evaluated(task),
            Err(e) => StatsMessage::WorkerFailed(e.to_string()),
        };
        if stats.send(message).await.is_err() {
            break;
        }
    }
    let _ = stats.send(StatsMessage::WorkerDone).await;
}

/// Statistics and termination bookkeeping for one run.
struct Combiner<'a, O> {
    objective: &'a O,
    settings: &'a Settings,
    converger: Option<FunctionConverge>,
    stats: Stats,
    opt_loc: Location,
    start: Instant,
    n_tasks: usize,
    workers_done: usize,
    status: Status,
    error: Option<Error>,
    results: Option<mpsc::Sender<Task>>,
    done: Option<oneshot::Sender<()>>,
}

impl<O: Objective> Combiner<'_, O> {
    async fn run(&mut self, mut inbox: mpsc::Receiver<StatsMessage>) {
        while let Some(message) = inbox.recv().await {
            let (task, status) = match message {
                StatsMessage::WorkerDone => {
                    self.workers_done += 1;
                    if self.workers_done == self.n_tasks {
                        // Closing results ends the driver's drain phase.
                        self.results = None;
                    }
                    continue;
                }
                StatsMessage::WorkerFailed(message) => {
                    trace_debug!(error = %message, "evaluation failed");
                    self.error.get_or_insert(Error::TaskError(message));
                    self.terminate(Status::Failure).await;
                    continue;
                }
                StatsMessage::Evaluated(task) => {
                    self.stats.func_evaluations += 1;
                    let status = self.check_evaluation_limits();
                    (task, status)
                }
                StatsMessage::Report(task) => {
                    let status = match task.op {
                        Operation::MajorIteration => {
                            match self.perform_major_iteration(&task.location) {
                                Ok(status) => status,
                                Err(error) => {
                                    self.error.get_or_insert(error);
                                    Status::Failure
                                }
                            }
                        }
                        Operation::MethodDone => Status::MethodConverge,
                        _ => Status::NotTerminated,
                    };
                    (task, status)
                }
            };

            if status != Status::NotTerminated {
                self.terminate(status).await;
            }
            if task.op != Operation::MethodDone {
                if let Some(results) = &self.results {
                    // The driver may already have aborted.
                    let _ = results.send(task).await;
                }
            }
        }
    }

    /// Records the first terminal status and tells the driver to wind down.
    async fn terminate(&mut self, status: Status) {
        let Some(done) = self.done.take() else {
            return;
        };
        self.status = status;
        trace_info!(%status, "terminating");
        if let Some(results) = &self.results {
            let _ = results.send(Task::post_iteration()).await;
        }
        let _ = done.send(());
    }

    fn perform_major_iteration(&mut self, loc: &Location) -> Result<Status> {
        if loc.x.len() != self.opt_loc.x.len() {
            return Err(Error::DimensionMismatch {
                expected: self.opt_loc.x.len(),
                got: loc.x.len(),
            });
        }
        self.opt_loc.f = loc.f;
        self.opt_loc.x.copy_from_slice(&loc.x);
        self.stats.major_iterations += 1;
        self.stats.runtime = self.start.elapsed();

        let status = self.check_location_convergence();
        if status != Status::NotTerminated {
            return Ok(status);
        }
        Ok(self.check_iteration_limits())
    }

    fn check_location_convergence(&mut self) -> Status {
        let f = self.opt_loc.f;
        if f == f64::NEG_INFINITY {
            return Status::FunctionNegativeInfinity;
        }
        if f < self.settings.function_threshold {
            return Status::FunctionThreshold;
        }
        self.converger
            .as_mut()
            .map_or(Status::NotTerminated, |c| c.converged(f))
    }

    fn check_iteration_limits(&self) -> Status {
        let limits = self.settings;
        if limits.major_iterations > 0 && self.stats.major_iterations >= limits.major_iterations {
            return Status::IterationLimit;
        }
        if limits.runtime.is_some_and(|max| self.stats.runtime >= max) {
            return Status::RuntimeLimit;
        }
        Status::NotTerminated
    }

    fn check_evaluation_limits(&self) -> Status {
        let limit = self.settings.func_evaluations;
        if limit > 0 && self.stats.func_evaluations >= limit {
            return Status::FunctionEvaluationLimit;
        }
        self.objective.status()
    }
}
