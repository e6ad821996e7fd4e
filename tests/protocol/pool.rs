use std::collections::HashSet;

use globalopt::sampler::Sampler;
use globalopt::{GlobalMethod, GuessAndCheck, Location, Operation, Result, Task};
use tokio::sync::mpsc;

/// What the scripted pool observed during one run.
#[derive(Debug, Default)]
pub struct PoolLog {
    /// Every `MajorIteration` report, in arrival order.
    pub reports: Vec<Location>,
    /// Every point that was evaluated, with its value.
    pub evaluated: Vec<Location>,
    /// Evaluations dispatched after `PostIteration` that were not refills of
    /// a report returned before it.
    pub unsolicited: usize,
    /// Whether the result channel was already closed when the driver closed
    /// the operation channel.
    pub results_closed_first: bool,
}

/// Runs `method` against a well-behaved pool that evaluates `objective`
/// and sends `PostIteration` once `budget` evaluations have been made.
pub async fn run_pool<S: Sampler>(
    method: &mut GuessAndCheck<S>,
    dim: usize,
    concurrency: usize,
    budget: usize,
    objective: fn(&[f64]) -> f64,
) -> (Result<()>, PoolLog) {
    let n = method.init_global(dim, concurrency);
    let (op_tx, mut op_rx) = mpsc::channel::<Task>(n);
    let (res_tx, res_rx) = mpsc::channel::<Task>(n + 1);
    let tasks = (0..n).map(|_| Task::new(dim)).collect();

    let pool = async move {
        let mut log = PoolLog::default();
        let mut results = Some(res_tx);
        let mut posted = false;
        let mut retired = 0;
        let mut awaiting_refill = HashSet::new();

        while let Some(mut task) = op_rx.recv().await {
            match task.op {
                Operation::FuncEvaluation => {
                    if !awaiting_refill.remove(&task.index) && posted {
                        log.unsolicited += 1;
                    }
                    task.location.f = objective(&task.location.x);
                    log.evaluated.push(task.location.clone());
                    send(&results, task).await;
                }
                Operation::MajorIteration => {
                    log.reports.push(task.location.clone());
                    if !posted && log.evaluated.len() < budget {
                        awaiting_refill.insert(task.index);
                        send(&results, task).await;
                        continue;
                    }
                    if !posted {
                        posted = true;
                        send(&results, Task::post_iteration()).await;
                    }
                    retired += 1;
                    if retired == n {
                        results = None;
                    }
                }
                op => panic!("driver sent unexpected {op}"),
            }
        }
        log.results_closed_first = results.is_none();
        log
    };

    tokio::join!(method.run_global(op_tx, res_rx, tasks), pool)
}

async fn send(results: &Option<mpsc::Sender<Task>>, task: Task) {
    results
        .as_ref()
        .expect("result channel closed too early")
        .send(task)
        .await
        .expect("driver stopped reading results");
}

pub fn identity(x: &[f64]) -> f64 {
    x[0]
}

pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum()
}
