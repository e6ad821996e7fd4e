use core::time::Duration;

use globalopt::sampler::{ReplaySampler, Uniform};
use globalopt::task::Phase;
use globalopt::{Error, GlobalMethod, GuessAndCheck, Operation, Result, Task};
use tokio::sync::mpsc;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(5);

/// Runs a single-slot driver against `pool`, which receives the driver's
/// end of both channels. Fails the test if the run hangs.
async fn run_with<F, Fut>(pool: F) -> Result<()>
where
    F: FnOnce(mpsc::Receiver<Task>, mpsc::Sender<Task>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut method = GuessAndCheck::new(ReplaySampler::new(vec![vec![1.0]]).unwrap());
    let n = method.init_global(1, 1);
    let (op_tx, op_rx) = mpsc::channel::<Task>(n);
    let (res_tx, res_rx) = mpsc::channel::<Task>(n + 1);
    let tasks = (0..n).map(|_| Task::new(1)).collect();

    let run = async {
        let (outcome, ()) = tokio::join!(method.run_global(op_tx, res_rx, tasks), pool(op_rx, res_tx));
        outcome
    };
    timeout(DEADLINE, run).await.expect("run must not hang")
}

#[tokio::test]
async fn test_unknown_operation_aborts() {
    for bad in [
        Operation::NoOperation,
        Operation::InitIteration,
        Operation::MethodDone,
        Operation::GradEvaluation,
        Operation::HessEvaluation,
    ] {
        let outcome = run_with(|mut ops, results| async move {
            let mut task = ops.recv().await.unwrap();
            task.op = bad;
            results.send(task).await.unwrap();
            // The driver must close its side rather than wait for more.
            assert!(ops.recv().await.is_none());
        })
        .await;

        assert!(
            matches!(
                outcome,
                Err(Error::ProtocolViolation { op, phase: Phase::Active }) if op == bad
            ),
            "{bad} should be a protocol violation, got {outcome:?}"
        );
    }
}

#[tokio::test]
async fn test_unknown_operation_while_draining() {
    let outcome = run_with(|mut ops, results| async move {
        let task = ops.recv().await.unwrap();
        results.send(Task::post_iteration()).await.unwrap();
        results.send(Task::post_iteration()).await.unwrap();
        drop(task);
        assert!(ops.recv().await.is_none());
    })
    .await;

    assert!(matches!(
        outcome,
        Err(Error::ProtocolViolation {
            op: Operation::PostIteration,
            phase: Phase::Draining
        })
    ));
}

#[tokio::test]
async fn test_result_for_undispatched_index() {
    let outcome = run_with(|mut ops, results| async move {
        let mut task = ops.recv().await.unwrap();
        task.index = 99;
        results.send(task).await.unwrap();
        assert!(ops.recv().await.is_none());
    })
    .await;

    assert!(matches!(outcome, Err(Error::UnknownTask { index: 99, .. })));
}

#[tokio::test]
async fn test_result_returned_twice() {
    let outcome = run_with(|mut ops, results| async move {
        let mut task = ops.recv().await.unwrap();
        task.location.f = 1.0;
        results.send(task.clone()).await.unwrap();
        // The driver reports the first copy as a MajorIteration.
        let report = ops.recv().await.unwrap();
        assert_eq!(report.op, Operation::MajorIteration);
        results.send(task).await.unwrap();
        assert!(ops.recv().await.is_none());
    })
    .await;

    assert!(matches!(
        outcome,
        Err(Error::UnknownTask {
            index: 1,
            op: Operation::FuncEvaluation
        })
    ));
}

#[tokio::test]
async fn test_results_closed_before_post_iteration() {
    let outcome = run_with(|mut ops, results| async move {
        let _task = ops.recv().await.unwrap();
        drop(results);
        assert!(ops.recv().await.is_none());
    })
    .await;

    assert!(matches!(outcome, Err(Error::ResultsClosed)));
}

#[tokio::test]
async fn test_sampler_failure_propagates() {
    // A three-dimensional sampler cannot fill one-dimensional tasks.
    let mut method = GuessAndCheck::new(Uniform::unit(3));
    method.init_global(1, 2);
    let (op_tx, mut op_rx) = mpsc::channel::<Task>(2);
    let (_res_tx, res_rx) = mpsc::channel::<Task>(3);
    let tasks = vec![Task::new(1), Task::new(1)];

    let outcome = timeout(DEADLINE, method.run_global(op_tx, res_rx, tasks))
        .await
        .expect("run must not hang");

    assert!(matches!(
        outcome,
        Err(Error::DimensionMismatch {
            expected: 3,
            got: 1
        })
    ));
    assert!(op_rx.recv().await.is_none(), "nothing may be dispatched");
}

#[tokio::test]
async fn test_resized_point_is_rejected() {
    let outcome = run_with(|mut ops, results| async move {
        let mut task = ops.recv().await.unwrap();
        task.location.x = vec![0.0, 0.0];
        task.location.f = -1.0;
        results.send(task).await.unwrap();
        assert!(ops.recv().await.is_none());
    })
    .await;

    assert!(matches!(
        outcome,
        Err(Error::DimensionMismatch {
            expected: 1,
            got: 2
        })
    ));
}

#[tokio::test]
async fn test_run_without_init_is_rejected() {
    let mut method = GuessAndCheck::new(ReplaySampler::new(vec![vec![1.0]]).unwrap());
    let (op_tx, mut op_rx) = mpsc::channel::<Task>(1);
    let (_res_tx, res_rx) = mpsc::channel::<Task>(2);

    let outcome = timeout(DEADLINE, method.run_global(op_tx, res_rx, vec![Task::new(1)]))
        .await
        .expect("run must not hang");

    assert!(matches!(
        outcome,
        Err(Error::DimensionMismatch {
            expected: 0,
            got: 1
        })
    ));
    assert!(op_rx.recv().await.is_none(), "nothing may be dispatched");
}
