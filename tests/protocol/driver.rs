use core::time::Duration;

use globalopt::sampler::{ReplaySampler, Uniform};
use globalopt::{GlobalMethod, GuessAndCheck, Operation, Task};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::pool::{identity, run_pool, sphere};

fn replay(values: &[f64]) -> ReplaySampler {
    ReplaySampler::new(values.iter().map(|&v| vec![v]).collect()).unwrap()
}

#[tokio::test]
async fn test_scenario_keeps_lowest_of_three() {
    let mut method = GuessAndCheck::new(replay(&[5.0, -3.0, 2.0]));
    let (outcome, log) = run_pool(&mut method, 1, 2, 3, identity).await;

    outcome.expect("run should finish cleanly");
    assert!(log.evaluated.len() >= 3);
    assert_eq!(method.best_f(), -3.0);
    assert_eq!(method.best_x(), &[-3.0]);
}

#[tokio::test]
async fn test_incumbent_is_minimum_of_evaluations() {
    let sampler = Uniform::with_seed(vec![(-4.0, 4.0); 3], 11).unwrap();
    let mut method = GuessAndCheck::new(sampler);
    let (outcome, log) = run_pool(&mut method, 3, 4, 200, sphere).await;
    outcome.unwrap();

    let best = log
        .evaluated
        .iter()
        .min_by(|a, b| a.f.total_cmp(&b.f))
        .unwrap();
    assert_eq!(method.best_f(), best.f);
    assert_eq!(method.best_x(), best.x.as_slice());
}

#[tokio::test]
async fn test_reports_carry_incumbent() {
    let sampler = Uniform::with_seed(vec![(-10.0, 10.0); 2], 5).unwrap();
    let mut method = GuessAndCheck::new(sampler);
    let (outcome, log) = run_pool(&mut method, 2, 3, 100, sphere).await;
    outcome.unwrap();

    // Every evaluated point produced exactly one report.
    assert_eq!(log.reports.len(), log.evaluated.len());

    for pair in log.reports.windows(2) {
        assert!(pair[1].f <= pair[0].f, "reports must never get worse");
    }
    for report in &log.reports {
        assert_eq!(report.f, sphere(&report.x), "report must pair value and point");
    }
    let last = log.reports.last().unwrap();
    assert_eq!(last.f, method.best_f());
    assert_eq!(last.x, method.best_x());
}

#[tokio::test]
async fn test_no_new_work_after_post_iteration() {
    for concurrency in [1, 2, 8] {
        let sampler = Uniform::with_seed(vec![(0.0, 1.0)], 3).unwrap();
        let mut method = GuessAndCheck::new(sampler);
        let (outcome, log) = run_pool(&mut method, 1, concurrency, 25, identity).await;
        outcome.unwrap();

        assert_eq!(log.unsolicited, 0, "concurrency {concurrency}");
        assert!(
            log.results_closed_first,
            "operations closed before results were drained (concurrency {concurrency})"
        );
    }
}

#[tokio::test]
async fn test_concurrency_does_not_change_minimum() {
    let values = [
        4.0, 9.5, 1.25, 6.0, 3.0, 8.0, 2.5, 7.0, 5.5, 0.75, 6.5, 2.0, -7.5, 3.5, 9.0, 1.0, 4.5,
        8.5, 0.5, 5.0,
    ];

    let mut sequential = GuessAndCheck::new(replay(&values));
    let (outcome, _) = run_pool(&mut sequential, 1, 1, values.len(), identity).await;
    outcome.unwrap();

    let mut concurrent = GuessAndCheck::new(replay(&values));
    let (outcome, _) = run_pool(&mut concurrent, 1, 8, values.len(), identity).await;
    outcome.unwrap();

    assert_eq!(sequential.best_f(), -7.5);
    assert_eq!(concurrent.best_f(), sequential.best_f());
    assert_eq!(concurrent.best_x(), sequential.best_x());
}

#[tokio::test]
async fn test_rerun_starts_fresh() {
    let mut method = GuessAndCheck::new(replay(&[-1.0, 2.0]));
    let (outcome, _) = run_pool(&mut method, 1, 1, 2, identity).await;
    outcome.unwrap();
    assert_eq!(method.best_f(), -1.0);

    method.init_global(1, 1);
    assert_eq!(method.best_f(), f64::INFINITY);
    let (outcome, _) = run_pool(&mut method, 1, 1, 1, |x| x[0] + 100.0).await;
    outcome.unwrap();
    assert!(method.best_f() >= 99.0);
}

#[tokio::test]
async fn test_drained_evaluation_is_absorbed() {
    let mut method = GuessAndCheck::new(replay(&[1.0, 2.0]));
    let n = method.init_global(1, 2);
    let (op_tx, mut op_rx) = mpsc::channel::<Task>(n);
    let (res_tx, res_rx) = mpsc::channel::<Task>(n + 1);
    let tasks = (0..n).map(|_| Task::new(1)).collect();

    let pool = async move {
        let mut first = op_rx.recv().await.unwrap();
        let mut second = op_rx.recv().await.unwrap();
        assert_eq!(first.op, Operation::FuncEvaluation);
        assert_eq!(second.op, Operation::FuncEvaluation);

        first.location.f = 5.0;
        results_send(&res_tx, first).await;
        let report = op_rx.recv().await.unwrap();
        assert_eq!(report.op, Operation::MajorIteration);
        assert_eq!(report.location.f, 5.0);

        // The second slot comes back only after the run was told to stop.
        results_send(&res_tx, Task::post_iteration()).await;
        second.location.x = vec![-10.0];
        second.location.f = -10.0;
        results_send(&res_tx, second).await;

        let drained = op_rx.recv().await.unwrap();
        assert_eq!(drained.op, Operation::MajorIteration);
        assert_eq!(drained.location.f, -10.0);
        assert_eq!(drained.location.x, vec![-10.0]);

        // The driver keeps its side open until the results are closed.
        assert!(
            timeout(Duration::from_millis(50), op_rx.recv())
                .await
                .is_err()
        );
        drop(res_tx);
        assert!(op_rx.recv().await.is_none());
    };

    let (outcome, ()) = tokio::join!(method.run_global(op_tx, res_rx, tasks), pool);
    outcome.expect("drain should finish cleanly");
    assert_eq!(method.best_f(), -10.0);
    assert_eq!(method.best_x(), &[-10.0]);
}

async fn results_send(results: &mpsc::Sender<Task>, task: Task) {
    results
        .send(task)
        .await
        .expect("driver stopped reading results");
}
