pub mod backoff;

pub use backoff::{Backoff, BackoffPolicy, CircuitState, Classify, Decision, FailureClass};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// A unit of work the supervisor repeats forever.
///
/// Each iteration is split in two: [`Worker::fetch`] may be dropped halfway
/// when shutdown is requested, [`Worker::handle`] always runs to completion.
#[async_trait]
pub trait Worker: Send {
    type Batch: Send;
    type Error: Classify + std::fmt::Display + Send;

    fn name(&self) -> &'static str;

    /// Waits for the next batch, e.g. a single long poll. Must not change any
    /// state that `handle` relies on.
    async fn fetch(&mut self) -> Result<Self::Batch, Self::Error>;

    async fn handle(&mut self, batch: Self::Batch);

    /// Called once after the loop has stopped.
    async fn shutdown(&mut self) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub steps: u64,
    pub failures: u64,
    pub trips: u32,
}

/// Runs a [`Worker`] until shutdown, backing off on failures.
pub struct Supervisor {
    backoff: Backoff,
}

impl Supervisor {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            backoff: Backoff::new(policy),
        }
    }

    /// Never returns on its own: only a shutdown signal (or the sender being
    /// dropped) ends the loop. Shutdown interrupts a pending fetch and the
    /// backoff sleep, but a batch already fetched is handled first.
    pub async fn run<W: Worker>(
        &mut self,
        worker: &mut W,
        mut shutdown: watch::Receiver<bool>,
    ) -> SupervisorReport {
        let name = worker.name();
        let mut report = SupervisorReport::default();
        info!(worker = name, "Supervisor started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = worker.fetch() => result,
            };

            let decision = match result {
                Ok(batch) => {
                    worker.handle(batch).await;
                    if self.backoff.circuit() == CircuitState::Open {
                        info!(worker = name, "Worker recovered, circuit closed");
                    }
                    self.backoff.record_success();
                    report.steps += 1;
                    continue;
                }
                Err(e) => {
                    report.failures += 1;
                    let class = e.classify();
                    let decision = self.backoff.record_failure(class);
                    match decision {
                        Decision::Retry { delay, attempt } => warn!(
                            worker = name,
                            error = %e,
                            class = %class,
                            attempt,
                            delay_secs = delay.as_secs_f64(),
                            "Worker fetch failed, retrying"
                        ),
                        Decision::CircuitOpen { cooldown, trips } => {
                            report.trips = trips;
                            error!(
                                worker = name,
                                error = %e,
                                class = %class,
                                trips,
                                cooldown_secs = cooldown.as_secs(),
                                "Circuit breaker tripped, pausing worker"
                            );
                        }
                    }
                    decision
                }
            };

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sleep(decision.delay()) => {}
            }
        }

        worker.shutdown().await;
        info!(
            worker = name,
            steps = report.steps,
            failures = report.failures,
            "Supervisor stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug)]
    struct TestError(FailureClass);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "scripted {} failure", self.0)
        }
    }

    impl Classify for TestError {
        fn classify(&self) -> FailureClass {
            self.0
        }
    }

    /// Plays back scripted results, then requests shutdown.
    struct ScriptedWorker {
        script: VecDeque<Result<(), TestError>>,
        shutdown: Arc<watch::Sender<bool>>,
        calls: usize,
        stopped: bool,
    }

    #[async_trait]
    impl Worker for ScriptedWorker {
        type Batch = ();
        type Error = TestError;

        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&mut self) -> Result<(), TestError> {
            self.calls += 1;
            match self.script.pop_front() {
                Some(result) => result,
                None => {
                    let _ = self.shutdown.send(true);
                    Ok(())
                }
            }
        }

        async fn handle(&mut self, _batch: ()) {}

        async fn shutdown(&mut self) {
            self.stopped = true;
        }
    }

    /// Hands out one batch, asks for shutdown while handling it, then blocks.
    struct BatchWorker {
        batch: Option<Vec<u32>>,
        shutdown: Arc<watch::Sender<bool>>,
        handled: Vec<u32>,
        stopped_after: Option<usize>,
    }

    #[async_trait]
    impl Worker for BatchWorker {
        type Batch = Vec<u32>;
        type Error = TestError;

        fn name(&self) -> &'static str {
            "batch"
        }

        async fn fetch(&mut self) -> Result<Vec<u32>, TestError> {
            match self.batch.take() {
                Some(batch) => Ok(batch),
                None => std::future::pending().await,
            }
        }

        async fn handle(&mut self, batch: Vec<u32>) {
            for item in batch {
                let _ = self.shutdown.send(true);
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.handled.push(item);
            }
        }

        async fn shutdown(&mut self) {
            self.stopped_after = Some(self.handled.len());
        }
    }

    fn fast_policy(max_consecutive_failures: u32) -> BackoffPolicy {
        BackoffPolicy {
            transient_delay: Duration::from_millis(1),
            other_delay: Duration::from_millis(2),
            multiplier: 2.0,
            max_delay: Duration::from_millis(10),
            max_consecutive_failures,
            circuit_cooldown: Duration::from_millis(5),
        }
    }

    fn worker(script: Vec<Result<(), TestError>>) -> (ScriptedWorker, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let worker = ScriptedWorker {
            script: script.into(),
            shutdown: Arc::new(tx),
            calls: 0,
            stopped: false,
        };
        (worker, rx)
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (mut worker, rx) = worker(vec![
            Err(TestError(FailureClass::Connection)),
            Err(TestError(FailureClass::Other)),
            Ok(()),
        ]);

        let report = Supervisor::new(fast_policy(10)).run(&mut worker, rx).await;

        assert_eq!(report.failures, 2);
        assert!(report.steps >= 1);
        assert_eq!(report.trips, 0);
        assert_eq!(worker.calls, 4);
    }

    #[tokio::test]
    async fn test_circuit_trip_is_reported_and_loop_continues() {
        let (mut worker, rx) = worker(vec![
            Err(TestError(FailureClass::Timeout)),
            Err(TestError(FailureClass::Timeout)),
            Err(TestError(FailureClass::Timeout)),
            Ok(()),
        ]);

        let mut supervisor = Supervisor::new(fast_policy(2));
        let report = supervisor.run(&mut worker, rx).await;

        assert_eq!(report.failures, 3);
        assert_eq!(report.trips, 1);
        assert_eq!(supervisor.backoff.circuit(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_stops_immediately_when_already_shut_down() {
        let (mut worker, rx) = worker(vec![Ok(())]);
        worker.shutdown.send(true).unwrap();

        let report = Supervisor::new(fast_policy(10)).run(&mut worker, rx).await;

        assert_eq!(report, SupervisorReport::default());
        assert_eq!(worker.calls, 0);
        assert!(worker.stopped);
    }

    #[tokio::test]
    async fn test_fetched_batch_is_finished_before_stopping() {
        let (tx, rx) = watch::channel(false);
        let mut worker = BatchWorker {
            batch: Some(vec![1, 2, 3]),
            shutdown: Arc::new(tx),
            handled: Vec::new(),
            stopped_after: None,
        };

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            Supervisor::new(fast_policy(10)).run(&mut worker, rx),
        )
        .await
        .unwrap();

        assert_eq!(report.steps, 1);
        assert_eq!(worker.handled, vec![1, 2, 3]);
        assert_eq!(worker.stopped_after, Some(3));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_backoff_sleep() {
        let (mut worker, rx) = worker(vec![Err(TestError(FailureClass::Other))]);
        let policy = BackoffPolicy {
            other_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(3600),
            ..fast_policy(10)
        };
        let shutdown = Arc::clone(&worker.shutdown);

        let handle = tokio::spawn(async move {
            let report = Supervisor::new(policy).run(&mut worker, rx).await;
            (report, worker.calls)
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.send(true).unwrap();

        let (report, calls) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_pending_fetch() {
        let (tx, rx) = watch::channel(false);
        let shutdown = Arc::new(tx);
        let mut worker = BatchWorker {
            batch: None,
            shutdown: Arc::clone(&shutdown),
            handled: Vec::new(),
            stopped_after: None,
        };

        let handle = tokio::spawn(async move {
            let report = Supervisor::new(fast_policy(10)).run(&mut worker, rx).await;
            (report, worker.stopped_after)
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.send(true).unwrap();

        let (report, stopped_after) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report, SupervisorReport::default());
        assert_eq!(stopped_after, Some(0));
    }
}
