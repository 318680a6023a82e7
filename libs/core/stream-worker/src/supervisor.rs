//! Lifecycle owner for all consumer loops of a process.

use crate::error::StreamError;
use crate::registry::{MessageSource, StreamProcessor};
use crate::worker::StreamWorker;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// How each loop ended.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Loops that returned cleanly
    pub completed: Vec<&'static str>,
    /// Loops that returned an error or panicked
    pub failed: Vec<(&'static str, String)>,
    /// Loops still running when the drain timeout elapsed
    pub aborted: Vec<&'static str>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_empty()
    }
}

/// Spawns consumer loops, broadcasts shutdown, and waits for them to drain.
pub struct PipelineSupervisor {
    root: CancellationToken,
    tasks: JoinSet<Result<(), StreamError>>,
    names: HashMap<Id, &'static str>,
    drain_timeout: Duration,
}

impl PipelineSupervisor {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: JoinSet::new(),
            names: HashMap::new(),
            drain_timeout,
        }
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run `worker` on its own task.
    pub fn spawn<S, P>(&mut self, worker: StreamWorker<S, P>)
    where
        S: MessageSource + 'static,
        P: StreamProcessor + 'static,
    {
        let name = worker.name();
        let span = info_span!("stream_worker", processor = name);
        let handle = self
            .tasks
            .spawn(worker.run(self.root.child_token()).instrument(span));
        self.names.insert(handle.id(), name);
        info!(processor = name, "Spawned stream worker");
    }

    /// Wait for `signal`, then cancel every loop and wait for them to finish,
    /// at most `drain_timeout`. Loops still running after that are aborted.
    pub async fn run_until<F>(mut self, signal: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        let mut report = ShutdownReport::default();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                Some(joined) = self.tasks.join_next_with_id() => {
                    // a loop ended before shutdown was requested
                    self.record(joined, &mut report);
                }
            }
        }

        info!(
            loops = self.tasks.len(),
            drain_timeout_secs = self.drain_timeout.as_secs(),
            "Shutdown requested, draining stream workers"
        );
        self.root.cancel();

        let drain = tokio::time::sleep(self.drain_timeout);
        tokio::pin!(drain);

        loop {
            tokio::select! {
                biased;
                joined = self.tasks.join_next_with_id() => match joined {
                    Some(joined) => self.record(joined, &mut report),
                    None => break,
                },
                _ = &mut drain => {
                    report.aborted = self.names.values().copied().collect();
                    warn!(aborted = ?report.aborted, "Drain timeout elapsed, aborting stream workers");
                    self.tasks.shutdown().await;
                    break;
                }
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            aborted = report.aborted.len(),
            "Pipeline stopped"
        );
        report
    }

    fn record(
        &mut self,
        joined: Result<(Id, Result<(), StreamError>), JoinError>,
        report: &mut ShutdownReport,
    ) {
        match joined {
            Ok((id, Ok(()))) => {
                let name = self.names.remove(&id).unwrap_or("unknown");
                info!(processor = name, "Stream worker finished");
                report.completed.push(name);
            }
            Ok((id, Err(e))) => {
                let name = self.names.remove(&id).unwrap_or("unknown");
                error!(processor = name, error = %e, "Stream worker failed");
                report.failed.push((name, e.to_string()));
            }
            Err(e) => {
                let name = self.names.remove(&e.id()).unwrap_or("unknown");
                error!(processor = name, error = %e, "Stream worker panicked");
                report.failed.push((name, e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::{DecodeError, ServiceError};
    use crate::message::{CommitToken, RawMessage};
    use async_trait::async_trait;

    struct IdleSource {
        fail_prepare: bool,
        /// Ignores cancellation while closing, to simulate a stuck connection
        hang_on_close: bool,
    }

    #[async_trait]
    impl MessageSource for IdleSource {
        async fn prepare(&mut self) -> Result<(), StreamError> {
            if self.fail_prepare {
                Err(StreamError::Config("no such group".to_string()))
            } else {
                Ok(())
            }
        }

        async fn fetch(&mut self) -> Result<Option<RawMessage>, StreamError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn commit(&mut self, _token: CommitToken) -> Result<(), StreamError> {
            Ok(())
        }

        async fn close(&mut self) {
            if self.hang_on_close {
                std::future::pending::<()>().await;
            }
        }
    }

    struct NoopProcessor(&'static str);

    #[async_trait]
    impl StreamProcessor for NoopProcessor {
        type Event = ();

        fn decode(&self, _message: &RawMessage) -> Result<(), DecodeError> {
            Ok(())
        }

        async fn process(&self, _ctx: &Context, _event: ()) -> Result<(), ServiceError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn idle(name: &'static str, fail_prepare: bool, hang_on_close: bool) -> StreamWorker<IdleSource, NoopProcessor> {
        StreamWorker::new(
            IdleSource {
                fail_prepare,
                hang_on_close,
            },
            NoopProcessor(name),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_all_loops() {
        let mut supervisor = PipelineSupervisor::new(Duration::from_secs(10));
        supervisor.spawn(idle("orders", false, false));
        supervisor.spawn(idle("tokens", false, false));
        assert_eq!(supervisor.len(), 2);

        let report = supervisor
            .run_until(tokio::time::sleep(Duration::from_secs(1)))
            .await;

        assert!(report.is_clean());
        let mut completed = report.completed.clone();
        completed.sort();
        assert_eq!(completed, vec!["orders", "tokens"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_loop_does_not_stop_others() {
        let mut supervisor = PipelineSupervisor::new(Duration::from_secs(10));
        supervisor.spawn(idle("orders", true, false));
        supervisor.spawn(idle("tokens", false, false));

        let report = supervisor
            .run_until(tokio::time::sleep(Duration::from_secs(30)))
            .await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "orders");
        assert_eq!(report.completed, vec!["tokens"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_loop_is_aborted_after_drain_timeout() {
        let mut supervisor = PipelineSupervisor::new(Duration::from_secs(2));
        supervisor.spawn(idle("orders", false, false));
        supervisor.spawn(idle("tokens", false, true));

        let report = supervisor
            .run_until(tokio::time::sleep(Duration::from_millis(10)))
            .await;

        assert_eq!(report.completed, vec!["orders"]);
        assert_eq!(report.aborted, vec!["tokens"]);
        assert!(!report.is_clean());
    }
}
