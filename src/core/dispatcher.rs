// src/core/dispatcher.rs

//! The bounded dispatcher: runs any number of probe tasks with at most `K` in
//! flight, turns every task into exactly one `ProbeOutcome`, and streams the
//! outcomes back as they resolve.

use crate::core::error::ProbeError;
use crate::core::models::{ProbeOutcome, ProbeResult, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error};

/// A boxed, not-yet-started unit of work.
pub type ProbeFuture = Pin<Box<dyn Future<Output = ProbeResult> + Send + 'static>>;

/// Maximum number of tasks one dispatcher runs at the same time. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcurrencyBudget(NonZeroUsize);

impl ConcurrencyBudget {
    /// One task at a time.
    pub const SINGLE: Self = Self(NonZeroUsize::MIN);

    pub fn new(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// A named unit of work bound to its target. Lazy until the dispatcher polls it.
pub struct ProbeTask {
    id: TaskId,
    work: ProbeFuture,
}

impl ProbeTask {
    pub fn new<F>(id: TaskId, work: F) -> Self
    where
        F: Future<Output = ProbeResult> + Send + 'static,
    {
        Self { id, work: Box::pin(work) }
    }
}

impl fmt::Debug for ProbeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeTask").field("id", &self.id).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    budget: ConcurrencyBudget,
}

impl Dispatcher {
    pub fn new(budget: ConcurrencyBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> ConcurrencyBudget {
        self.budget
    }

    /// Starts the batch in the background and returns the outcome stream.
    ///
    /// The receiver yields one outcome per task in completion order and closes
    /// once every task has resolved, so callers never need to poll for completion.
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, tasks: Vec<ProbeTask>) -> mpsc::UnboundedReceiver<ProbeOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(self.budget.get()));
        debug!(tasks = tasks.len(), budget = self.budget.get(), "Dispatching probe batch.");
        tokio::spawn(drive(tasks, permits, tx));
        rx
    }

    /// Runs the batch to completion and returns every outcome.
    #[cfg(test)]
    pub async fn run(&self, tasks: Vec<ProbeTask>) -> Vec<ProbeOutcome> {
        let mut outcomes_rx = self.spawn(tasks);
        let mut outcomes = Vec::new();
        while let Some(outcome) = outcomes_rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn drive(tasks: Vec<ProbeTask>, permits: Arc<Semaphore>, tx: mpsc::UnboundedSender<ProbeOutcome>) {
    let mut in_flight = JoinSet::new();

    for ProbeTask { id, work } in tasks {
        // The permit is taken before the task is spawned; queued work holds no resources.
        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(task = %id, error = %e, "Dispatcher semaphore closed.");
                let _ = tx.send(ProbeOutcome::Failure { task_id: id, reason: e.to_string() });
                continue;
            }
        };

        let tx = tx.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            // Run the probe in its own task so a panic stays inside it.
            let result = match tokio::spawn(work).await {
                Ok(result) => result,
                Err(e) => {
                    error!(task = %id, error = %e, "Probe task aborted.");
                    Err(ProbeError::Panicked(e.to_string()))
                }
            };
            let _ = tx.send(ProbeOutcome::from_result(id, result));
        });

        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Dispatcher slot terminated abnormally.");
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Dispatcher slot terminated abnormally.");
        }
    }
    // `tx` drops here; once every slot's clone is gone the receiver closes.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Category;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records how many probes are running at once.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    fn instrumented(gauge: &Arc<Gauge>, n: usize) -> Vec<ProbeTask> {
        (0..n)
            .map(|i| {
                let gauge = Arc::clone(gauge);
                ProbeTask::new(TaskId::new(Category::Ports, i.to_string()), async move {
                    let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
                    gauge.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5 + (i % 3) as u64)).await;
                    gauge.current.fetch_sub(1, Ordering::SeqCst);
                    Ok(Some(format!("task {i}")))
                })
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_budget_and_loses_nothing() {
        for k in [1, 2, 3, 8] {
            for n in [0, 1, 5, 24] {
                let gauge = Arc::new(Gauge::default());
                let dispatcher = Dispatcher::new(ConcurrencyBudget::new(k).unwrap());
                let outcomes = dispatcher.run(instrumented(&gauge, n)).await;

                assert_eq!(outcomes.len(), n, "k={k} n={n}");
                assert!(gauge.peak.load(Ordering::SeqCst) <= k, "k={k} n={n}");

                let mut ids: Vec<String> = outcomes.iter().map(|o| o.task_id().subject.clone()).collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), n, "duplicate or missing outcome for k={k} n={n}");
            }
        }
    }

    #[tokio::test]
    async fn budget_is_actually_used() {
        let gauge = Arc::new(Gauge::default());
        let dispatcher = Dispatcher::new(ConcurrencyBudget::new(4).unwrap());
        dispatcher.run(instrumented(&gauge, 16)).await;
        assert!(gauge.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn failing_task_is_isolated() {
        let tasks = (1..=5)
            .map(|i| {
                ProbeTask::new(TaskId::new(Category::Blacklist, i.to_string()), async move {
                    if i == 3 {
                        Err(ProbeError::Other("boom".to_string()))
                    } else {
                        Ok(Some(format!("ok {i}")))
                    }
                })
            })
            .collect();

        let outcomes = Dispatcher::new(ConcurrencyBudget::new(2).unwrap()).run(tasks).await;
        let findings = outcomes.iter().filter(|o| matches!(o, ProbeOutcome::Finding { .. })).count();
        let failures: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                ProbeOutcome::Failure { task_id, reason } => Some((task_id.subject.clone(), reason.clone())),
                _ => None,
            })
            .collect();

        assert_eq!(findings, 4);
        assert_eq!(failures, vec![("3".to_string(), "boom".to_string())]);
    }

    #[tokio::test]
    async fn panicking_task_becomes_failure() {
        let tasks = vec![
            ProbeTask::new(TaskId::new(Category::Waf, "panics"), async {
                if true {
                    panic!("probe exploded");
                }
                Ok(None)
            }),
            ProbeTask::new(TaskId::new(Category::Waf, "fine"), async { Ok(None) }),
        ];

        let outcomes = Dispatcher::new(ConcurrencyBudget::SINGLE).run(tasks).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| matches!(
            o,
            ProbeOutcome::Failure { task_id, reason } if task_id.subject == "panics" && reason.starts_with("probe panicked")
        )));
        assert!(outcomes.iter().any(|o| matches!(o, ProbeOutcome::Clear { task_id } if task_id.subject == "fine")));
    }

    #[tokio::test]
    async fn empty_batch_closes_immediately() {
        let mut rx = Dispatcher::new(ConcurrencyBudget::SINGLE).spawn(Vec::new());
        let next = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn stalled_task_only_blocks_its_own_slot() {
        let mut tasks = vec![ProbeTask::new(TaskId::new(Category::Subdomains, "stuck"), async {
            std::future::pending::<()>().await;
            Ok(None)
        })];
        for i in 0..3 {
            tasks.push(ProbeTask::new(TaskId::new(Category::Subdomains, i.to_string()), async move {
                Ok(Some(i.to_string()))
            }));
        }

        let mut rx = Dispatcher::new(ConcurrencyBudget::new(2).unwrap()).spawn(tasks);
        for _ in 0..3 {
            let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
            assert_ne!(outcome.task_id().subject, "stuck");
        }
    }

    #[tokio::test]
    async fn outcomes_stream_in_completion_order() {
        let tasks = vec![
            ProbeTask::new(TaskId::new(Category::Ports, "slow"), async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(Some("slow".to_string()))
            }),
            ProbeTask::new(TaskId::new(Category::Ports, "fast"), async { Ok(Some("fast".to_string())) }),
        ];
        let mut rx = Dispatcher::new(ConcurrencyBudget::new(2).unwrap()).spawn(tasks);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.task_id().subject, "fast");
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert!(ConcurrencyBudget::new(0).is_none());
        assert_eq!(ConcurrencyBudget::SINGLE.get(), 1);
    }
}
