//! Bounded worker pool preserving input order
//!
//! Small batches run sequentially in the calling task. Batches at or above
//! the configured threshold are fed in chunks to a [`JoinSet`] holding at
//! most `concurrency` tasks. Either way outcomes come back sorted by
//! sequence number, and a panicking item is reported as a failed outcome
//! instead of tearing down the run.

use crate::config::PoolConfig;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// One unit of work handed to the pool
#[derive(Debug, Clone)]
pub struct WorkItem<T> {
    /// Unique id for log correlation
    pub id: Uuid,
    /// Position in the input, 0-based
    pub sequence: usize,
    /// The item itself
    pub payload: T,
}

impl<T> WorkItem<T> {
    /// Wrap a payload at a position
    pub fn new(sequence: usize, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            payload,
        }
    }
}

/// Why a work item produced no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// The work function panicked
    #[error("work item panicked: {0}")]
    Panicked(String),

    /// The pool was aborted before the item was dispatched
    #[error("work item skipped after abort")]
    Aborted,
}

/// Result of one work item, tagged with its origin
#[derive(Debug)]
pub struct WorkOutcome<R> {
    /// Id of the originating work item
    pub id: Uuid,
    /// Sequence of the originating work item
    pub sequence: usize,
    /// Value returned by the work function
    pub result: Result<R, WorkError>,
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Items currently executing
    pub active_workers: usize,
    /// Items waiting to be dispatched
    pub queue_size: usize,
    /// Items finished since the pool was created
    pub processed_count: usize,
    /// Items that panicked or were skipped
    pub error_count: usize,
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    queued: AtomicUsize,
    processed: AtomicUsize,
    errors: AtomicUsize,
}

/// Stops a running pool from dispatching further items
#[derive(Debug, Clone)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Request cancellation; in-flight items may still complete
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Order-preserving worker pool
#[derive(Debug)]
pub struct WorkerPool {
    config: PoolConfig,
    counters: Arc<Counters>,
    aborted: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Create a pool
    pub fn new(config: PoolConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            config,
            counters: Arc::new(Counters::default()),
            aborted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Whether `len` items would take the concurrent path
    pub fn is_concurrent_for(&self, len: usize) -> bool {
        self.config.enabled && len >= self.config.threshold
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active_workers: self.counters.active.load(Ordering::SeqCst),
            queue_size: self.counters.queued.load(Ordering::SeqCst),
            processed_count: self.counters.processed.load(Ordering::SeqCst),
            error_count: self.counters.errors.load(Ordering::SeqCst),
        }
    }

    /// Stop dispatching items for the current [`process`](Self::process) call
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Handle that can abort the pool from another task
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            flag: Arc::clone(&self.aborted),
        }
    }

    /// Run `work` over every item and return outcomes in input order
    pub async fn process<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<WorkOutcome<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let items: Vec<WorkItem<T>> = items
            .into_iter()
            .enumerate()
            .map(|(sequence, payload)| WorkItem::new(sequence, payload))
            .collect();
        self.counters.queued.store(items.len(), Ordering::SeqCst);

        let mut outcomes = if self.is_concurrent_for(items.len()) {
            debug!(
                "Processing {} items with concurrency {}",
                items.len(),
                self.config.concurrency
            );
            self.run_concurrent(items, Arc::new(work)).await
        } else {
            debug!("Processing {} items sequentially", items.len());
            self.run_sequential(items, work).await
        };

        outcomes.sort_by_key(|outcome| outcome.sequence);
        self.counters.queued.store(0, Ordering::SeqCst);
        self.aborted.store(false, Ordering::SeqCst);
        outcomes
    }

    async fn run_sequential<T, R, F, Fut>(&self, items: Vec<WorkItem<T>>, work: F) -> Vec<WorkOutcome<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut outcomes = Vec::with_capacity(items.len());
        for WorkItem {
            id,
            sequence,
            payload,
        } in items
        {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            if self.aborted.load(Ordering::SeqCst) {
                outcomes.push(self.skipped(id, sequence));
                continue;
            }

            self.counters.active.fetch_add(1, Ordering::SeqCst);
            let result = AssertUnwindSafe(async { work(payload).await })
                .catch_unwind()
                .await
                .map_err(panic_message);
            self.counters.active.fetch_sub(1, Ordering::SeqCst);

            outcomes.push(self.finished(id, sequence, result));
        }
        outcomes
    }

    async fn run_concurrent<T, R, F, Fut>(
        &self,
        items: Vec<WorkItem<T>>,
        work: Arc<F>,
    ) -> Vec<WorkOutcome<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let mut outcomes = Vec::with_capacity(items.len());
        let mut in_flight: HashMap<usize, Uuid> = HashMap::new();
        let mut tasks = JoinSet::new();
        let mut pending = items.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<WorkItem<T>> = pending.by_ref().take(self.config.batch_size).collect();

            for item in batch {
                while tasks.len() >= self.config.concurrency {
                    self.join_one(&mut tasks, &mut in_flight, &mut outcomes).await;
                }

                self.counters.queued.fetch_sub(1, Ordering::SeqCst);
                if self.aborted.load(Ordering::SeqCst) {
                    outcomes.push(self.skipped(item.id, item.sequence));
                    continue;
                }

                in_flight.insert(item.sequence, item.id);
                let work = Arc::clone(&work);
                let counters = Arc::clone(&self.counters);
                let WorkItem {
                    id,
                    sequence,
                    payload,
                } = item;

                tasks.spawn(async move {
                    counters.active.fetch_add(1, Ordering::SeqCst);
                    let result = AssertUnwindSafe(async move { work(payload).await })
                        .catch_unwind()
                        .await
                        .map_err(panic_message);
                    counters.active.fetch_sub(1, Ordering::SeqCst);
                    (id, sequence, result)
                });
            }

            // Drain the chunk before feeding the next one
            while !tasks.is_empty() {
                self.join_one(&mut tasks, &mut in_flight, &mut outcomes).await;
            }
        }

        // Tasks cancelled by the runtime never report back
        for (sequence, id) in in_flight {
            warn!("Work item {} (sequence {}) did not complete", id, sequence);
            outcomes.push(self.finished(
                id,
                sequence,
                Err(WorkError::Panicked("worker task was cancelled".to_string())),
            ));
        }

        outcomes
    }

    async fn join_one<R: Send + 'static>(
        &self,
        tasks: &mut JoinSet<(Uuid, usize, Result<R, WorkError>)>,
        in_flight: &mut HashMap<usize, Uuid>,
        outcomes: &mut Vec<WorkOutcome<R>>,
    ) {
        match tasks.join_next().await {
            Some(Ok((id, sequence, result))) => {
                in_flight.remove(&sequence);
                outcomes.push(self.finished(id, sequence, result));
            }
            Some(Err(e)) => warn!("Worker task failed to join: {}", e),
            None => {}
        }
    }

    fn finished<R>(&self, id: Uuid, sequence: usize, result: Result<R, WorkError>) -> WorkOutcome<R> {
        self.counters.processed.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = &result {
            self.counters.errors.fetch_add(1, Ordering::SeqCst);
            warn!("Work item {} (sequence {}) failed: {}", id, sequence, e);
        }
        WorkOutcome {
            id,
            sequence,
            result,
        }
    }

    fn skipped<R>(&self, id: Uuid, sequence: usize) -> WorkOutcome<R> {
        self.counters.errors.fetch_add(1, Ordering::SeqCst);
        debug!("Skipping work item {} (sequence {}) after abort", id, sequence);
        WorkOutcome {
            id,
            sequence,
            result: Err(WorkError::Aborted),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> WorkError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    WorkError::Panicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pool(enabled: bool, concurrency: usize, threshold: usize, batch_size: usize) -> WorkerPool {
        WorkerPool::new(PoolConfig {
            enabled,
            concurrency,
            threshold,
            batch_size,
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(WorkerPool::new(PoolConfig {
            concurrency: 0,
            ..PoolConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_threshold_selects_path() {
        let pool = pool(true, 4, 10, 50);
        assert!(!pool.is_concurrent_for(9));
        assert!(pool.is_concurrent_for(10));
        assert!(!WorkerPool::new(PoolConfig::sequential()).unwrap().is_concurrent_for(1000));
    }

    #[tokio::test]
    async fn test_sequential_preserves_order() {
        let pool = pool(true, 4, 100, 50);
        let outcomes = pool.process((0..5).collect(), |n: u64| async move { n * 10 }).await;

        let values: Vec<u64> = outcomes.into_iter().map(|o| o.result.unwrap()).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn test_concurrent_preserves_order_under_latency() {
        let pool = pool(true, 4, 1, 7);
        // Earlier items sleep longest so completions arrive reversed
        let outcomes = pool
            .process((0..20u64).collect(), |n| async move {
                tokio::time::sleep(Duration::from_millis((20 - n) * 3)).await;
                n
            })
            .await;

        let sequences: Vec<usize> = outcomes.iter().map(|o| o.sequence).collect();
        assert_eq!(sequences, (0..20).collect::<Vec<_>>());
        for outcome in outcomes {
            assert_eq!(outcome.result.unwrap(), outcome.sequence as u64);
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = pool(true, 3, 1, 50);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        pool.process((0..12).collect(), move |_: u32| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_panics_are_captured_per_item() {
        for pool in [pool(true, 2, 1, 50), pool(false, 2, 1, 50)] {
            let outcomes = pool
                .process(vec![1, 2, 3], |n: i32| async move {
                    if n == 2 {
                        panic!("bad item");
                    }
                    n
                })
                .await;

            assert_eq!(outcomes.len(), 3);
            assert_eq!(outcomes[0].result, Ok(1));
            assert_eq!(outcomes[1].result, Err(WorkError::Panicked("bad item".to_string())));
            assert_eq!(outcomes[2].result, Ok(3));
            assert_eq!(pool.stats().error_count, 1);
        }
    }

    #[tokio::test]
    async fn test_stats_after_run() {
        let pool = pool(true, 2, 1, 50);
        pool.process((0..6).collect(), |n: u8| async move { n }).await;

        let stats = pool.stats();
        assert_eq!(stats.processed_count, 6);
        assert_eq!(stats.active_workers, 0);
        assert_eq!(stats.queue_size, 0);
        assert_eq!(stats.error_count, 0);
    }

    #[tokio::test]
    async fn test_abort_skips_undispatched_items() {
        let pool = pool(true, 1, 1, 50);
        let handle = pool.abort_handle();

        let outcomes = pool
            .process((0..5).collect(), move |n: usize| {
                let handle = handle.clone();
                async move {
                    if n == 1 {
                        handle.abort();
                    }
                    n
                }
            })
            .await;

        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes[0].result, Ok(0));
        assert_eq!(outcomes[1].result, Ok(1));
        assert!(outcomes[2..].iter().all(|o| o.result == Err(WorkError::Aborted)));

        // The flag is cleared for the next run
        assert!(!pool.abort_handle().is_aborted());
        let again = pool.process(vec![7], |n: usize| async move { n }).await;
        assert_eq!(again[0].result, Ok(7));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pool = pool(true, 4, 1, 50);
        let outcomes = pool.process(Vec::<u8>::new(), |n| async move { n }).await;
        assert!(outcomes.is_empty());
    }
}
