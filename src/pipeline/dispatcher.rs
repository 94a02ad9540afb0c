//! Mini batch dispatch onto the worker pool.
//!
//! The producing thread hands each mini batch to the dispatcher and
//! moves on; it never waits on an individual job. Concurrency is
//! bounded by a semaphore sized to the worker count — arbitrarily many
//! batches may be submitted, at most that many jobs run at once.
//! Ownership transfer is strict: once submitted, a mini batch belongs
//! to exactly one job.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::batch::assembler::MiniBatch;
use crate::inference::decoder::TranslationJob;
use crate::inference::model::ModelState;

/// Submits translation jobs to a bounded worker pool.
pub struct TaskDispatcher<J: TranslationJob> {
    job: Arc<J>,

    /// Immutable model snapshot shared read-only by every job.
    model: Arc<ModelState>,

    /// Worker-pool concurrency bound.
    permits: Arc<Semaphore>,

    tasks: JoinSet<()>,

    submitted: u64,
}

impl<J: TranslationJob> TaskDispatcher<J> {
    /// Create a dispatcher running `job` on at most `workers`
    /// concurrent tasks.
    pub fn new(job: J, model: Arc<ModelState>, workers: usize) -> Self {
        Self {
            job: Arc::new(job),
            model,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
            submitted: 0,
        }
    }

    /// Enqueue one mini batch. Returns immediately; the job starts
    /// whenever a worker permit frees up.
    pub fn submit(&mut self, batch: MiniBatch) {
        let job = self.job.clone();
        let model = self.model.clone();
        let permits = self.permits.clone();
        self.submitted += 1;

        debug!(sentences = batch.len(), "Submitting mini batch");
        self.tasks.spawn(async move {
            // The semaphore is never closed while the dispatcher lives.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.run(model, batch).await;
        });
    }

    /// Mini batches submitted so far.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Jobs not yet completed.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every outstanding job to complete.
    ///
    /// Called once after input exhaustion and the final maxi batch
    /// drain, before any device context teardown.
    pub async fn drain_and_shutdown(mut self) {
        let total = self.submitted;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(%e, "Translation job panicked");
            }
        }
        info!(jobs = total, "Worker pool drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::batch::assembler::MaxiBatch;
    use crate::batch::sentence::Sentence;
    use crate::config::Config;
    use crate::gpu::device::DeviceContext;

    struct CountingJob {
        running: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
    }

    #[async_trait]
    impl TranslationJob for Arc<CountingJob> {
        async fn run(&self, _model: Arc<ModelState>, _batch: MiniBatch) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_model() -> Arc<ModelState> {
        let ctx = Arc::new(DeviceContext::new(256 * 1024 * 1024));
        Arc::new(ModelState::load(ctx, &Config::default()))
    }

    fn mini(index: u64) -> MiniBatch {
        let mut maxi = MaxiBatch::new(1);
        maxi.accept(Sentence::new(index, vec![1, 2, 3]));
        maxi.finalize();
        maxi.next_mini_batch(1)
    }

    #[tokio::test]
    async fn test_all_submitted_jobs_complete() {
        let job = Arc::new(CountingJob {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        });
        let mut dispatcher = TaskDispatcher::new(job.clone(), test_model(), 4);

        for i in 0..20 {
            dispatcher.submit(mini(i));
        }
        assert_eq!(dispatcher.submitted(), 20);
        dispatcher.drain_and_shutdown().await;

        assert_eq!(job.completed.load(Ordering::SeqCst), 20);
        assert!(job.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_submit_does_not_block_producer() {
        let job = Arc::new(CountingJob {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        });
        let mut dispatcher = TaskDispatcher::new(job.clone(), test_model(), 1);

        // Far more submissions than permits; submit must not wait for
        // any of them.
        for i in 0..50 {
            dispatcher.submit(mini(i));
        }
        assert_eq!(dispatcher.in_flight(), 50);
        dispatcher.drain_and_shutdown().await;
        assert_eq!(job.completed.load(Ordering::SeqCst), 50);
    }
}
