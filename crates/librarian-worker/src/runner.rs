//! Worker runner: main loop that polls for jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing;

use librarian_core::config::WorkerConfig;
use librarian_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// Main worker runner that polls queues and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for polling
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
    /// Queues to poll (in priority order)
    queues: Vec<String>,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
            queues: vec!["bookkeeping".to_string(), "conversion".to_string()],
        }
    }

    /// Start the worker runner. Runs until the cancel signal is received
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let worker_id = self.queue.worker_id().to_string();
        tracing::info!(
            "Worker '{}' started with concurrency={}, poll_interval={}s, queues={:?}",
            worker_id,
            self.config.concurrency,
            self.config.poll_interval_seconds,
            self.queues
        );

        let permits = u32::try_from(self.config.concurrency.max(1)).unwrap_or(u32::MAX);
        let semaphore = Arc::new(Semaphore::new(permits as usize));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            if *cancel.borrow() {
                break;
            }
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!("Worker '{}' received shutdown signal", worker_id);
                        break;
                    }
                }
                claimed = self.poll_and_spawn(&semaphore) => {
                    if claimed {
                        continue;
                    }
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!("Worker '{}' shutting down", worker_id);
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(
            "Worker '{}' waiting for in-flight jobs to complete...",
            worker_id
        );
        // Every permit back means every spawned job has finished.
        let _ = semaphore.acquire_many(permits).await;
        tracing::info!("Worker '{}' shut down complete", worker_id);
    }

    /// Run queued jobs one at a time until the queues are empty. Returns how
    /// many jobs ran.
    pub async fn drain_once(&self) -> usize {
        let mut processed = 0;
        let queue_refs: Vec<&str> = self.queues.iter().map(String::as_str).collect();
        loop {
            match self.queue.dequeue(&queue_refs).await {
                Ok(Some(job)) => {
                    process(&self.queue, &self.executor, job, self.retry_delay()).await;
                    processed += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to dequeue job: {}", e);
                    break;
                }
            }
        }
        processed
    }

    fn retry_delay(&self) -> TimeDelta {
        i64::try_from(self.config.retry_delay_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Poll for a job and spawn it if a slot is free. Returns whether a job
    /// was claimed.
    async fn poll_and_spawn(&self, semaphore: &Arc<Semaphore>) -> bool {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All worker slots occupied, waiting...");
                return false;
            }
        };

        let queue_refs: Vec<&str> = self.queues.iter().map(String::as_str).collect();

        match self.queue.dequeue(&queue_refs).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                let retry_delay = self.retry_delay();
                tokio::spawn(async move {
                    let _permit = permit;
                    process(&queue, &executor, job, retry_delay).await;
                });
                true
            }
            Ok(None) => {
                tracing::trace!("No jobs available in queues");
                false
            }
            Err(e) => {
                tracing::error!("Failed to dequeue job: {}", e);
                false
            }
        }
    }
}

/// Execute one claimed job and record its outcome.
async fn process(queue: &JobQueue, executor: &JobExecutor, job: Job, retry_delay: TimeDelta) {
    let job_id = job.id;

    match executor.execute(&job).await {
        Ok(result) => {
            if let Err(e) = queue.complete(job_id, result).await {
                tracing::error!("Failed to mark job {} as completed: {}", job_id, e);
                return;
            }
            tracing::info!("Job {} completed successfully", job_id);
        }
        Err(JobExecutionError::Transient(msg)) => {
            tracing::warn!("Job {} failed (transient): {}", job_id, msg);
            let outcome = if job.can_retry() {
                queue.retry(job_id, &msg, retry_delay).await
            } else {
                queue.fail(job_id, &msg).await
            };
            if let Err(e) = outcome {
                tracing::error!("Failed to record failure of job {}: {}", job_id, e);
            }
        }
        Err(JobExecutionError::Permanent(msg)) => {
            tracing::error!("Job {} failed permanently: {}", job_id, msg);
            if let Err(e) = queue.fail(job_id, &msg).await {
                tracing::error!("Failed to mark job {} as failed: {}", job_id, e);
            }
        }
        Err(JobExecutionError::Internal(err)) => {
            let msg = err.to_string();
            tracing::error!("Job {} internal error: {}", job_id, msg);
            if let Err(e) = queue.fail(job_id, &msg).await {
                tracing::error!("Failed to mark job {} as failed: {}", job_id, e);
            }
        }
    }
}
