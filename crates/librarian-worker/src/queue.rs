//! Job queue abstraction for enqueuing and dequeuing background jobs.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing;

use librarian_core::error::AppError;
use librarian_core::types::id::JobId;
use librarian_database::JobStore;
use librarian_entity::job::{Job, JobPayload, JobPriority, JobStatus};

/// Job queue for enqueuing and dequeuing work
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Job store for persistence
    store: Arc<dyn JobStore>,
    /// Worker identifier for claiming jobs
    worker_id: String,
    /// Attempts allowed for newly enqueued jobs
    max_attempts: i32,
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(store: Arc<dyn JobStore>, worker_id: impl Into<String>, max_attempts: i32) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
            max_attempts,
        }
    }

    /// Worker identifier used when claiming jobs
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a new job
    pub async fn enqueue(&self, payload: &JobPayload, priority: JobPriority) -> Result<Job, AppError> {
        let now = Utc::now();
        let job = Job {
            id: JobId::new(),
            job_type: payload.job_type().to_string(),
            queue: payload.queue().to_string(),
            priority,
            payload: serde_json::to_value(payload)?,
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            worker_id: None,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.create(&job).await?;

        tracing::debug!(
            "Enqueued job: id={}, type='{}', queue='{}', priority={}",
            job.id,
            job.job_type,
            job.queue,
            job.priority
        );

        Ok(job)
    }

    /// Dequeue the next available job from specified queues
    pub async fn dequeue(&self, queues: &[&str]) -> Result<Option<Job>, AppError> {
        for queue in queues {
            let job = self.store.claim_next(queue, &self.worker_id).await?;

            if let Some(job) = job {
                tracing::debug!(
                    "Dequeued job: id={}, type='{}', queue='{}'",
                    job.id,
                    job.job_type,
                    job.queue
                );
                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    /// Mark a job as completed successfully
    pub async fn complete(
        &self,
        job_id: JobId,
        result: Option<serde_json::Value>,
    ) -> Result<(), AppError> {
        self.store.mark_completed(job_id, result).await?;
        tracing::debug!("Job completed: id={}", job_id);
        Ok(())
    }

    /// Mark a job as failed
    pub async fn fail(&self, job_id: JobId, error: &str) -> Result<(), AppError> {
        self.store.mark_failed(job_id, error).await?;
        tracing::debug!("Job failed: id={}, error='{}'", job_id, error);
        Ok(())
    }

    /// Return a job to the queue after a transient failure, to be claimed
    /// again once `delay` has passed
    pub async fn retry(&self, job_id: JobId, error: &str, delay: TimeDelta) -> Result<(), AppError> {
        let retry_at = Utc::now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.store.retry(job_id, error, retry_at).await?;
        tracing::debug!("Job retried: id={}, retry_at={}", job_id, retry_at);
        Ok(())
    }

    /// Get queue statistics
    pub async fn stats(&self) -> Result<QueueStats, AppError> {
        Ok(QueueStats {
            pending: self.store.count_by_status(JobStatus::Pending).await?,
            running: self.store.count_by_status(JobStatus::Running).await?,
            completed: self.store.count_by_status(JobStatus::Completed).await?,
            failed: self.store.count_by_status(JobStatus::Failed).await?,
            worker_id: self.worker_id.clone(),
        })
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending jobs
    pub pending: i64,
    /// Number of running jobs
    pub running: i64,
    /// Number of completed jobs
    pub completed: i64,
    /// Number of failed jobs
    pub failed: i64,
    /// Current worker identifier
    pub worker_id: String,
}
