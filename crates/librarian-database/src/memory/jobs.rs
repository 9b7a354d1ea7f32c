//! In-memory job queue store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use librarian_core::error::AppError;
use librarian_core::result::AppResult;
use librarian_core::types::id::JobId;
use librarian_entity::job::{Job, JobStatus};

use crate::store::JobStore;

/// Jobs held in process memory, in creation order.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every job.
    pub async fn all(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }

    async fn update<F>(&self, id: JobId, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut Job) + Send,
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
        apply(job);
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> AppResult<()> {
        self.jobs.lock().await.push(job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().find(|job| job.id == id).cloned())
    }

    async fn claim_next(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();
        // Highest priority first; creation order breaks ties.
        let next = jobs
            .iter_mut()
            .enumerate()
            .filter(|(_, job)| {
                job.queue == queue && job.status == JobStatus::Pending && job.is_due(now)
            })
            .max_by(|(ia, a), (ib, b)| a.priority.cmp(&b.priority).then(ib.cmp(ia)))
            .map(|(_, job)| job);

        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.worker_id = Some(worker_id.to_string());
            job.started_at = Some(now);
            job.attempts += 1;
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn mark_completed(&self, id: JobId, result: Option<serde_json::Value>) -> AppResult<()> {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.result = result;
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error);
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn retry(&self, id: JobId, error: &str, retry_at: DateTime<Utc>) -> AppResult<()> {
        let error = error.to_string();
        self.update(id, |job| {
            job.status = JobStatus::Pending;
            job.error_message = Some(error);
            job.scheduled_at = Some(retry_at);
            job.started_at = None;
            job.worker_id = None;
        })
        .await
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().filter(|job| job.status == status).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_entity::job::JobPriority;

    fn job(queue: &str, priority: JobPriority) -> Job {
        let now = Utc::now();
        Job {
            id: JobId::new(),
            job_type: "test".to_string(),
            queue: queue.to_string(),
            priority,
            payload: serde_json::json!({}),
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            worker_id: None,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_claim_prefers_priority_then_age() {
        let store = MemoryJobStore::new();
        let first = job("conversion", JobPriority::Normal);
        let second = job("conversion", JobPriority::Normal);
        let urgent = job("conversion", JobPriority::High);
        let other_queue = job("bookkeeping", JobPriority::High);
        for j in [&first, &second, &urgent, &other_queue] {
            store.create(j).await.unwrap();
        }

        let claimed = store.claim_next("conversion", "w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, urgent.id);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.status, JobStatus::Running);

        let claimed = store.claim_next("conversion", "w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
    }

    #[tokio::test]
    async fn test_retry_returns_job_to_queue() {
        let store = MemoryJobStore::new();
        let pending = job("conversion", JobPriority::Normal);
        store.create(&pending).await.unwrap();

        let claimed = store.claim_next("conversion", "w1").await.unwrap().unwrap();
        assert!(store.claim_next("conversion", "w1").await.unwrap().is_none());

        store.retry(claimed.id, "timeout", Utc::now()).await.unwrap();
        let again = store.claim_next("conversion", "w1").await.unwrap().unwrap();
        assert_eq!(again.attempts, 2);

        store.mark_completed(again.id, None).await.unwrap();
        assert_eq!(store.count_by_status(JobStatus::Completed).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_in_future_is_not_claimed_yet() {
        let store = MemoryJobStore::new();
        store.create(&job("conversion", JobPriority::Normal)).await.unwrap();
        let claimed = store.claim_next("conversion", "w1").await.unwrap().unwrap();

        let later = Utc::now() + chrono::TimeDelta::minutes(5);
        store.retry(claimed.id, "waiting", later).await.unwrap();

        assert!(store.claim_next("conversion", "w1").await.unwrap().is_none());
        assert_eq!(store.count_by_status(JobStatus::Pending).await.unwrap(), 1);
        let stored = store.find_by_id(claimed.id).await.unwrap().unwrap();
        assert_eq!(stored.scheduled_at, Some(later));
        assert_eq!(stored.error_message.as_deref(), Some("waiting"));
    }
}
