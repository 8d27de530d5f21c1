//! `queue` crate — the background job-dispatch mechanism the `worker` CLI
//! command polls.
//!
//! A thin typed wrapper over `db::repository::jobs`'s `job_queue` table
//! (already `SELECT … FOR UPDATE SKIP LOCKED` safe for multiple workers)
//! plus a generic poll loop the CLI's `worker` sub-command drives with the
//! engine as its dispatch callback.

use std::future::Future;
use std::time::Duration;

use db::models::JobRow;
use db::{DbError, DbPool};
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct JobQueue {
    pool: DbPool,
}

impl JobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, execution_id: Uuid, workflow_id: Uuid, payload: serde_json::Value) -> Result<JobRow, DbError> {
        db::repository::jobs::enqueue_job(&self.pool, execution_id, workflow_id, payload).await
    }

    pub async fn fetch_next(&self) -> Result<Option<JobRow>, DbError> {
        db::repository::jobs::fetch_next_job(&self.pool).await
    }

    pub async fn complete(&self, job_id: Uuid) -> Result<(), DbError> {
        db::repository::jobs::complete_job(&self.pool, job_id).await
    }

    pub async fn fail(&self, job_id: Uuid, max_attempts: i32) -> Result<(), DbError> {
        db::repository::jobs::fail_job(&self.pool, job_id, max_attempts).await
    }
}

/// Poll `queue` forever. Each fetched job is handed to `dispatch`; `Ok`
/// completes it, `Err` feeds it back into the retry/dead-letter path via
/// `job_queue.attempts` vs `max_attempts`. Sleeps `poll_interval` whenever
/// the queue is empty or a poll itself errors.
pub async fn run_forever<F, Fut>(queue: JobQueue, poll_interval: Duration, mut dispatch: F)
where
    F: FnMut(JobRow) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    loop {
        let job = match queue.fetch_next().await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::time::sleep(poll_interval).await;
                continue;
            }
            Err(e) => {
                error!("failed to poll job queue: {e}");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
        };

        let job_id = job.id;
        let max_attempts = job.max_attempts;

        match dispatch(job).await {
            Ok(()) => {
                if let Err(e) = queue.complete(job_id).await {
                    error!("failed to mark job {job_id} completed: {e}");
                }
            }
            Err(message) => {
                warn!(%job_id, "job failed: {message}");
                if let Err(e) = queue.fail(job_id, max_attempts).await {
                    error!("failed to mark job {job_id} failed: {e}");
                }
            }
        }
    }
}
