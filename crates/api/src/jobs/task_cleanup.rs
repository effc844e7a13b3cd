//! Finished-task cleanup background job.

use persistence::repositories::TaskRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

/// Background job deleting old finished task rows.
pub struct TaskCleanupJob {
    tasks: TaskRepository,
    retention_days: i32,
}

impl TaskCleanupJob {
    /// Create a new cleanup job keeping finished tasks for
    /// `retention_days`.
    pub fn new(pool: PgPool, retention_days: i32) -> Self {
        Self { tasks: TaskRepository::new(pool), retention_days }
    }
}

#[async_trait::async_trait]
impl Job for TaskCleanupJob {
    fn name(&self) -> &'static str {
        "task_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .tasks
            .delete_finished_older_than_days(self.retention_days)
            .await
            .map_err(|err| format!("Failed to delete finished tasks: {err}"))?;

        if deleted > 0 {
            info!(deleted, retention_days = self.retention_days, "Cleaned up finished tasks");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_job_frequency_is_daily() {
        let freq = JobFrequency::Daily;
        assert_eq!(freq.duration(), Duration::from_secs(86400));
    }
}
