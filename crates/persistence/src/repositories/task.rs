//! Task repository for database operations.
//!
//! Task rows are the durable queue behind the Task Dispatcher: enqueue is
//! an insert inside the caller's transaction, so a committed ledger change
//! and its side-effect tasks are atomic. The task runner claims due rows
//! with SKIP LOCKED so multiple runners never double-execute one task.

use chrono::{DateTime, Utc};
use domain::models::TaskType;
use sqlx::{PgPool, Postgres, Transaction};

use crate::entities::TaskEntity;
use crate::metrics::QueryTimer;

const TASK_COLUMNS: &str = r#"
    id, task_type, params, status, attempts, max_attempts,
    next_attempt_at, error
"#;

/// Input data for enqueueing a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_type: TaskType,
    pub params: serde_json::Value,
    pub max_attempts: i32,
}

impl NewTask {
    pub fn new(task_type: TaskType, params: serde_json::Value, max_attempts: i32) -> Self {
        Self { task_type, params, max_attempts }
    }
}

/// Repository for task database operations.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Creates a new TaskRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue tasks inside the caller's transaction.
    pub async fn enqueue_many(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tasks: &[NewTask],
    ) -> Result<Vec<i64>, sqlx::Error> {
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO task (task_type, params, status, max_attempts)
                VALUES ($1, $2, 'PENDING', $3)
                RETURNING id
                "#,
            )
            .bind(task.task_type.to_string())
            .bind(&task.params)
            .bind(task.max_attempts)
            .fetch_one(&mut **tx)
            .await?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Enqueue one task outside any caller transaction.
    pub async fn enqueue(&self, task: &NewTask) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO task (task_type, params, status, max_attempts)
            VALUES ($1, $2, 'PENDING', $3)
            RETURNING id
            "#,
        )
        .bind(task.task_type.to_string())
        .bind(&task.params)
        .bind(task.max_attempts)
        .fetch_one(&self.pool)
        .await
    }

    /// Claim a batch of due tasks, marking them IN_PROGRESS.
    ///
    /// SKIP LOCKED keeps concurrent runners from claiming the same rows.
    pub async fn claim_due(&self, limit: i64) -> Result<Vec<TaskEntity>, sqlx::Error> {
        let timer = QueryTimer::new("claim_due_tasks");

        let result = sqlx::query_as::<_, TaskEntity>(&format!(
            r#"
            UPDATE task
            SET status = 'IN_PROGRESS', attempts = attempts + 1, updated_at = NOW()
            WHERE id IN (
                SELECT id FROM task
                WHERE status = 'PENDING' AND next_attempt_at <= NOW()
                ORDER BY next_attempt_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Mark a task as successfully executed.
    pub async fn mark_success(&self, task_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE task
            SET status = 'SUCCESS', error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reschedule a failed task for another attempt.
    pub async fn reschedule(
        &self,
        task_id: i64,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE task
            SET status = 'PENDING', next_attempt_at = $2, error = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(next_attempt_at)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a task as permanently failed.
    pub async fn mark_failed(&self, task_id: i64, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE task
            SET status = 'FAILED', error = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete finished task rows older than the given number of days.
    /// Returns the number of deleted records.
    pub async fn delete_finished_older_than_days(&self, days: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM task
            WHERE status IN ('SUCCESS', 'CANCELLED')
              AND updated_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
