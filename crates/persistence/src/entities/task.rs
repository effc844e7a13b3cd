//! Task entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Task, TaskStatus, TaskType};
use sqlx::FromRow;

/// Database row mapping for the task table.
///
/// `task_type` is stored as text; rows carrying a type this binary does not
/// know are left alone by the runner rather than failed.
#[derive(Debug, Clone, FromRow)]
pub struct TaskEntity {
    pub id: i64,
    pub task_type: String,
    pub params: serde_json::Value,
    pub status: TaskStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl TaskEntity {
    /// Converts into the domain task, or None for an unknown task type.
    pub fn into_domain(self) -> Option<Task> {
        let task_type: TaskType = self.task_type.parse().ok()?;
        Some(Task {
            id: self.id,
            task_type,
            params: self.params,
            status: self.status,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            next_attempt_at: self.next_attempt_at,
            error: self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(task_type: &str) -> TaskEntity {
        TaskEntity {
            id: 1,
            task_type: task_type.into(),
            params: json!({"account_holder_id": 1}),
            status: TaskStatus::Pending,
            attempts: 0,
            max_attempts: 5,
            next_attempt_at: Utc::now(),
            error: None,
        }
    }

    #[test]
    fn test_known_task_type_converts() {
        let task = entity("reward-issuance").into_domain().unwrap();
        assert_eq!(task.task_type, TaskType::RewardIssuance);
    }

    #[test]
    fn test_unknown_task_type_is_none() {
        assert!(entity("unknown-task").into_domain().is_none());
    }
}
