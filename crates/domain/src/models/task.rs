//! Retry task domain models.
//!
//! A task row is a durable request for asynchronous work (send an email,
//! issue a reward, call back the retailer). Rows are inserted inside the
//! same database transaction as the ledger change they follow from, and
//! claimed later by the task runner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// The kinds of asynchronous work the platform performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Activate a pending account holder: assign an account number and
    /// create campaign balances.
    AccountActivation,
    /// POST the enrolment result to the retailer's callback URL.
    EnrolmentCallback,
    /// Send the welcome email.
    WelcomeEmail,
    /// Issue one reward to an account holder.
    RewardIssuance,
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account-activation" => Ok(TaskType::AccountActivation),
            "enrolment-callback" => Ok(TaskType::EnrolmentCallback),
            "welcome-email" => Ok(TaskType::WelcomeEmail),
            "reward-issuance" => Ok(TaskType::RewardIssuance),
            _ => Err(format!("Unknown task type: {s}")),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::AccountActivation => "account-activation",
            TaskType::EnrolmentCallback => "enrolment-callback",
            TaskType::WelcomeEmail => "welcome-email",
            TaskType::RewardIssuance => "reward-issuance",
        };
        write!(f, "{name}")
    }
}

/// Execution status of a task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

/// A durable retry task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task_type: TaskType,
    pub params: JsonValue,
    pub status: TaskStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl Task {
    /// Whether another attempt may be scheduled after a failure.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_type_roundtrip() {
        for task_type in [
            TaskType::AccountActivation,
            TaskType::EnrolmentCallback,
            TaskType::WelcomeEmail,
            TaskType::RewardIssuance,
        ] {
            let parsed: TaskType = task_type.to_string().parse().unwrap();
            assert_eq!(parsed, task_type);
        }
    }

    #[test]
    fn test_task_type_parse_rejects_unknown() {
        assert!("send-sms".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_can_retry_respects_max_attempts() {
        let mut task = Task {
            id: 1,
            task_type: TaskType::RewardIssuance,
            params: json!({}),
            status: TaskStatus::Pending,
            attempts: 2,
            max_attempts: 3,
            next_attempt_at: Utc::now(),
            error: None,
        };
        assert!(task.can_retry());
        task.attempts = 3;
        assert!(!task.can_retry());
    }
}
