//! Task runner background job.
//!
//! Claims due task rows in batches and dispatches them to their handlers.
//! A retryable failure reschedules the task with exponential backoff and
//! jitter until its attempt budget runs out; a permanent failure (or an
//! exhausted budget) marks it FAILED for operator attention.

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::{info, warn};

use domain::models::{Task, TaskType};
use persistence::repositories::TaskRepository;

use crate::config::{Config, CoreConfig};
use crate::services::callback::EnrolmentCallbackPayload;
use crate::services::{
    AccountService, ActivityPublisher, EmailService, EnrolmentCallbackService,
    RewardIssuanceService, TaskError,
};

use super::scheduler::{Job, JobFrequency};

/// Background job executing durable tasks.
pub struct TaskRunnerJob {
    core: CoreConfig,
    tasks: TaskRepository,
    handlers: TaskHandlers,
}

/// The services task execution dispatches into.
struct TaskHandlers {
    pool: PgPool,
    accounts: AccountService,
    rewards: RewardIssuanceService,
    callbacks: EnrolmentCallbackService,
    email: EmailService,
}

impl TaskRunnerJob {
    /// Create a new task runner from the application configuration.
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let publisher = ActivityPublisher::new(pool.clone());
        Self {
            core: config.core.clone(),
            tasks: TaskRepository::new(pool.clone()),
            handlers: TaskHandlers {
                accounts: AccountService::new(pool.clone(), config.core.clone(), publisher.clone()),
                rewards: RewardIssuanceService::new(pool.clone(), publisher),
                callbacks: EnrolmentCallbackService::new(),
                email: EmailService::new(config.email.clone()),
                pool,
            },
        }
    }

    async fn run_task(&self, task: Task) {
        let task_id = task.id;
        let task_type = task.task_type;
        let can_retry = task.can_retry();
        let attempts = task.attempts;

        let result = self.handlers.dispatch(task).await;

        match result {
            Ok(()) => {
                if let Err(err) = self.tasks.mark_success(task_id).await {
                    warn!(task_id, "Failed to mark task success: {err}");
                }
            }
            Err(TaskError::Retryable(reason)) if can_retry => {
                let next_attempt_at = Utc::now() + backoff(self.core.task_backoff_base_secs, attempts);
                info!(
                    task_id,
                    task_type = %task_type,
                    attempts,
                    %next_attempt_at,
                    "Task rescheduled: {reason}"
                );
                if let Err(err) = self.tasks.reschedule(task_id, next_attempt_at, &reason).await {
                    warn!(task_id, "Failed to reschedule task: {err}");
                }
            }
            Err(TaskError::Retryable(reason)) => {
                warn!(task_id, task_type = %task_type, attempts, "Task attempts exhausted: {reason}");
                if let Err(err) = self.tasks.mark_failed(task_id, &reason).await {
                    warn!(task_id, "Failed to mark task failed: {err}");
                }
            }
            Err(TaskError::Permanent(reason)) => {
                warn!(task_id, task_type = %task_type, "Task failed permanently: {reason}");
                if let Err(err) = self.tasks.mark_failed(task_id, &reason).await {
                    warn!(task_id, "Failed to mark task failed: {err}");
                }
            }
        }
    }
}

impl TaskHandlers {
    async fn dispatch(&self, task: Task) -> Result<(), TaskError> {
        match task.task_type {
            TaskType::AccountActivation => {
                let account_holder_id = param_i64(&task.params, "account_holder_id")?;
                self.accounts.activate(account_holder_id).await
            }
            TaskType::RewardIssuance => {
                let params = serde_json::from_value(task.params)
                    .map_err(|err| TaskError::Permanent(format!("bad task params: {err}")))?;
                self.rewards.issue(params).await
            }
            TaskType::EnrolmentCallback => self.send_callback(&task.params).await,
            TaskType::WelcomeEmail => self.send_welcome_email(&task.params).await,
        }
    }

    async fn send_callback(&self, params: &JsonValue) -> Result<(), TaskError> {
        let account_holder_id = param_i64(params, "account_holder_id")?;
        let account_number = param_str(params, "account_number")?;

        let (holder, retailer) = self.load_holder_and_retailer(account_holder_id).await?;
        let Some(url) = retailer.callback_url.as_deref() else {
            // Callback was unconfigured after enqueue; nothing to deliver.
            return Ok(());
        };

        self.callbacks
            .send(
                url,
                retailer.callback_secret.as_deref(),
                &EnrolmentCallbackPayload {
                    account_holder_uuid: holder.account_holder_uuid,
                    account_number: account_number.to_string(),
                    third_party_identifier: None,
                },
            )
            .await
    }

    async fn send_welcome_email(&self, params: &JsonValue) -> Result<(), TaskError> {
        let account_holder_id = param_i64(params, "account_holder_id")?;
        let account_number = param_str(params, "account_number")?;

        let (holder, retailer) = self.load_holder_and_retailer(account_holder_id).await?;
        self.email
            .send_welcome(&holder.email, &retailer.loyalty_name, account_number)
            .await
    }

    async fn load_holder_and_retailer(
        &self,
        account_holder_id: i64,
    ) -> Result<
        (
            persistence::entities::AccountHolderEntity,
            domain::models::Retailer,
        ),
        TaskError,
    > {
        let holders =
            persistence::repositories::AccountHolderRepository::new(self.pool.clone());
        let retailers = persistence::repositories::RetailerRepository::new(self.pool.clone());

        let holder = holders
            .find_by_id(account_holder_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!("account holder {account_holder_id} does not exist"))
            })?;
        let retailer = retailers
            .find_by_id(holder.retailer_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!("retailer {} does not exist", holder.retailer_id))
            })?;

        Ok((holder, retailer.into()))
    }
}

/// Exponential backoff with jitter: base * 2^(attempts-1) plus up to 25%.
fn backoff(base_secs: u64, attempts: i32) -> ChronoDuration {
    let exponent = attempts.saturating_sub(1).clamp(0, 10) as u32;
    let delay_secs = base_secs.saturating_mul(2u64.saturating_pow(exponent));
    let jitter = rand::thread_rng().gen_range(0..=delay_secs / 4 + 1);
    ChronoDuration::seconds((delay_secs + jitter).min(86_400) as i64)
}

#[async_trait::async_trait]
impl Job for TaskRunnerJob {
    fn name(&self) -> &'static str {
        "task_runner"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        let claimed = self
            .tasks
            .claim_due(self.core.task_batch_size)
            .await
            .map_err(|err| format!("Failed to claim tasks: {err}"))?;

        if claimed.is_empty() {
            return Ok(());
        }

        info!(count = claimed.len(), "Claimed tasks");

        for entity in claimed {
            let task_id = entity.id;
            match entity.into_domain() {
                Some(task) => self.run_task(task).await,
                None => {
                    // Unknown type: likely written by a newer deployment.
                    // Put it back for whoever understands it.
                    warn!(task_id, "Unknown task type, releasing claim");
                    let next = Utc::now() + ChronoDuration::minutes(5);
                    if let Err(err) = self.tasks.reschedule(task_id, next, "unknown task type").await
                    {
                        warn!(task_id, "Failed to release task: {err}");
                    }
                }
            }
        }

        Ok(())
    }
}

fn param_i64(params: &JsonValue, key: &str) -> Result<i64, TaskError> {
    params
        .get(key)
        .and_then(JsonValue::as_i64)
        .ok_or_else(|| TaskError::Permanent(format!("task params missing '{key}'")))
}

fn param_str<'a>(params: &'a JsonValue, key: &str) -> Result<&'a str, TaskError> {
    params
        .get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| TaskError::Permanent(format!("task params missing '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backoff_grows_with_attempts() {
        let first = backoff(60, 1);
        let third = backoff(60, 3);
        assert!(first >= ChronoDuration::seconds(60));
        assert!(third >= ChronoDuration::seconds(240));
        assert!(third <= ChronoDuration::seconds(300 + 86_400));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert!(backoff(3600, 30) <= ChronoDuration::seconds(86_400));
    }

    #[test]
    fn test_param_extraction() {
        let params = json!({"account_holder_id": 7, "account_number": "TEST0000000001"});
        assert_eq!(param_i64(&params, "account_holder_id").unwrap(), 7);
        assert_eq!(param_str(&params, "account_number").unwrap(), "TEST0000000001");
        assert!(param_i64(&params, "missing").is_err());
        assert!(param_str(&params, "account_holder_id").is_err());
    }

    #[test]
    fn test_job_frequency() {
        let freq = JobFrequency::Seconds(10);
        assert_eq!(freq.duration().as_secs(), 10);
    }
}
