//! Pending reward conversion background job.
//!
//! Pending rewards whose conversion date has arrived become reward
//! issuance tasks. Deletion of the pending row and insertion of its tasks
//! happen in one database transaction so a crash cannot double-issue or
//! drop a reward.

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use domain::models::TaskType;
use persistence::repositories::{NewTask, PendingRewardRepository, TaskRepository};

use crate::config::CoreConfig;

use super::scheduler::{Job, JobFrequency};

/// Background job converting due pending rewards into issued rewards.
pub struct PendingRewardConversionJob {
    pool: PgPool,
    core: CoreConfig,
    pending_rewards: PendingRewardRepository,
    tasks: TaskRepository,
}

impl PendingRewardConversionJob {
    /// Create a new conversion job.
    pub fn new(pool: PgPool, core: CoreConfig) -> Self {
        Self {
            pending_rewards: PendingRewardRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            pool,
            core,
        }
    }
}

#[async_trait::async_trait]
impl Job for PendingRewardConversionJob {
    fn name(&self) -> &'static str {
        "pending_reward_conversion"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let today = Utc::now().date_naive();
        let due = self
            .pending_rewards
            .due_for_conversion(today, self.core.job_batch_size)
            .await
            .map_err(|err| format!("Failed to load due pending rewards: {err}"))?;

        if due.is_empty() {
            return Ok(());
        }

        let mut converted = 0usize;
        for pending in due {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|err| format!("Failed to begin transaction: {err}"))?;

            let existed = self
                .pending_rewards
                .delete(&mut tx, pending.id)
                .await
                .map_err(|err| format!("Failed to delete pending reward: {err}"))?;
            if !existed {
                // Removed concurrently by a refund or campaign end.
                tx.rollback()
                    .await
                    .map_err(|err| format!("Failed to roll back: {err}"))?;
                continue;
            }

            let issuance_tasks: Vec<NewTask> = (0..pending.count)
                .map(|_| {
                    NewTask::new(
                        TaskType::RewardIssuance,
                        json!({
                            "account_holder_id": pending.account_holder_id,
                            "campaign_id": pending.campaign_id,
                            "reward_config_id": pending.reward_config_id,
                            "reason": "CONVERTED",
                            "pending_reward_uuid": pending.pending_reward_uuid,
                        }),
                        self.core.task_max_attempts,
                    )
                })
                .collect();
            self.tasks
                .enqueue_many(&mut tx, &issuance_tasks)
                .await
                .map_err(|err| format!("Failed to enqueue issuance tasks: {err}"))?;

            tx.commit()
                .await
                .map_err(|err| format!("Failed to commit conversion: {err}"))?;
            converted += 1;
        }

        info!(converted, "Converted due pending rewards");
        Ok(())
    }
}
