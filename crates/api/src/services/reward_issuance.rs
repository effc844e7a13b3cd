//! Reward issuance.
//!
//! Issues one reward by claiming an unallocated code from the reward
//! config's stock. Runs on the task runner: exhausted stock is a
//! retryable failure so issuance resumes once codes are restocked.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use tracing::info;

use domain::services::activity as activities;
use persistence::repositories::{
    AccountHolderRepository, RetailerRepository, RewardRepository,
};

use crate::services::{ActivityPublisher, TaskError};

/// Parameters of a reward-issuance task.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RewardIssuanceParams {
    pub account_holder_id: i64,
    pub reward_config_id: i64,
    #[serde(default)]
    pub campaign_id: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Service issuing rewards from pre-loaded code stock.
#[derive(Clone)]
pub struct RewardIssuanceService {
    pool: PgPool,
    publisher: ActivityPublisher,
    rewards: RewardRepository,
    account_holders: AccountHolderRepository,
    retailers: RetailerRepository,
}

impl RewardIssuanceService {
    pub fn new(pool: PgPool, publisher: ActivityPublisher) -> Self {
        Self {
            rewards: RewardRepository::new(pool.clone()),
            account_holders: AccountHolderRepository::new(pool.clone()),
            retailers: RetailerRepository::new(pool.clone()),
            pool,
            publisher,
        }
    }

    /// Issue one reward. Task handler; each call claims distinct stock so
    /// N queued tasks issue N rewards.
    pub async fn issue(&self, params: RewardIssuanceParams) -> Result<(), TaskError> {
        let holder = self
            .account_holders
            .find_by_id(params.account_holder_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!(
                    "account holder {} does not exist",
                    params.account_holder_id
                ))
            })?;

        let config = self
            .rewards
            .find_config_by_id(params.reward_config_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!(
                    "reward config {} does not exist",
                    params.reward_config_id
                ))
            })?;

        let retailer = self
            .retailers
            .find_by_id(config.retailer_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!("retailer {} does not exist", config.retailer_id))
            })?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(TaskError::from_db)?;

        let claimed = self
            .rewards
            .claim_unallocated(&mut tx, config.id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Retryable(format!(
                    "no unallocated rewards left for config '{}'",
                    config.slug
                ))
            })?;

        let expiry = now + ChronoDuration::days(i64::from(config.validity_days));
        let issued = self
            .rewards
            .mark_issued(&mut tx, claimed.id, holder.id, params.campaign_id, now, expiry)
            .await
            .map_err(TaskError::from_db)?;

        tx.commit().await.map_err(TaskError::from_db)?;

        self.publisher
            .publish_and_wait(vec![activities::reward_status(
                &retailer.slug,
                None,
                holder.account_holder_uuid,
                issued.reward_uuid,
                "allocated",
                "issued",
                params.reason.as_deref().unwrap_or("GOAL_MET"),
                now,
            )])
            .await;

        info!(
            retailer = %retailer.slug,
            account_holder = %holder.account_holder_uuid,
            reward = %issued.reward_uuid,
            "Reward issued"
        );

        Ok(())
    }
}
