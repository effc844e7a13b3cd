//! Campaign lifecycle service.
//!
//! Drives the campaign status state machine (DRAFT -> ACTIVE ->
//! ENDED/CANCELLED) and its cascading effects on balances, pending rewards
//! and issued rewards. The campaign row is locked for the whole operation
//! so concurrent status changes for the same campaign serialize; all
//! mutations and the status update commit atomically.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};

use domain::models::{
    Activity, CampaignStatus, CampaignWithRules, PendingRewardsAction, Retailer, RetailerStatus,
    TaskType,
};
use domain::services::activity as activities;
use domain::ServiceError;
use persistence::repositories::{
    BalanceRepository, CampaignRepository, NewTask, PendingRewardRepository, RetailerRepository,
    RewardRepository, TaskRepository,
};

use crate::config::CoreConfig;
use crate::services::ActivityPublisher;

/// A campaign status-change request.
#[derive(Debug, Clone)]
pub struct StatusChangeRequest {
    pub campaign_slug: String,
    pub requested_status: CampaignStatus,
    pub pending_rewards_action: PendingRewardsAction,
    pub sso_username: String,
}

/// Service handling campaign lifecycle transitions.
#[derive(Clone)]
pub struct CampaignService {
    pool: PgPool,
    config: CoreConfig,
    publisher: ActivityPublisher,
    retailers: RetailerRepository,
    campaigns: CampaignRepository,
    balances: BalanceRepository,
    pending_rewards: PendingRewardRepository,
    rewards: RewardRepository,
    tasks: TaskRepository,
}

impl CampaignService {
    pub fn new(pool: PgPool, config: CoreConfig, publisher: ActivityPublisher) -> Self {
        Self {
            retailers: RetailerRepository::new(pool.clone()),
            campaigns: CampaignRepository::new(pool.clone()),
            balances: BalanceRepository::new(pool.clone()),
            pending_rewards: PendingRewardRepository::new(pool.clone()),
            rewards: RewardRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            pool,
            config,
            publisher,
        }
    }

    /// Apply a status change for a retailer's campaign.
    ///
    /// A failed precondition leaves no partial state change; transient lock
    /// failures retry the whole operation.
    pub async fn handle_status_change(
        &self,
        retailer_slug: &str,
        request: StatusChangeRequest,
    ) -> Result<(), ServiceError> {
        let mut attempt = 0;
        loop {
            match self.handle_once(retailer_slug, &request).await {
                Err(err) if err.is_transient() && attempt + 1 < self.config.max_lock_retries => {
                    attempt += 1;
                    warn!(
                        retailer = retailer_slug,
                        campaign = %request.campaign_slug,
                        attempt,
                        "Retrying status change after transient failure: {err}"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.config.lock_retry_backoff_ms * u64::from(attempt),
                    ))
                    .await;
                }
                Err(err) if err.is_transient() => {
                    return Err(ServiceError::LockContention { attempts: attempt + 1 });
                }
                other => return other,
            }
        }
    }

    async fn handle_once(
        &self,
        retailer_slug: &str,
        request: &StatusChangeRequest,
    ) -> Result<(), ServiceError> {
        let retailer: Retailer = self
            .retailers
            .find_by_slug(retailer_slug)
            .await?
            .ok_or(ServiceError::RetailerNotFound)?
            .into();

        let mut tx = self.pool.begin().await?;

        let cwr: CampaignWithRules = self
            .campaigns
            .find_by_slug_for_update(&mut tx, retailer.id, &request.campaign_slug)
            .await?
            .ok_or(ServiceError::CampaignNotFound)?
            .into();

        self.check_preconditions(&mut tx, &retailer, &cwr, request.requested_status).await?;

        let mut collected: Vec<Activity> = Vec::new();
        let requested = request.requested_status;
        let now = Utc::now();

        // Pending rewards are dealt with before the status flips, mirroring
        // the order effects become visible to concurrent readers.
        if matches!(requested, CampaignStatus::Ended | CampaignStatus::Cancelled) {
            self.handle_pending_rewards(&mut tx, &retailer, &cwr, request, &mut collected).await?;
        }

        self.campaigns.update_status(&mut tx, cwr.campaign.id, requested, now).await?;
        collected.push(activities::campaign_status_change(
            &retailer.slug,
            &cwr.campaign.slug,
            &cwr.campaign.name,
            cwr.campaign.status,
            requested,
            &request.sso_username,
            now,
        ));

        match requested {
            CampaignStatus::Active => {
                let reset_date = retailer
                    .balance_lifespan
                    .map(|days| now.date_naive() + chrono::Days::new(days.max(0) as u64));
                let created = self
                    .balances
                    .create_for_campaign(&mut tx, retailer.id, cwr.campaign.id, reset_date)
                    .await?;
                info!(campaign = %cwr.campaign.slug, created, "Created campaign balances");
            }
            CampaignStatus::Ended | CampaignStatus::Cancelled => {
                let deleted = self.balances.delete_for_campaign(&mut tx, cwr.campaign.id).await?;
                info!(campaign = %cwr.campaign.slug, deleted, "Deleted campaign balances");
            }
            CampaignStatus::Draft => {}
        }

        if requested == CampaignStatus::Cancelled {
            let cancelled = self.rewards.cancel_for_campaign(&mut tx, cwr.campaign.id, now).await?;
            info!(campaign = %cwr.campaign.slug, cancelled = cancelled.len(), "Cancelled issued rewards");
            for row in cancelled {
                collected.push(activities::reward_status(
                    &retailer.slug,
                    Some(&cwr.campaign.slug),
                    row.account_holder_uuid,
                    row.reward_uuid,
                    "issued",
                    "cancelled",
                    "Reward cancelled due to campaign cancellation",
                    row.cancelled_date.unwrap_or(now),
                ));
            }
        }

        tx.commit().await?;

        self.publisher.publish(collected);

        info!(
            retailer = %retailer.slug,
            campaign = %cwr.campaign.slug,
            from = %cwr.campaign.status,
            to = %requested,
            "Campaign status changed"
        );

        Ok(())
    }

    /// Transition legality, activation requirements, and the
    /// remaining-active-campaign guard.
    async fn check_preconditions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer: &Retailer,
        cwr: &CampaignWithRules,
        requested: CampaignStatus,
    ) -> Result<(), ServiceError> {
        if !cwr.campaign.status.can_transition_to(requested) {
            return Err(ServiceError::InvalidStatusRequested);
        }

        if requested == CampaignStatus::Active && !cwr.is_activable() {
            return Err(ServiceError::MissingCampaignComponents);
        }

        // Taking an ACTIVE campaign out of service must not leave a
        // non-TEST retailer without any active campaign.
        if matches!(requested, CampaignStatus::Ended | CampaignStatus::Cancelled)
            && cwr.campaign.status == CampaignStatus::Active
            && retailer.status != RetailerStatus::Test
        {
            let remaining = self
                .campaigns
                .count_other_active(tx, retailer.id, cwr.campaign.id)
                .await?;
            if remaining == 0 {
                return Err(ServiceError::InvalidStatusRequested);
            }
        }

        Ok(())
    }

    /// Dispose of the campaign's pending rewards: convert to issuance
    /// tasks on `convert` + ENDED, delete otherwise. Cancellation always
    /// deletes.
    async fn handle_pending_rewards(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer: &Retailer,
        cwr: &CampaignWithRules,
        request: &StatusChangeRequest,
        collected: &mut Vec<Activity>,
    ) -> Result<(), ServiceError> {
        let uses_pending = cwr
            .reward_rule
            .as_ref()
            .map(|rule| rule.uses_pending_rewards())
            .unwrap_or(false);
        if !uses_pending {
            return Ok(());
        }

        let convert = request.pending_rewards_action == PendingRewardsAction::Convert
            && request.requested_status == CampaignStatus::Ended;

        let deleted = self.pending_rewards.delete_for_campaign(tx, cwr.campaign.id).await?;
        if deleted.is_empty() {
            return Ok(());
        }

        if convert {
            let mut issuance_tasks = Vec::new();
            for row in &deleted {
                for _ in 0..row.count {
                    issuance_tasks.push(NewTask::new(
                        TaskType::RewardIssuance,
                        json!({
                            "account_holder_id": row.account_holder_id,
                            "campaign_id": cwr.campaign.id,
                            "reward_config_id": row.reward_config_id,
                            "reason": "CONVERTED",
                            "pending_reward_uuid": row.pending_reward_uuid,
                        }),
                        self.config.task_max_attempts,
                    ));
                }
            }
            info!(
                campaign = %cwr.campaign.slug,
                tasks = issuance_tasks.len(),
                "Converting pending rewards into reward issuance"
            );
            self.tasks.enqueue_many(tx, &issuance_tasks).await?;
        } else {
            let now = Utc::now();
            for row in &deleted {
                collected.push(activities::pending_reward_status(
                    &retailer.slug,
                    &retailer.name,
                    &cwr.campaign.slug,
                    &cwr.campaign.name,
                    row.account_holder_uuid,
                    row.pending_reward_uuid,
                    row.count,
                    "deleted",
                    "Pending reward removed due to campaign end",
                    now,
                ));
            }
        }

        Ok(())
    }
}
