//! Transaction processing service.
//!
//! Drives the transaction-to-balance-to-reward pipeline: validates the
//! request against retailer/account/store state, records the transaction
//! idempotently, applies earns to balances under row locks, creates
//! pending rewards or reward-issuance tasks at goal crossings, and absorbs
//! refunds through the ledger.
//!
//! Everything between recording the transaction and the final balance
//! write happens inside one database transaction. Balance rows are locked
//! in ascending campaign id order; pending rewards of a pair are only
//! locked while that pair's balance lock is held. Activities are published
//! and the task runner picks up enqueued tasks only after commit.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use domain::models::{Activity, CampaignWithRules, Retailer, RewardRule, TaskType};
use domain::services::earn::{self, EarnResult};
use domain::services::ledger::{self, PendingMutation, PendingSnapshot};
use domain::services::activity as activities;
use domain::ServiceError;
use persistence::entities::{AccountHolderEntity, CampaignBalanceEntity};
use persistence::repositories::{
    AccountHolderRepository, BalanceRepository, CampaignRepository, NewTask, NewTransaction,
    PendingRewardRepository, RetailerRepository, TaskRepository, TransactionRepository,
};

use crate::config::CoreConfig;
use crate::services::ActivityPublisher;

/// An incoming transaction request, already shape-validated by the route.
#[derive(Debug, Clone)]
pub struct IncomingTransaction {
    pub transaction_id: String,
    pub amount: i64,
    pub mid: String,
    pub datetime: DateTime<Utc>,
    pub account_holder_uuid: Uuid,
    pub payment_transaction_id: Option<String>,
}

/// Caller-visible outcome of an accepted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Awarded,
    ThresholdNotMet,
    RefundAccepted,
    RefundsNotAccepted,
}

impl TransactionOutcome {
    /// The response body consumers of the legacy platform already parse.
    pub fn response_message(&self) -> &'static str {
        match self {
            TransactionOutcome::Awarded => "Awarded",
            TransactionOutcome::ThresholdNotMet => "Threshold not met",
            TransactionOutcome::RefundAccepted => "Refund accepted",
            TransactionOutcome::RefundsNotAccepted => "Refunds not accepted",
        }
    }

    fn from_adjustments(any_accepted: bool, is_refund: bool) -> Self {
        match (any_accepted, is_refund) {
            (true, true) => TransactionOutcome::RefundAccepted,
            (true, false) => TransactionOutcome::Awarded,
            (false, true) => TransactionOutcome::RefundsNotAccepted,
            (false, false) => TransactionOutcome::ThresholdNotMet,
        }
    }
}

/// Service handling incoming transactions.
#[derive(Clone)]
pub struct TransactionService {
    pool: PgPool,
    config: CoreConfig,
    publisher: ActivityPublisher,
    retailers: RetailerRepository,
    account_holders: AccountHolderRepository,
    campaigns: CampaignRepository,
    balances: BalanceRepository,
    pending_rewards: PendingRewardRepository,
    transactions: TransactionRepository,
    tasks: TaskRepository,
}

impl TransactionService {
    pub fn new(pool: PgPool, config: CoreConfig, publisher: ActivityPublisher) -> Self {
        Self {
            retailers: RetailerRepository::new(pool.clone()),
            account_holders: AccountHolderRepository::new(pool.clone()),
            campaigns: CampaignRepository::new(pool.clone()),
            balances: BalanceRepository::new(pool.clone()),
            pending_rewards: PendingRewardRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            pool,
            config,
            publisher,
        }
    }

    /// Process an incoming transaction for a retailer.
    ///
    /// Transient lock failures retry the entire operation; nothing partial
    /// is ever visible because each attempt is one database transaction.
    pub async fn process(
        &self,
        retailer_slug: &str,
        request: IncomingTransaction,
    ) -> Result<TransactionOutcome, ServiceError> {
        let mut attempt = 0;
        let result = loop {
            match self.process_once(retailer_slug, &request).await {
                Err(err) if err.is_transient() && attempt + 1 < self.config.max_lock_retries => {
                    attempt += 1;
                    warn!(
                        retailer = retailer_slug,
                        transaction_id = %request.transaction_id,
                        attempt,
                        "Retrying transaction after transient failure: {err}"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.config.lock_retry_backoff_ms * u64::from(attempt),
                    ))
                    .await;
                }
                Err(err) if err.is_transient() => {
                    break Err(ServiceError::LockContention { attempts: attempt + 1 });
                }
                other => break other,
            }
        };

        if let Err(err) = &result {
            self.publisher.publish(vec![activities::tx_import(
                retailer_slug,
                &request.transaction_id,
                request.amount,
                request.datetime,
                Vec::new(),
                false,
                Some(err.code()),
            )]);
        }

        result
    }

    async fn process_once(
        &self,
        retailer_slug: &str,
        request: &IncomingTransaction,
    ) -> Result<TransactionOutcome, ServiceError> {
        let retailer: Retailer = self
            .retailers
            .find_by_slug(retailer_slug)
            .await?
            .ok_or(ServiceError::RetailerNotFound)?
            .into();
        if !retailer.accepts_transactions() {
            return Err(ServiceError::InactiveRetailer);
        }

        let account_holder = self
            .account_holders
            .find_by_uuid(retailer.id, request.account_holder_uuid)
            .await?
            .ok_or(ServiceError::AccountHolderNotFound)?;
        if account_holder.status != domain::models::AccountHolderStatus::Active {
            return Err(ServiceError::AccountHolderNotActive);
        }
        if account_holder.created_at > request.datetime {
            return Err(ServiceError::InvalidTxDate);
        }

        let store_name = self
            .retailers
            .find_store_name_by_mid(retailer.id, &request.mid)
            .await?
            .ok_or(ServiceError::NoMatchingStore)?;

        let campaigns: Vec<CampaignWithRules> = self
            .campaigns
            .find_active_with_rules(retailer.id)
            .await?
            .into_iter()
            .map(CampaignWithRules::from)
            .filter(|cwr| cwr.campaign.is_live_at(request.datetime))
            .collect();
        if campaigns.is_empty() {
            return Err(ServiceError::NoActiveCampaigns);
        }

        let new_transaction = NewTransaction {
            account_holder_id: account_holder.id,
            retailer_id: retailer.id,
            transaction_id: request.transaction_id.clone(),
            amount: request.amount,
            mid: request.mid.clone(),
            datetime: request.datetime,
            payment_transaction_id: request.payment_transaction_id.clone(),
        };

        let mut tx = self.pool.begin().await?;

        let Some(transaction) = self.transactions.insert_processed(&mut tx, &new_transaction).await?
        else {
            // Record the duplicate submission alongside the original, then
            // reject. A third submission is rejected without a new row.
            self.transactions.insert_duplicate(&mut tx, &new_transaction).await?;
            tx.commit().await?;
            return Err(ServiceError::DuplicateTransaction);
        };

        let earns = earn::compute_earns(request.amount, &campaigns);
        let outcome = self
            .apply_earns(&mut tx, &retailer, &account_holder, &campaigns, &earns, transaction.id, request)
            .await?;

        tx.commit().await?;

        let is_refund = request.amount < 0;
        let any_accepted = earns.iter().any(|earn| earn.accepted);

        let mut post_commit = vec![
            activities::processed_tx(
                &retailer.slug,
                &retailer.name,
                account_holder.account_holder_uuid,
                &transaction.clone().into(),
                &store_name,
                &earns,
            ),
            activities::tx_import(
                &retailer.slug,
                &request.transaction_id,
                request.amount,
                request.datetime,
                earns.iter().map(|earn| earn.campaign_slug.clone()).collect(),
                is_refund && !any_accepted,
                None,
            ),
        ];
        post_commit.extend(outcome);
        self.publisher.publish(post_commit);

        info!(
            retailer = %retailer.slug,
            transaction_id = %request.transaction_id,
            amount = request.amount,
            accepted = any_accepted,
            "Transaction processed"
        );

        Ok(TransactionOutcome::from_adjustments(any_accepted, is_refund))
    }

    /// Apply earns to balances under row locks. Returns the activities to
    /// publish after commit.
    #[allow(clippy::too_many_arguments)]
    async fn apply_earns(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer: &Retailer,
        account_holder: &AccountHolderEntity,
        campaigns: &[CampaignWithRules],
        earns: &[EarnResult],
        transaction_pk: i64,
        request: &IncomingTransaction,
    ) -> Result<Vec<Activity>, ServiceError> {
        // Campaign ids ascending; find_active_with_rules orders by id.
        let campaign_ids: Vec<i64> = campaigns.iter().map(|cwr| cwr.campaign.id).collect();

        self.balances
            .create_missing(tx, account_holder.id, &campaign_ids, balance_reset_date(retailer))
            .await?;
        let locked = self
            .balances
            .lock_for_update(tx, account_holder.id, &campaign_ids)
            .await?;
        let mut balances_by_campaign: HashMap<i64, CampaignBalanceEntity> =
            locked.into_iter().map(|row| (row.campaign_id, row)).collect();

        let earns_by_campaign: HashMap<i64, &EarnResult> =
            earns.iter().map(|earn| (earn.campaign_id, earn)).collect();

        let mut collected = Vec::new();
        let mut issuance_tasks = Vec::new();

        for cwr in campaigns {
            let campaign = &cwr.campaign;
            let Some(earn) = earns_by_campaign.get(&campaign.id) else {
                continue;
            };

            self.transactions
                .record_earn(
                    tx,
                    transaction_pk,
                    campaign.id,
                    campaign.loyalty_type,
                    earn.amount,
                )
                .await?;

            if !earn.accepted || earn.amount == 0 {
                continue;
            }

            let Some(balance_row) = balances_by_campaign.remove(&campaign.id) else {
                continue;
            };
            let original_balance = balance_row.balance;

            let new_balance = if earn.amount < 0 {
                self.apply_refund(tx, retailer, cwr, &balance_row, earn, account_holder, request, &mut collected)
                    .await?
            } else {
                self.apply_purchase(tx, retailer, cwr, &balance_row, earn, account_holder, request, &mut collected, &mut issuance_tasks)
                    .await?
            };

            if new_balance != original_balance {
                self.balances.update_balance(tx, balance_row.id, new_balance).await?;
                let reason_prefix = if earn.amount < 0 { "Refund" } else { "Purchase" };
                collected.push(activities::balance_change(
                    &retailer.slug,
                    &retailer.name,
                    &campaign.slug,
                    &campaign.name,
                    campaign.loyalty_type,
                    account_holder.account_holder_uuid,
                    original_balance,
                    new_balance,
                    format!("{reason_prefix} transaction id: {}", request.transaction_id),
                    request.datetime,
                ));
            }
        }

        if !issuance_tasks.is_empty() {
            self.tasks.enqueue_many(tx, &issuance_tasks).await?;
        }

        Ok(collected)
    }

    /// Apply a positive earn: add, detect goal crossings, owe rewards.
    /// Returns the new balance.
    #[allow(clippy::too_many_arguments)]
    async fn apply_purchase(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer: &Retailer,
        cwr: &CampaignWithRules,
        balance_row: &CampaignBalanceEntity,
        earn: &EarnResult,
        account_holder: &AccountHolderEntity,
        request: &IncomingTransaction,
        collected: &mut Vec<Activity>,
        issuance_tasks: &mut Vec<NewTask>,
    ) -> Result<i64, ServiceError> {
        let mut new_balance = balance_row.balance + earn.amount;

        let Some(reward_rule) = &cwr.reward_rule else {
            return Ok(new_balance);
        };

        let tally = ledger::rewards_achieved(new_balance, earn.amount, reward_rule);
        if tally.crossings == 0 {
            return Ok(new_balance);
        }

        if tally.cap_reached {
            info!(
                campaign = %cwr.campaign.slug,
                cap = ?reward_rule.reward_cap,
                transaction_id = %request.transaction_id,
                "Transaction reward cap reached"
            );
        }

        if reward_rule.uses_pending_rewards() {
            let conversion_date = conversion_date(request.datetime, reward_rule);
            for plan in ledger::plan_pending_rewards(&tally, reward_rule) {
                let pending = self
                    .pending_rewards
                    .create(
                        tx,
                        account_holder.id,
                        cwr.campaign.id,
                        reward_rule.reward_config_id,
                        plan.value,
                        plan.count,
                        plan.total_cost_to_user,
                        request.datetime,
                        conversion_date,
                    )
                    .await?;
                collected.push(activities::pending_reward_status(
                    &retailer.slug,
                    &retailer.name,
                    &cwr.campaign.slug,
                    &cwr.campaign.name,
                    account_holder.account_holder_uuid,
                    pending.pending_reward_uuid,
                    plan.count,
                    "pending",
                    "Reward goal met",
                    request.datetime,
                ));
            }
        } else {
            for _ in 0..tally.crossings {
                issuance_tasks.push(NewTask::new(
                    TaskType::RewardIssuance,
                    json!({
                        "account_holder_id": account_holder.id,
                        "campaign_id": cwr.campaign.id,
                        "reward_config_id": reward_rule.reward_config_id,
                        "reason": "GOAL_MET",
                    }),
                    self.config.task_max_attempts,
                ));
            }
        }

        new_balance -= tally.balance_deduction;
        Ok(new_balance)
    }

    /// Apply a negative earn by absorbing it through the ledger. Returns
    /// the new balance.
    #[allow(clippy::too_many_arguments)]
    async fn apply_refund(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer: &Retailer,
        cwr: &CampaignWithRules,
        balance_row: &CampaignBalanceEntity,
        earn: &EarnResult,
        account_holder: &AccountHolderEntity,
        request: &IncomingTransaction,
        collected: &mut Vec<Activity>,
    ) -> Result<i64, ServiceError> {
        let locked_pending = self
            .pending_rewards
            .lock_for_account_campaign(tx, account_holder.id, cwr.campaign.id)
            .await?;
        let snapshots: Vec<PendingSnapshot> = locked_pending
            .iter()
            .map(|row| PendingSnapshot {
                id: row.id,
                pending_reward_uuid: row.pending_reward_uuid,
                value: row.value,
                count: row.count,
                total_cost_to_user: row.total_cost_to_user,
            })
            .collect();

        let outcome = ledger::absorb_refund(-earn.amount, balance_row.balance, &snapshots);

        // Rows that end up deleted or shrunk are reported as deletions;
        // their interim cost updates are not separately reported.
        let removed: std::collections::HashSet<Uuid> = outcome
            .mutations
            .iter()
            .filter_map(|mutation| match mutation {
                PendingMutation::Shrink { pending_reward_uuid, .. }
                | PendingMutation::Delete { pending_reward_uuid, .. } => Some(*pending_reward_uuid),
                PendingMutation::SetTotalCost { .. } => None,
            })
            .collect();

        for mutation in &outcome.mutations {
            match mutation {
                PendingMutation::SetTotalCost {
                    id,
                    pending_reward_uuid,
                    total_cost_to_user,
                    original_total_cost_to_user,
                } => {
                    self.pending_rewards.update_total_cost(tx, *id, *total_cost_to_user).await?;
                    if !removed.contains(pending_reward_uuid) {
                        collected.push(activities::pending_reward_cost_updated(
                            &retailer.slug,
                            &cwr.campaign.slug,
                            account_holder.account_holder_uuid,
                            *pending_reward_uuid,
                            *original_total_cost_to_user,
                            *total_cost_to_user,
                            request.datetime,
                        ));
                    }
                }
                PendingMutation::Shrink {
                    id,
                    pending_reward_uuid,
                    count,
                    total_cost_to_user,
                    deleted_count,
                } => {
                    self.pending_rewards.shrink(tx, *id, *count, *total_cost_to_user).await?;
                    collected.push(activities::pending_reward_status(
                        &retailer.slug,
                        &retailer.name,
                        &cwr.campaign.slug,
                        &cwr.campaign.name,
                        account_holder.account_holder_uuid,
                        *pending_reward_uuid,
                        *deleted_count,
                        "deleted",
                        "Pending reward removed due to refund",
                        request.datetime,
                    ));
                }
                PendingMutation::Delete { id, pending_reward_uuid, deleted_count } => {
                    self.pending_rewards.delete(tx, *id).await?;
                    collected.push(activities::pending_reward_status(
                        &retailer.slug,
                        &retailer.name,
                        &cwr.campaign.slug,
                        &cwr.campaign.name,
                        account_holder.account_holder_uuid,
                        *pending_reward_uuid,
                        *deleted_count,
                        "deleted",
                        "Pending reward removed due to refund",
                        request.datetime,
                    ));
                }
            }
        }

        if outcome.amount_not_recouped > 0 {
            collected.push(activities::refund_not_recouped(
                &retailer.slug,
                &retailer.name,
                &cwr.campaign.slug,
                account_holder.account_holder_uuid,
                earn.amount,
                outcome.amount_not_recouped,
                &request.transaction_id,
                request.datetime,
            ));
        }

        Ok(outcome.balance)
    }
}

/// The reset date stamped onto balance rows created on demand.
fn balance_reset_date(retailer: &Retailer) -> Option<NaiveDate> {
    retailer
        .balance_lifespan
        .map(|days| Utc::now().date_naive() + Days::new(days.max(0) as u64))
}

/// The date an allocation-window pending reward becomes convertible.
fn conversion_date(earned_at: DateTime<Utc>, rule: &RewardRule) -> NaiveDate {
    earned_at.date_naive() + Days::new(rule.allocation_window.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_adjustments() {
        assert_eq!(
            TransactionOutcome::from_adjustments(true, false),
            TransactionOutcome::Awarded
        );
        assert_eq!(
            TransactionOutcome::from_adjustments(true, true),
            TransactionOutcome::RefundAccepted
        );
        assert_eq!(
            TransactionOutcome::from_adjustments(false, false),
            TransactionOutcome::ThresholdNotMet
        );
        assert_eq!(
            TransactionOutcome::from_adjustments(false, true),
            TransactionOutcome::RefundsNotAccepted
        );
    }

    #[test]
    fn test_response_messages() {
        assert_eq!(TransactionOutcome::Awarded.response_message(), "Awarded");
        assert_eq!(
            TransactionOutcome::RefundsNotAccepted.response_message(),
            "Refunds not accepted"
        );
    }

    #[test]
    fn test_conversion_date_adds_allocation_window() {
        let rule = RewardRule {
            id: 1,
            campaign_id: 1,
            reward_goal: 500,
            allocation_window: 14,
            reward_cap: None,
            reward_config_id: 1,
        };
        let earned_at = "2026-08-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            conversion_date(earned_at, &rule),
            "2026-08-15".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn test_balance_reset_date_only_with_lifespan() {
        let mut retailer = Retailer {
            id: 1,
            slug: "test-retailer".into(),
            name: "Test Retailer".into(),
            status: domain::models::RetailerStatus::Active,
            loyalty_name: "points".into(),
            account_number_prefix: "TEST".into(),
            account_number_length: 10,
            balance_lifespan: None,
            callback_url: None,
            callback_secret: None,
        };
        assert!(balance_reset_date(&retailer).is_none());

        retailer.balance_lifespan = Some(30);
        let expected = Utc::now().date_naive() + Days::new(30);
        assert_eq!(balance_reset_date(&retailer), Some(expected));
    }
}
