//! Account holder enrolment and activation.
//!
//! Enrolment creates a PENDING account holder and an activation task in
//! one database transaction. Activation runs later on the task runner:
//! it assigns the account number, creates balances for the retailer's
//! active campaigns, flips the status to ACTIVE and queues the enrolment
//! callback and welcome email.

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use domain::error::is_unique_violation;
use domain::models::{AccountHolder, Retailer, TaskType};
use domain::services::activity as activities;
use domain::ServiceError;
use persistence::repositories::{
    AccountHolderRepository, BalanceRepository, CampaignRepository, NewTask, RetailerRepository,
    TaskRepository,
};

use crate::config::CoreConfig;
use crate::services::{ActivityPublisher, TaskError};

/// Tries for a free account number before giving the attempt up.
const ACCOUNT_NUMBER_TRIES: u32 = 5;

/// Service handling account holder enrolment and activation.
#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
    config: CoreConfig,
    publisher: ActivityPublisher,
    retailers: RetailerRepository,
    account_holders: AccountHolderRepository,
    campaigns: CampaignRepository,
    balances: BalanceRepository,
    tasks: TaskRepository,
}

impl AccountService {
    pub fn new(pool: PgPool, config: CoreConfig, publisher: ActivityPublisher) -> Self {
        Self {
            retailers: RetailerRepository::new(pool.clone()),
            account_holders: AccountHolderRepository::new(pool.clone()),
            campaigns: CampaignRepository::new(pool.clone()),
            balances: BalanceRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            pool,
            config,
            publisher,
        }
    }

    /// Enrol a new account holder for a retailer.
    ///
    /// Returns the PENDING account holder; activation happens
    /// asynchronously via the enqueued task.
    pub async fn enrol(
        &self,
        retailer_slug: &str,
        email: &str,
    ) -> Result<AccountHolder, ServiceError> {
        let retailer: Retailer = self
            .retailers
            .find_by_slug(retailer_slug)
            .await?
            .ok_or(ServiceError::RetailerNotFound)?
            .into();
        if !retailer.accepts_transactions() {
            return Err(ServiceError::InactiveRetailer);
        }

        let email = email.trim().to_lowercase();

        let mut tx = self.pool.begin().await?;

        let created = self
            .account_holders
            .create_pending(&mut tx, retailer.id, &email)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    ServiceError::AccountExists
                } else {
                    ServiceError::Database(err)
                }
            })?;

        self.tasks
            .enqueue_many(
                &mut tx,
                &[NewTask::new(
                    TaskType::AccountActivation,
                    json!({ "account_holder_id": created.id }),
                    self.config.task_max_attempts,
                )],
            )
            .await?;

        tx.commit().await?;

        info!(
            retailer = %retailer.slug,
            account_holder = %created.account_holder_uuid,
            "Account holder enrolled"
        );

        Ok(created.into())
    }

    /// Activate a PENDING account holder. Task handler; must be
    /// idempotent under task retries.
    pub async fn activate(&self, account_holder_id: i64) -> Result<(), TaskError> {
        let holder = self
            .account_holders
            .find_by_id(account_holder_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!("account holder {account_holder_id} does not exist"))
            })?;

        match holder.status {
            domain::models::AccountHolderStatus::Pending => {}
            // A retried task after a commit-then-crash: nothing left to do.
            domain::models::AccountHolderStatus::Active => return Ok(()),
            other => {
                return Err(TaskError::Permanent(format!(
                    "account holder {account_holder_id} is {other}, not activatable"
                )));
            }
        }

        let retailer: Retailer = self
            .retailers
            .find_by_id(holder.retailer_id)
            .await
            .map_err(TaskError::from_db)?
            .ok_or_else(|| {
                TaskError::Permanent(format!("retailer {} does not exist", holder.retailer_id))
            })?
            .into();

        let mut last_err: Option<sqlx::Error> = None;
        for _ in 0..ACCOUNT_NUMBER_TRIES {
            let account_number = shared::account_number::generate(
                &retailer.account_number_prefix,
                retailer.account_number_length.max(0) as usize,
            );
            match self.try_activate(&holder, &retailer, &account_number).await {
                Ok(()) => return Ok(()),
                Err(err) if is_unique_violation(&err) => {
                    warn!(account_number, "Account number collision, regenerating");
                    last_err = Some(err);
                }
                Err(err) => return Err(TaskError::from_db(err)),
            }
        }

        Err(TaskError::Retryable(format!(
            "could not find a free account number after {ACCOUNT_NUMBER_TRIES} tries: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn try_activate(
        &self,
        holder: &persistence::entities::AccountHolderEntity,
        retailer: &Retailer,
        account_number: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let activated = self
            .account_holders
            .activate(&mut tx, holder.id, account_number)
            .await?;
        if !activated {
            // Lost a race with another runner; treat as done.
            tx.rollback().await?;
            return Ok(());
        }

        let active_ids = self.campaigns.active_campaign_ids(&mut tx, retailer.id).await?;
        if !active_ids.is_empty() {
            let reset_date = retailer
                .balance_lifespan
                .map(|days| now.date_naive() + chrono::Days::new(days.max(0) as u64));
            self.balances
                .create_for_account_holder(&mut tx, holder.id, &active_ids, reset_date)
                .await?;
        }

        let mut follow_ups = vec![NewTask::new(
            TaskType::WelcomeEmail,
            json!({
                "account_holder_id": holder.id,
                "account_number": account_number,
            }),
            self.config.task_max_attempts,
        )];
        if retailer.callback_url.is_some() {
            follow_ups.push(NewTask::new(
                TaskType::EnrolmentCallback,
                json!({
                    "account_holder_id": holder.id,
                    "account_number": account_number,
                }),
                self.config.task_max_attempts,
            ));
        }
        self.tasks.enqueue_many(&mut tx, &follow_ups).await?;

        tx.commit().await?;

        self.publisher
            .publish_and_wait(vec![activities::account_enrolment(
                &retailer.slug,
                holder.account_holder_uuid,
                account_number,
                now,
            )])
            .await;

        info!(
            retailer = %retailer.slug,
            account_holder = %holder.account_holder_uuid,
            "Account holder activated"
        );

        Ok(())
    }
}
