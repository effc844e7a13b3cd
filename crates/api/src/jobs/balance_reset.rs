//! Balance reset background job.
//!
//! Campaign balances carry an optional reset date derived from the
//! retailer's balance lifespan. Once the date arrives the balance returns
//! to zero and the date rolls forward by another lifespan.

use chrono::{Days, Utc};
use sqlx::PgPool;
use tracing::info;

use domain::services::activity as activities;
use persistence::repositories::BalanceRepository;

use crate::config::CoreConfig;
use crate::services::ActivityPublisher;

use super::scheduler::{Job, JobFrequency};

/// Background job resetting expired campaign balances.
pub struct BalanceResetJob {
    core: CoreConfig,
    balances: BalanceRepository,
    publisher: ActivityPublisher,
}

impl BalanceResetJob {
    /// Create a new balance reset job.
    pub fn new(pool: PgPool, core: CoreConfig) -> Self {
        Self {
            balances: BalanceRepository::new(pool.clone()),
            publisher: ActivityPublisher::new(pool),
            core,
        }
    }
}

#[async_trait::async_trait]
impl Job for BalanceResetJob {
    fn name(&self) -> &'static str {
        "balance_reset"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let today = Utc::now().date_naive();
        let due = self
            .balances
            .due_for_reset(today, self.core.job_batch_size)
            .await
            .map_err(|err| format!("Failed to load due balances: {err}"))?;

        if due.is_empty() {
            return Ok(());
        }

        let mut reset = 0usize;
        let mut collected = Vec::new();
        for row in due {
            let next_reset = row
                .balance_lifespan
                .map(|days| today + Days::new(days.max(0) as u64));

            let applied = self
                .balances
                .reset_balance(row.id, row.reset_date, next_reset)
                .await
                .map_err(|err| format!("Failed to reset balance: {err}"))?;
            if !applied {
                continue;
            }
            reset += 1;

            if row.balance != 0 {
                collected.push(activities::balance_change(
                    &row.retailer_slug,
                    &row.retailer_name,
                    &row.campaign_slug,
                    &row.campaign_name,
                    row.loyalty_type,
                    row.account_holder_uuid,
                    row.balance,
                    0,
                    "Balance lifespan reached".to_string(),
                    Utc::now(),
                ));
            }
        }

        self.publisher.publish_and_wait(collected).await;

        info!(reset, "Reset expired campaign balances");
        Ok(())
    }
}
