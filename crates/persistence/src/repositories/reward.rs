//! Reward repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::entities::{CancelledRewardRow, RewardConfigEntity, RewardEntity};
use crate::metrics::QueryTimer;

const REWARD_COLUMNS: &str = r#"
    id, reward_uuid, reward_config_id, retailer_id, account_holder_id,
    campaign_id, code, issued_date, expiry_date, redeemed_date,
    cancelled_date, deleted
"#;

/// Repository for reward database operations.
#[derive(Clone)]
pub struct RewardRepository {
    pool: PgPool,
}

impl RewardRepository {
    /// Creates a new RewardRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a reward config by id.
    pub async fn find_config_by_id(
        &self,
        reward_config_id: i64,
    ) -> Result<Option<RewardConfigEntity>, sqlx::Error> {
        sqlx::query_as::<_, RewardConfigEntity>(
            r#"
            SELECT id, retailer_id, slug, validity_days
            FROM reward_config
            WHERE id = $1
            "#,
        )
        .bind(reward_config_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Claim one unallocated reward code for the config.
    ///
    /// SKIP LOCKED lets concurrent issuance tasks each claim distinct
    /// stock without queueing on one another. None means the stock is
    /// exhausted and the issuance task should retry later.
    pub async fn claim_unallocated(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reward_config_id: i64,
    ) -> Result<Option<RewardEntity>, sqlx::Error> {
        let timer = QueryTimer::new("claim_unallocated_reward");

        let result = sqlx::query_as::<_, RewardEntity>(&format!(
            r#"
            SELECT {REWARD_COLUMNS}
            FROM reward
            WHERE reward_config_id = $1
              AND account_holder_id IS NULL
              AND deleted = FALSE
            ORDER BY id ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .bind(reward_config_id)
        .fetch_optional(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Issue a claimed reward to an account holder.
    pub async fn mark_issued(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reward_id: i64,
        account_holder_id: i64,
        campaign_id: Option<i64>,
        issued_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
    ) -> Result<RewardEntity, sqlx::Error> {
        sqlx::query_as::<_, RewardEntity>(&format!(
            r#"
            UPDATE reward
            SET account_holder_id = $2, campaign_id = $3,
                issued_date = $4, expiry_date = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(reward_id)
        .bind(account_holder_id)
        .bind(campaign_id)
        .bind(issued_date)
        .bind(expiry_date)
        .fetch_one(&mut **tx)
        .await
    }

    /// Soft-cancel every issued, unredeemed, unexpired reward of a
    /// campaign by stamping its cancelled date. Rows are kept.
    pub async fn cancel_for_campaign(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CancelledRewardRow>, sqlx::Error> {
        let timer = QueryTimer::new("cancel_rewards_for_campaign");

        let result = sqlx::query_as::<_, CancelledRewardRow>(
            r#"
            UPDATE reward r
            SET cancelled_date = $2, updated_at = NOW()
            FROM account_holder ah
            WHERE r.campaign_id = $1
              AND r.account_holder_id = ah.id
              AND r.issued_date IS NOT NULL
              AND r.redeemed_date IS NULL
              AND r.cancelled_date IS NULL
              AND r.deleted = FALSE
              AND (r.expiry_date IS NULL OR r.expiry_date >= $2)
            RETURNING r.reward_uuid, ah.account_holder_uuid, r.cancelled_date
            "#,
        )
        .bind(campaign_id)
        .bind(now)
        .fetch_all(&mut **tx)
        .await;

        timer.record();
        result
    }
}
