//! Pending reward repository for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{DeletedPendingRewardRow, PendingRewardEntity};
use crate::metrics::QueryTimer;

const PENDING_REWARD_COLUMNS: &str = r#"
    id, pending_reward_uuid, account_holder_id, campaign_id,
    reward_config_id, value, count, total_cost_to_user,
    created_date, conversion_date
"#;

/// Repository for pending reward database operations.
#[derive(Clone)]
pub struct PendingRewardRepository {
    pool: PgPool,
}

impl PendingRewardRepository {
    /// Creates a new PendingRewardRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock and load the pending rewards of an (account holder, campaign)
    /// pair, newest first.
    ///
    /// Always called while the pair's balance row is already locked, which
    /// serializes contenders before they reach these rows.
    pub async fn lock_for_account_campaign(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_holder_id: i64,
        campaign_id: i64,
    ) -> Result<Vec<PendingRewardEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_pending_rewards");

        let result = sqlx::query_as::<_, PendingRewardEntity>(&format!(
            r#"
            SELECT {PENDING_REWARD_COLUMNS}
            FROM pending_reward
            WHERE account_holder_id = $1 AND campaign_id = $2
            ORDER BY created_date DESC
            FOR UPDATE
            "#
        ))
        .bind(account_holder_id)
        .bind(campaign_id)
        .fetch_all(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Create one pending reward row.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_holder_id: i64,
        campaign_id: i64,
        reward_config_id: i64,
        value: i64,
        count: i64,
        total_cost_to_user: i64,
        created_date: DateTime<Utc>,
        conversion_date: NaiveDate,
    ) -> Result<PendingRewardEntity, sqlx::Error> {
        sqlx::query_as::<_, PendingRewardEntity>(&format!(
            r#"
            INSERT INTO pending_reward (
                pending_reward_uuid, account_holder_id, campaign_id,
                reward_config_id, value, count, total_cost_to_user,
                created_date, conversion_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PENDING_REWARD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(account_holder_id)
        .bind(campaign_id)
        .bind(reward_config_id)
        .bind(value)
        .bind(count)
        .bind(total_cost_to_user)
        .bind(created_date)
        .bind(conversion_date)
        .fetch_one(&mut **tx)
        .await
    }

    /// Update a row's total cost to user (refund slush absorption).
    pub async fn update_total_cost(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        pending_reward_id: i64,
        total_cost_to_user: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE pending_reward
            SET total_cost_to_user = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(pending_reward_id)
        .bind(total_cost_to_user)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Shrink a row's count after part of its value absorbed a refund.
    pub async fn shrink(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        pending_reward_id: i64,
        count: i64,
        total_cost_to_user: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE pending_reward
            SET count = $2, total_cost_to_user = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(pending_reward_id)
        .bind(count)
        .bind(total_cost_to_user)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Delete one pending reward row.
    ///
    /// Returns whether the row still existed.
    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        pending_reward_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_reward WHERE id = $1")
            .bind(pending_reward_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every pending reward of a campaign, returning what was
    /// deleted for activity reporting and reward conversion.
    pub async fn delete_for_campaign(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: i64,
    ) -> Result<Vec<DeletedPendingRewardRow>, sqlx::Error> {
        let timer = QueryTimer::new("delete_pending_rewards_for_campaign");

        let result = sqlx::query_as::<_, DeletedPendingRewardRow>(
            r#"
            DELETE FROM pending_reward pr
            USING account_holder ah
            WHERE pr.campaign_id = $1 AND pr.account_holder_id = ah.id
            RETURNING pr.pending_reward_uuid, pr.account_holder_id,
                      ah.account_holder_uuid, pr.reward_config_id, pr.count
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Pending rewards due for conversion into issued rewards.
    pub async fn due_for_conversion(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<PendingRewardEntity>, sqlx::Error> {
        sqlx::query_as::<_, PendingRewardEntity>(&format!(
            r#"
            SELECT {PENDING_REWARD_COLUMNS}
            FROM pending_reward
            WHERE conversion_date <= $1
            ORDER BY conversion_date ASC
            LIMIT $2
            "#
        ))
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

}
