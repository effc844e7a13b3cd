//! Campaign balance repository for database operations.
//!
//! Balance rows are the contention point of the whole pipeline. Every
//! method that locks them does so in ascending campaign id order; two
//! concurrent transactions touching overlapping campaign sets for the same
//! account holder therefore acquire locks in the same order and cannot
//! deadlock on each other.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::entities::{BalanceResetRow, CampaignBalanceEntity};
use crate::metrics::QueryTimer;

/// Repository for campaign balance database operations.
#[derive(Clone)]
pub struct BalanceRepository {
    pool: PgPool,
}

impl BalanceRepository {
    /// Creates a new BalanceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert missing balance rows for an account holder across campaigns.
    ///
    /// Runs before `lock_for_update` so that every campaign in the earn set
    /// has a row to lock. Existing rows are untouched.
    pub async fn create_missing(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_holder_id: i64,
        campaign_ids: &[i64],
        reset_date: Option<NaiveDate>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_balance (account_holder_id, campaign_id, balance, reset_date)
            SELECT $1, campaign_id, 0, $3
            FROM UNNEST($2::BIGINT[]) AS campaign_id
            ON CONFLICT (account_holder_id, campaign_id) DO NOTHING
            "#,
        )
        .bind(account_holder_id)
        .bind(campaign_ids)
        .bind(reset_date)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lock and load the balance rows for an account holder across the
    /// given campaigns.
    ///
    /// Rows are locked in ascending campaign id order regardless of the
    /// order of `campaign_ids`; callers must process them in the returned
    /// order.
    pub async fn lock_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_holder_id: i64,
        campaign_ids: &[i64],
    ) -> Result<Vec<CampaignBalanceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_balances");

        let result = sqlx::query_as::<_, CampaignBalanceEntity>(
            r#"
            SELECT id, account_holder_id, campaign_id, balance, reset_date,
                   created_at, updated_at
            FROM campaign_balance
            WHERE account_holder_id = $1 AND campaign_id = ANY($2)
            ORDER BY campaign_id ASC
            FOR UPDATE
            "#,
        )
        .bind(account_holder_id)
        .bind(campaign_ids)
        .fetch_all(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Persist a new balance value for a locked row.
    pub async fn update_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        balance_id: i64,
        new_balance: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE campaign_balance
            SET balance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(balance_id)
        .bind(new_balance)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Create zero balances for every ACTIVE account holder of the
    /// retailer who lacks one for this campaign. Used on campaign
    /// activation.
    pub async fn create_for_campaign(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer_id: i64,
        campaign_id: i64,
        reset_date: Option<NaiveDate>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_balance (account_holder_id, campaign_id, balance, reset_date)
            SELECT id, $2, 0, $3
            FROM account_holder
            WHERE retailer_id = $1 AND status = 'ACTIVE'
            ON CONFLICT (account_holder_id, campaign_id) DO NOTHING
            "#,
        )
        .bind(retailer_id)
        .bind(campaign_id)
        .bind(reset_date)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Create zero balances for one account holder across the given
    /// campaigns. Used on account holder activation.
    pub async fn create_for_account_holder(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_holder_id: i64,
        campaign_ids: &[i64],
        reset_date: Option<NaiveDate>,
    ) -> Result<u64, sqlx::Error> {
        self.create_missing(tx, account_holder_id, campaign_ids, reset_date)
            .await
    }

    /// Delete every balance row for a campaign. Used when the campaign
    /// ends or is cancelled.
    pub async fn delete_for_campaign(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM campaign_balance
            WHERE campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Balances whose reset date has arrived, joined onto their owners for
    /// activity reporting. For the scheduled reset job.
    pub async fn due_for_reset(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<BalanceResetRow>, sqlx::Error> {
        sqlx::query_as::<_, BalanceResetRow>(
            r#"
            SELECT cb.id, cb.balance, cb.reset_date,
                   ah.account_holder_uuid,
                   r.slug AS retailer_slug, r.name AS retailer_name,
                   r.balance_lifespan,
                   c.slug AS campaign_slug, c.name AS campaign_name,
                   c.loyalty_type
            FROM campaign_balance cb
            JOIN account_holder ah ON ah.id = cb.account_holder_id
            JOIN retailer r ON r.id = ah.retailer_id
            JOIN campaign c ON c.id = cb.campaign_id
            WHERE cb.reset_date IS NOT NULL AND cb.reset_date <= $1
            ORDER BY cb.reset_date ASC
            LIMIT $2
            "#,
        )
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Reset one balance to zero and roll its reset date forward.
    ///
    /// Guarded on the old reset date so a concurrent reset of the same row
    /// is a no-op; returns whether this call performed the reset.
    pub async fn reset_balance(
        &self,
        balance_id: i64,
        old_reset_date: NaiveDate,
        next_reset_date: Option<NaiveDate>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE campaign_balance
            SET balance = 0, reset_date = $3, updated_at = NOW()
            WHERE id = $1 AND reset_date = $2
            "#,
        )
        .bind(balance_id)
        .bind(old_reset_date)
        .bind(next_reset_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
