//! Campaign repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::CampaignStatus;
use sqlx::{PgPool, Postgres, Transaction};

use crate::entities::CampaignRuleRow;
use crate::metrics::QueryTimer;

const CAMPAIGN_RULE_COLUMNS: &str = r#"
    c.id, c.retailer_id, c.slug, c.name, c.status, c.loyalty_type,
    c.start_date, c.end_date,
    er.id AS earn_rule_id, er.threshold, er.increment,
    er.increment_multiplier, er.max_amount,
    rr.id AS reward_rule_id, rr.reward_goal, rr.allocation_window,
    rr.reward_cap, rr.reward_config_id
"#;

/// Repository for campaign database operations.
#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    /// Creates a new CampaignRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock a campaign row by slug and load it with its rules.
    ///
    /// The row lock serializes concurrent status changes for the same
    /// campaign. A slug belonging to another retailer is indistinguishable
    /// from an unknown slug.
    pub async fn find_by_slug_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer_id: i64,
        slug: &str,
    ) -> Result<Option<CampaignRuleRow>, sqlx::Error> {
        let timer = QueryTimer::new("lock_campaign_by_slug");

        let result = sqlx::query_as::<_, CampaignRuleRow>(&format!(
            r#"
            SELECT {CAMPAIGN_RULE_COLUMNS}
            FROM campaign c
            LEFT JOIN earn_rule er ON er.campaign_id = c.id
            LEFT JOIN reward_rule rr ON rr.campaign_id = c.id
            WHERE c.slug = $1 AND c.retailer_id = $2
            FOR UPDATE OF c
            "#
        ))
        .bind(slug)
        .bind(retailer_id)
        .fetch_optional(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// All ACTIVE campaigns of a retailer with their rules, ordered by
    /// campaign id so downstream lock acquisition is deterministic.
    pub async fn find_active_with_rules(
        &self,
        retailer_id: i64,
    ) -> Result<Vec<CampaignRuleRow>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_campaigns");

        let result = sqlx::query_as::<_, CampaignRuleRow>(&format!(
            r#"
            SELECT {CAMPAIGN_RULE_COLUMNS}
            FROM campaign c
            LEFT JOIN earn_rule er ON er.campaign_id = c.id
            LEFT JOIN reward_rule rr ON rr.campaign_id = c.id
            WHERE c.retailer_id = $1 AND c.status = 'ACTIVE'
            ORDER BY c.id ASC
            "#
        ))
        .bind(retailer_id)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Ids of ACTIVE campaigns for a retailer, in ascending order.
    pub async fn active_campaign_ids(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM campaign
            WHERE retailer_id = $1 AND status = 'ACTIVE'
            ORDER BY id ASC
            "#,
        )
        .bind(retailer_id)
        .fetch_all(&mut **tx)
        .await
    }

    /// Number of ACTIVE campaigns for the retailer other than the given
    /// one. Backs the "a non-TEST retailer may never be left without an
    /// active campaign" guard.
    pub async fn count_other_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer_id: i64,
        campaign_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM campaign
            WHERE retailer_id = $1 AND status = 'ACTIVE' AND id <> $2
            "#,
        )
        .bind(retailer_id)
        .bind(campaign_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Apply a status change to a locked campaign row.
    ///
    /// Sets `start_date` on activation (only if unset) and `end_date` on
    /// ending or cancelling. Returns the row's new `updated_at`.
    pub async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: i64,
        new_status: CampaignStatus,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, sqlx::Error> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE campaign
            SET status = $2,
                start_date = CASE
                    WHEN $2 = 'ACTIVE'::campaign_status THEN COALESCE(start_date, $3)
                    ELSE start_date
                END,
                end_date = CASE
                    WHEN $2 IN ('ENDED'::campaign_status, 'CANCELLED'::campaign_status) THEN $3
                    ELSE end_date
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(campaign_id)
        .bind(new_status)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }
}
