//! Activity outbox repository for database operations.

use domain::models::Activity;
use sqlx::PgPool;

use crate::metrics::QueryTimer;

/// Repository for activity outbox database operations.
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of activity records.
    ///
    /// Called after the owning ledger transaction has committed; a failure
    /// here is logged by the publisher and never rolls the ledger back.
    pub async fn insert_many(&self, activities: &[Activity]) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_activities");

        for activity in activities {
            sqlx::query(
                r#"
                INSERT INTO activity (
                    activity_uuid, activity_type, underlying_datetime,
                    retailer_slug, account_holder_uuid, campaign_slugs,
                    summary, reason, payload
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(activity.activity_uuid)
            .bind(activity.activity_type.to_string())
            .bind(activity.underlying_datetime)
            .bind(&activity.retailer_slug)
            .bind(activity.account_holder_uuid)
            .bind(&activity.campaign_slugs)
            .bind(&activity.summary)
            .bind(&activity.reason)
            .bind(&activity.payload)
            .execute(&self.pool)
            .await?;
        }

        timer.record();
        Ok(())
    }

    /// Number of unpublished activity rows, for readiness reporting.
    pub async fn unpublished_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM activity WHERE published = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }
}
