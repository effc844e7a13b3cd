//! Retailer repository for database operations.

use sqlx::PgPool;

use crate::entities::RetailerEntity;
use crate::metrics::QueryTimer;

/// Repository for retailer database operations.
#[derive(Clone)]
pub struct RetailerRepository {
    pool: PgPool,
}

impl RetailerRepository {
    /// Creates a new RetailerRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a retailer by its slug.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<RetailerEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_retailer_by_slug");

        let result = sqlx::query_as::<_, RetailerEntity>(
            r#"
            SELECT id, slug, name, status, loyalty_name, account_number_prefix,
                   account_number_length, balance_lifespan, callback_url,
                   callback_secret, created_at, updated_at
            FROM retailer
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Find a retailer by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<RetailerEntity>, sqlx::Error> {
        sqlx::query_as::<_, RetailerEntity>(
            r#"
            SELECT id, slug, name, status, loyalty_name, account_number_prefix,
                   account_number_length, balance_lifespan, callback_url,
                   callback_secret, created_at, updated_at
            FROM retailer
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Look up the store name registered for a mid under this retailer.
    ///
    /// Returns None when the mid is not a store of the retailer; the
    /// transaction service rejects such transactions.
    pub async fn find_store_name_by_mid(
        &self,
        retailer_id: i64,
        mid: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let timer = QueryTimer::new("find_store_name_by_mid");

        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT store_name
            FROM retailer_store
            WHERE retailer_id = $1 AND mid = $2
            "#,
        )
        .bind(retailer_id)
        .bind(mid)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }
}
