//! Transaction repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::LoyaltyType;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::TransactionEntity;
use crate::metrics::QueryTimer;

const TRANSACTION_COLUMNS: &str = r#"
    id, transaction_uuid, account_holder_id, retailer_id, transaction_id,
    amount, mid, datetime, payment_transaction_id, processed
"#;

/// Input data for recording an incoming transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_holder_id: i64,
    pub retailer_id: i64,
    pub transaction_id: String,
    pub amount: i64,
    pub mid: String,
    pub datetime: DateTime<Utc>,
    pub payment_transaction_id: Option<String>,
}

/// Repository for transaction database operations.
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an incoming transaction as processed.
    ///
    /// The unique index on (transaction_id, retailer_id, processed) makes
    /// this the idempotency gate: a resubmission conflicts with the
    /// already-processed row and returns None instead of inserting.
    pub async fn insert_processed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: &NewTransaction,
    ) -> Result<Option<TransactionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("insert_transaction");
        let result = self.insert(tx, input, Some(true)).await;
        timer.record();
        result
    }

    /// Record a duplicate submission alongside the processed original.
    ///
    /// `processed = FALSE` keeps the row outside the processed uniqueness
    /// slot. A second duplicate conflicts with the first and is simply not
    /// recorded again (None).
    pub async fn insert_duplicate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: &NewTransaction,
    ) -> Result<Option<TransactionEntity>, sqlx::Error> {
        self.insert(tx, input, Some(false)).await
    }

    async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: &NewTransaction,
        processed: Option<bool>,
    ) -> Result<Option<TransactionEntity>, sqlx::Error> {
        sqlx::query_as::<_, TransactionEntity>(&format!(
            r#"
            INSERT INTO transaction (
                transaction_uuid, account_holder_id, retailer_id,
                transaction_id, amount, mid, datetime,
                payment_transaction_id, processed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (transaction_id, retailer_id, processed) DO NOTHING
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.account_holder_id)
        .bind(input.retailer_id)
        .bind(&input.transaction_id)
        .bind(input.amount)
        .bind(&input.mid)
        .bind(input.datetime)
        .bind(&input.payment_transaction_id)
        .bind(processed)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Record the earn a processed transaction produced for one campaign.
    ///
    /// Written for every active campaign, with amount 0 when the earn rule
    /// did not accept the transaction.
    pub async fn record_earn(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transaction_pk: i64,
        campaign_id: i64,
        loyalty_type: LoyaltyType,
        earn_amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO transaction_earn (transaction_id, campaign_id, loyalty_type, earn_amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(transaction_pk)
        .bind(campaign_id)
        .bind(loyalty_type)
        .bind(earn_amount)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
