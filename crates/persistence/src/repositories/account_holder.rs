//! Account holder repository for database operations.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::AccountHolderEntity;
use crate::metrics::QueryTimer;

const ACCOUNT_HOLDER_COLUMNS: &str = r#"
    id, account_holder_uuid, retailer_id, email, status, account_number,
    opt_out_token, created_at, updated_at
"#;

/// Repository for account holder database operations.
#[derive(Clone)]
pub struct AccountHolderRepository {
    pool: PgPool,
}

impl AccountHolderRepository {
    /// Creates a new AccountHolderRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an account holder by public uuid within a retailer.
    ///
    /// The retailer scoping means a uuid belonging to another retailer
    /// behaves exactly like an unknown uuid.
    pub async fn find_by_uuid(
        &self,
        retailer_id: i64,
        account_holder_uuid: Uuid,
    ) -> Result<Option<AccountHolderEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_account_holder_by_uuid");

        let result = sqlx::query_as::<_, AccountHolderEntity>(&format!(
            r#"
            SELECT {ACCOUNT_HOLDER_COLUMNS}
            FROM account_holder
            WHERE retailer_id = $1 AND account_holder_uuid = $2
            "#
        ))
        .bind(retailer_id)
        .bind(account_holder_uuid)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Find an account holder by internal id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<AccountHolderEntity>, sqlx::Error> {
        sqlx::query_as::<_, AccountHolderEntity>(&format!(
            r#"
            SELECT {ACCOUNT_HOLDER_COLUMNS}
            FROM account_holder
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Enrol a new PENDING account holder.
    ///
    /// Fails with a unique violation when the (email, retailer) pair
    /// already exists; the service maps that to AccountExists.
    pub async fn create_pending(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        retailer_id: i64,
        email: &str,
    ) -> Result<AccountHolderEntity, sqlx::Error> {
        sqlx::query_as::<_, AccountHolderEntity>(&format!(
            r#"
            INSERT INTO account_holder (
                account_holder_uuid, retailer_id, email, status, opt_out_token
            )
            VALUES ($1, $2, $3, 'PENDING', $4)
            RETURNING {ACCOUNT_HOLDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(retailer_id)
        .bind(email)
        .bind(Uuid::new_v4())
        .fetch_one(&mut **tx)
        .await
    }

    /// Activate a PENDING account holder with its assigned account number.
    ///
    /// Returns false when the row was not PENDING (already activated by a
    /// retried task, or failed in the meantime).
    pub async fn activate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_holder_id: i64,
        account_number: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE account_holder
            SET status = 'ACTIVE', account_number = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(account_holder_id)
        .bind(account_number)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an account holder's activation as permanently failed.
    pub async fn mark_failed(&self, account_holder_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE account_holder
            SET status = 'FAILED', updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(account_holder_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
