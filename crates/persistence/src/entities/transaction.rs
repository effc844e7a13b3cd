//! Transaction entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Transaction;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the transaction table.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionEntity {
    pub id: i64,
    pub transaction_uuid: Uuid,
    pub account_holder_id: i64,
    pub retailer_id: i64,
    pub transaction_id: String,
    pub amount: i64,
    pub mid: String,
    pub datetime: DateTime<Utc>,
    pub payment_transaction_id: Option<String>,
    pub processed: Option<bool>,
}

impl From<TransactionEntity> for Transaction {
    fn from(entity: TransactionEntity) -> Self {
        Self {
            id: entity.id,
            transaction_uuid: entity.transaction_uuid,
            account_holder_id: entity.account_holder_id,
            retailer_id: entity.retailer_id,
            transaction_id: entity.transaction_id,
            amount: entity.amount,
            mid: entity.mid,
            datetime: entity.datetime,
            payment_transaction_id: entity.payment_transaction_id,
            processed: entity.processed,
        }
    }
}
