//! Transaction domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ingested purchase or refund event.
///
/// `processed` is a tri-state flag: `Some(true)` = counted toward earn,
/// `Some(false)` = recorded as a rejected duplicate, `None` = pending.
/// Uniqueness on (transaction_id, retailer_id, processed) lets a duplicate
/// submission be recorded alongside the processed original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub transaction_uuid: Uuid,
    pub account_holder_id: i64,
    pub retailer_id: i64,
    /// External transaction id as supplied by the merchant feed.
    pub transaction_id: String,
    /// Signed pence; negative = refund.
    pub amount: i64,
    /// Merchant store identifier.
    pub mid: String,
    pub datetime: DateTime<Utc>,
    pub payment_transaction_id: Option<String>,
    pub processed: Option<bool>,
}

impl Transaction {
    /// Whether this transaction is a refund.
    pub fn is_refund(&self) -> bool {
        self.amount < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(amount: i64) -> Transaction {
        Transaction {
            id: 1,
            transaction_uuid: Uuid::new_v4(),
            account_holder_id: 1,
            retailer_id: 1,
            transaction_id: "tx-0001".into(),
            amount,
            mid: "store-1".into(),
            datetime: Utc::now(),
            payment_transaction_id: None,
            processed: Some(true),
        }
    }

    #[test]
    fn test_is_refund() {
        assert!(transaction(-100).is_refund());
        assert!(!transaction(100).is_refund());
    }
}
