//! Transaction ingest endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::transaction::IncomingTransaction;
use shared::validation::{validate_amount, validate_transaction_id};

/// Incoming transaction payload.
#[derive(Debug, Deserialize, Validate)]
pub struct TransactionRequest {
    #[validate(custom(function = "validate_transaction_id"))]
    pub id: String,

    /// Signed minor currency units; negative = refund.
    #[validate(custom(function = "validate_amount"))]
    pub transaction_total: i64,

    #[validate(length(min = 1, max = 128))]
    pub mid: String,

    pub datetime: DateTime<Utc>,

    pub loyalty_id: Uuid,

    #[validate(length(max = 128))]
    pub transaction_id: Option<String>,
}

/// POST /loyalty/{retailer_slug}/transactions
pub async fn process_transaction(
    State(state): State<AppState>,
    Path(retailer_slug): Path<String>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<&'static str>, ApiError> {
    request.validate()?;

    let outcome = state
        .transaction_service
        .process(
            &retailer_slug,
            IncomingTransaction {
                transaction_id: request.id,
                amount: request.transaction_total,
                mid: request.mid,
                datetime: request.datetime,
                account_holder_uuid: request.loyalty_id,
                payment_transaction_id: request.transaction_id,
            },
        )
        .await?;

    Ok(Json(outcome.response_message()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> TransactionRequest {
        TransactionRequest {
            id: "tx-0001".into(),
            transaction_total: 1250,
            mid: "store-0001".into(),
            datetime: Utc::now(),
            loyalty_id: Uuid::new_v4(),
            transaction_id: Some("payment-0001".into()),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_zero_amount_fails_validation() {
        let mut request = valid_request();
        request.transaction_total = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_negative_amount_is_a_valid_refund() {
        let mut request = valid_request();
        request.transaction_total = -1250;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_mid_fails_validation() {
        let mut request = valid_request();
        request.mid = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_oversized_transaction_id_fails_validation() {
        let mut request = valid_request();
        request.id = "x".repeat(129);
        assert!(request.validate().is_err());
    }
}
