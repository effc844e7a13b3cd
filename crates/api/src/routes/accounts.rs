//! Account enrolment endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Enrolment payload.
#[derive(Debug, Deserialize, Validate)]
pub struct EnrolmentRequest {
    #[validate(email)]
    pub email: String,
}

/// Enrolment acknowledgement; activation completes asynchronously.
#[derive(Debug, Serialize)]
pub struct EnrolmentResponse {
    pub account_holder_uuid: Uuid,
    pub status: String,
}

/// POST /loyalty/{retailer_slug}/accounts/enrolment
pub async fn enrol_account_holder(
    State(state): State<AppState>,
    Path(retailer_slug): Path<String>,
    Json(request): Json<EnrolmentRequest>,
) -> Result<(StatusCode, Json<EnrolmentResponse>), ApiError> {
    request.validate()?;

    let account_holder = state
        .account_service
        .enrol(&retailer_slug, &request.email)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnrolmentResponse {
            account_holder_uuid: account_holder.account_holder_uuid,
            status: account_holder.status.to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email_passes() {
        let request = EnrolmentRequest { email: "customer@example.com".into() };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_invalid_email_fails_validation() {
        let request = EnrolmentRequest { email: "not-an-email".into() };
        assert!(request.validate().is_err());
    }
}
