//! Campaign status-change endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use validator::Validate;

use domain::models::{CampaignStatus, PendingRewardsAction};
use shared::validation::validate_slug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::campaign::StatusChangeRequest;

/// Operator identity attached to the change for the activity stream.
#[derive(Debug, Deserialize, Validate)]
pub struct ActivityMetadata {
    #[validate(length(min = 1, max = 128))]
    pub sso_username: String,
}

/// Campaign status-change payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CampaignStatusChangeRequest {
    #[validate(custom(function = "validate_slug"))]
    pub campaign_slug: String,

    pub requested_status: CampaignStatus,

    /// What to do with pending rewards when ending; defaults to removal.
    pub pending_rewards_action: Option<PendingRewardsAction>,

    #[validate(nested)]
    pub activity_metadata: ActivityMetadata,
}

/// POST /loyalty/{retailer_slug}/campaigns/status_change
pub async fn change_campaign_status(
    State(state): State<AppState>,
    Path(retailer_slug): Path<String>,
    Json(request): Json<CampaignStatusChangeRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    request.validate()?;

    state
        .campaign_service
        .handle_status_change(
            &retailer_slug,
            StatusChangeRequest {
                campaign_slug: request.campaign_slug,
                requested_status: request.requested_status,
                pending_rewards_action: request
                    .pending_rewards_action
                    .unwrap_or(PendingRewardsAction::Remove),
                sso_username: request.activity_metadata.sso_username,
            },
        )
        .await?;

    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CampaignStatusChangeRequest {
        CampaignStatusChangeRequest {
            campaign_slug: "summer-stamps".into(),
            requested_status: CampaignStatus::Active,
            pending_rewards_action: None,
            activity_metadata: ActivityMetadata { sso_username: "ops@example.com".into() },
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_bad_slug_fails_validation() {
        let mut request = valid_request();
        request.campaign_slug = "Bad Slug!".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_empty_username_fails_validation() {
        let mut request = valid_request();
        request.activity_metadata.sso_username = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: CampaignStatusChangeRequest = serde_json::from_value(json!({
            "campaign_slug": "summer-stamps",
            "requested_status": "ENDED",
            "pending_rewards_action": "convert",
            "activity_metadata": {"sso_username": "ops@example.com"},
        }))
        .unwrap();
        assert_eq!(request.requested_status, CampaignStatus::Ended);
        assert_eq!(request.pending_rewards_action, Some(PendingRewardsAction::Convert));
    }
}
