use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::ServiceError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Validation error")]
    Validation { fields: Vec<String> },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body mirroring what downstream consumers of the legacy platform
/// already parse: a stable code, a display message, and optionally the
/// offending field names.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    display_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,
}

fn service_error_response(err: &ServiceError) -> (StatusCode, &'static str) {
    match err {
        ServiceError::RetailerNotFound => {
            (StatusCode::FORBIDDEN, "Requested retailer is invalid.")
        }
        ServiceError::InactiveRetailer => {
            (StatusCode::NOT_FOUND, "Retailer is in an inactive state.")
        }
        ServiceError::AccountHolderNotFound => (StatusCode::NOT_FOUND, "Unknown User."),
        ServiceError::AccountHolderNotActive => {
            (StatusCode::CONFLICT, "User Account not Active.")
        }
        ServiceError::AccountExists => (
            StatusCode::CONFLICT,
            "It appears this account already exists.",
        ),
        ServiceError::InvalidTxDate => (
            StatusCode::BAD_REQUEST,
            "Transaction dated before user join.",
        ),
        ServiceError::NoMatchingStore => (
            StatusCode::NOT_FOUND,
            "Transaction store is not registered for this retailer.",
        ),
        ServiceError::NoActiveCampaigns => (
            StatusCode::NOT_FOUND,
            "No active campaigns found for retailer.",
        ),
        ServiceError::DuplicateTransaction => (StatusCode::CONFLICT, "Duplicate Transaction."),
        ServiceError::CampaignNotFound => (
            StatusCode::NOT_FOUND,
            "Campaign not found for provided slug.",
        ),
        ServiceError::InvalidStatusRequested => (
            StatusCode::CONFLICT,
            "The requested status change could not be performed.",
        ),
        ServiceError::MissingCampaignComponents => (
            StatusCode::CONFLICT,
            "The provided campaign could not be made active.",
        ),
        ServiceError::Validation { .. } => {
            (StatusCode::BAD_REQUEST, "Submitted fields are invalid.")
        }
        ServiceError::LockContention { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "The request could not be completed, please retry.",
        ),
        ServiceError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error occurred.",
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, display_message, fields) = match &self {
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED".to_string(),
                msg.clone(),
                None,
            ),
            ApiError::Service(err) => {
                if let ServiceError::Database(db_err) = err {
                    tracing::error!("Database error: {}", db_err);
                }
                let (status, message) = service_error_response(err);
                let fields = match err {
                    ServiceError::Validation { fields } => Some(fields.clone()),
                    _ => None,
                };
                (status, err.code().to_string(), message.to_string(), fields)
            }
            ApiError::Validation { fields } => (
                StatusCode::BAD_REQUEST,
                "FIELD_VALIDATION_ERROR".to_string(),
                "Submitted fields are invalid.".to_string(),
                Some(fields.clone()),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
                    "An internal error occurred.".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody { code, display_message, fields };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();

        ApiError::Validation { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = ApiError::Unauthorized("missing token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_not_found_errors_map_to_404() {
        for err in [
            ServiceError::InactiveRetailer,
            ServiceError::AccountHolderNotFound,
            ServiceError::NoActiveCampaigns,
            ServiceError::CampaignNotFound,
            ServiceError::NoMatchingStore,
        ] {
            let response = ApiError::Service(err).into_response();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_conflict_errors_map_to_409() {
        for err in [
            ServiceError::DuplicateTransaction,
            ServiceError::InvalidStatusRequested,
            ServiceError::MissingCampaignComponents,
            ServiceError::AccountHolderNotActive,
            ServiceError::AccountExists,
        ] {
            let response = ApiError::Service(err).into_response();
            assert_eq!(response.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_invalid_retailer_maps_to_403() {
        let response = ApiError::Service(ServiceError::RetailerNotFound).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_lock_contention_maps_to_503() {
        let response =
            ApiError::Service(ServiceError::LockContention { attempts: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_validation_error_maps_to_400() {
        let response = ApiError::Validation { fields: vec!["amount".into()] }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_error_maps_to_500() {
        let response =
            ApiError::Service(ServiceError::Database(sqlx::Error::RowNotFound)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
