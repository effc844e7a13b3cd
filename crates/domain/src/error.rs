//! Domain error taxonomy.
//!
//! Every service-layer failure maps onto one of these variants. The HTTP
//! layer translates them into status codes and stable error codes without
//! inspecting message strings.

use thiserror::Error;

/// Errors surfaced by the core services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("retailer not found")]
    RetailerNotFound,

    #[error("retailer is in an inactive state")]
    InactiveRetailer,

    #[error("account holder not found")]
    AccountHolderNotFound,

    #[error("account holder is not active")]
    AccountHolderNotActive,

    #[error("account already exists for this retailer")]
    AccountExists,

    #[error("transaction dated before account holder enrolment")]
    InvalidTxDate,

    #[error("transaction store is not registered for this retailer")]
    NoMatchingStore,

    #[error("no active campaigns found for retailer")]
    NoActiveCampaigns,

    #[error("duplicate transaction")]
    DuplicateTransaction,

    #[error("campaign not found")]
    CampaignNotFound,

    #[error("the requested status change could not be performed")]
    InvalidStatusRequested,

    #[error("the campaign could not be made active")]
    MissingCampaignComponents,

    #[error("validation failed: {}", fields.join(", "))]
    Validation { fields: Vec<String> },

    #[error("operation could not acquire row locks after {attempts} attempts")]
    LockContention { attempts: u32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Stable error code, as surfaced to API callers and recorded on
    /// transaction-import activities.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::RetailerNotFound => "INVALID_RETAILER",
            ServiceError::InactiveRetailer => "INACTIVE_RETAILER",
            ServiceError::AccountHolderNotFound => "USER_NOT_FOUND",
            ServiceError::AccountHolderNotActive => "USER_NOT_ACTIVE",
            ServiceError::AccountExists => "ACCOUNT_EXISTS",
            ServiceError::InvalidTxDate => "INVALID_TX_DATE",
            ServiceError::NoMatchingStore => "NO_MATCHING_STORE",
            ServiceError::NoActiveCampaigns => "NO_ACTIVE_CAMPAIGNS",
            ServiceError::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            ServiceError::CampaignNotFound => "NO_CAMPAIGN_FOUND",
            ServiceError::InvalidStatusRequested => "INVALID_STATUS_REQUESTED",
            ServiceError::MissingCampaignComponents => "MISSING_CAMPAIGN_COMPONENTS",
            ServiceError::Validation { .. } => "FIELD_VALIDATION_ERROR",
            ServiceError::LockContention { .. } => "TRANSIENT_ERROR",
            ServiceError::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error is a transient concurrency failure that warrants
    /// retrying the whole logical operation.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Database(err) => is_transient_db_error(err),
            ServiceError::LockContention { .. } => true,
            _ => false,
        }
    }
}

/// Postgres error codes that indicate a retryable concurrency failure:
/// serialization failure, deadlock detected, lock not available.
const TRANSIENT_SQLSTATE: [&str; 3] = ["40001", "40P01", "55P03"];

/// Whether a database error is a retryable concurrency failure.
pub fn is_transient_db_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| TRANSIENT_SQLSTATE.contains(&code.as_ref()))
            .unwrap_or(false),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// Whether a database error is a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().map(|code| code.as_ref() == "23505").unwrap_or(false)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_fields() {
        let err = ServiceError::Validation {
            fields: vec!["amount".into(), "mid".into()],
        };
        assert_eq!(err.to_string(), "validation failed: amount, mid");
    }

    #[test]
    fn test_lock_contention_is_transient() {
        assert!(ServiceError::LockContention { attempts: 3 }.is_transient());
    }

    #[test]
    fn test_conflict_errors_are_not_transient() {
        assert!(!ServiceError::DuplicateTransaction.is_transient());
        assert!(!ServiceError::InvalidStatusRequested.is_transient());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ServiceError::DuplicateTransaction.code(), "DUPLICATE_TRANSACTION");
        assert_eq!(ServiceError::CampaignNotFound.code(), "NO_CAMPAIGN_FOUND");
        assert_eq!(
            ServiceError::MissingCampaignComponents.code(),
            "MISSING_CAMPAIGN_COMPONENTS"
        );
        assert_eq!(ServiceError::NoMatchingStore.code(), "NO_MATCHING_STORE");
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        assert!(!is_transient_db_error(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(is_transient_db_error(&sqlx::Error::PoolTimedOut));
    }
}
