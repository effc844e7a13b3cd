//! Activity stream domain models.
//!
//! An activity is a structured record of something that happened to an
//! account holder, campaign or reward. Records are built by the pure
//! constructors in [`crate::services::activity`] and inserted into the
//! outbox only after the owning database transaction has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// The kinds of activity the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    /// A processed transaction and its per-campaign earns.
    TxHistory,
    /// Receipt of a transaction request, including rejected ones.
    TxImport,
    /// A campaign balance changed.
    BalanceChange,
    /// A refund could not be fully absorbed.
    RefundNotRecouped,
    /// A campaign changed status.
    CampaignStatusChange,
    /// A reward or pending reward changed status.
    RewardStatus,
    /// An account holder completed enrolment.
    AccountEnrolment,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityType::TxHistory => "TX_HISTORY",
            ActivityType::TxImport => "TX_IMPORT",
            ActivityType::BalanceChange => "BALANCE_CHANGE",
            ActivityType::RefundNotRecouped => "REFUND_NOT_RECOUPED",
            ActivityType::CampaignStatusChange => "CAMPAIGN_STATUS_CHANGE",
            ActivityType::RewardStatus => "REWARD_STATUS",
            ActivityType::AccountEnrolment => "ACCOUNT_ENROLMENT",
        };
        write!(f, "{name}")
    }
}

/// A structured activity record bound for the activity stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_uuid: Uuid,
    pub activity_type: ActivityType,
    /// When the underlying event happened (not when the record was built).
    pub underlying_datetime: DateTime<Utc>,
    pub retailer_slug: String,
    pub account_holder_uuid: Option<Uuid>,
    pub campaign_slugs: Vec<String>,
    pub summary: String,
    pub reason: Option<String>,
    pub payload: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_display() {
        assert_eq!(ActivityType::TxHistory.to_string(), "TX_HISTORY");
        assert_eq!(
            ActivityType::RefundNotRecouped.to_string(),
            "REFUND_NOT_RECOUPED"
        );
        assert_eq!(
            ActivityType::CampaignStatusChange.to_string(),
            "CAMPAIGN_STATUS_CHANGE"
        );
    }

    #[test]
    fn test_activity_type_serde_matches_display() {
        let json = serde_json::to_string(&ActivityType::BalanceChange).unwrap();
        assert_eq!(json, "\"BALANCE_CHANGE\"");
    }
}
