//! Account holder domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of an account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "account_holder_status", rename_all = "UPPERCASE")]
pub enum AccountHolderStatus {
    /// Enrolled but not yet activated; holds no balances.
    Pending,
    /// Activated with an account number; earns against active campaigns.
    Active,
    Inactive,
    /// Activation failed permanently.
    Failed,
}

impl FromStr for AccountHolderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(AccountHolderStatus::Pending),
            "ACTIVE" => Ok(AccountHolderStatus::Active),
            "INACTIVE" => Ok(AccountHolderStatus::Inactive),
            "FAILED" => Ok(AccountHolderStatus::Failed),
            _ => Err(format!("Unknown account holder status: {s}")),
        }
    }
}

impl fmt::Display for AccountHolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountHolderStatus::Pending => write!(f, "PENDING"),
            AccountHolderStatus::Active => write!(f, "ACTIVE"),
            AccountHolderStatus::Inactive => write!(f, "INACTIVE"),
            AccountHolderStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A retailer's enrolled customer.
///
/// Never hard-deleted; the email is unique per retailer and the public
/// identity is the `account_holder_uuid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHolder {
    pub id: i64,
    pub account_holder_uuid: Uuid,
    pub retailer_id: i64,
    pub email: String,
    pub status: AccountHolderStatus,
    /// Assigned on activation; None while PENDING.
    pub account_number: Option<String>,
    pub opt_out_token: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AccountHolder {
    /// Whether this account holder can earn against campaigns.
    pub fn is_active(&self) -> bool {
        self.status == AccountHolderStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(status: AccountHolderStatus) -> AccountHolder {
        AccountHolder {
            id: 1,
            account_holder_uuid: Uuid::new_v4(),
            retailer_id: 1,
            email: "customer@example.com".into(),
            status,
            account_number: None,
            opt_out_token: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            AccountHolderStatus::Pending,
            AccountHolderStatus::Active,
            AccountHolderStatus::Inactive,
            AccountHolderStatus::Failed,
        ] {
            let parsed: AccountHolderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_only_active_holders_earn() {
        assert!(holder(AccountHolderStatus::Active).is_active());
        assert!(!holder(AccountHolderStatus::Pending).is_active());
        assert!(!holder(AccountHolderStatus::Inactive).is_active());
        assert!(!holder(AccountHolderStatus::Failed).is_active());
    }
}
