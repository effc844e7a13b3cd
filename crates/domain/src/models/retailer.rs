//! Retailer domain models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a retailer.
///
/// TEST retailers are exempt from the "at least one active campaign"
/// guard so they can be set up and torn down freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "retailer_status", rename_all = "UPPERCASE")]
pub enum RetailerStatus {
    Test,
    Active,
    Inactive,
}

impl FromStr for RetailerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TEST" => Ok(RetailerStatus::Test),
            "ACTIVE" => Ok(RetailerStatus::Active),
            "INACTIVE" => Ok(RetailerStatus::Inactive),
            _ => Err(format!("Unknown retailer status: {s}")),
        }
    }
}

impl fmt::Display for RetailerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetailerStatus::Test => write!(f, "TEST"),
            RetailerStatus::Active => write!(f, "ACTIVE"),
            RetailerStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// A retailer running loyalty campaigns on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retailer {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub status: RetailerStatus,
    pub loyalty_name: String,
    pub account_number_prefix: String,
    pub account_number_length: i32,
    /// Days a campaign balance lives before being reset; None = never reset.
    pub balance_lifespan: Option<i32>,
    pub callback_url: Option<String>,
    pub callback_secret: Option<String>,
}

impl Retailer {
    /// Whether transactions may currently be processed for this retailer.
    pub fn accepts_transactions(&self) -> bool {
        !matches!(self.status, RetailerStatus::Inactive)
    }
}

/// A physical or virtual store belonging to a retailer, identified by its
/// merchant id (mid) on incoming transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailerStore {
    pub id: i64,
    pub retailer_id: i64,
    pub store_name: String,
    pub mid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retailer_status_roundtrip() {
        for status in [
            RetailerStatus::Test,
            RetailerStatus::Active,
            RetailerStatus::Inactive,
        ] {
            let parsed: RetailerStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_retailer_status_parse_is_case_insensitive() {
        assert_eq!("test".parse::<RetailerStatus>().unwrap(), RetailerStatus::Test);
    }

    #[test]
    fn test_retailer_status_parse_rejects_unknown() {
        assert!("ARCHIVED".parse::<RetailerStatus>().is_err());
    }

    #[test]
    fn test_inactive_retailer_rejects_transactions() {
        let retailer = Retailer {
            id: 1,
            slug: "test-retailer".into(),
            name: "Test Retailer".into(),
            status: RetailerStatus::Inactive,
            loyalty_name: "points".into(),
            account_number_prefix: "TEST".into(),
            account_number_length: 10,
            balance_lifespan: None,
            callback_url: None,
            callback_secret: None,
        };
        assert!(!retailer.accepts_transactions());
    }
}
