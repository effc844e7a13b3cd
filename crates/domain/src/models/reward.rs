//! Reward domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration for a class of rewards (code stock, validity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    pub id: i64,
    pub retailer_id: i64,
    pub slug: String,
    /// Days an issued reward remains redeemable.
    pub validity_days: i32,
}

/// A loyalty reward instance.
///
/// Rows exist in two states: unallocated code stock
/// (`account_holder_id = None`) and issued rewards. The campaign reference
/// is nullable because a campaign can be cancelled while its issued
/// rewards persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: i64,
    pub reward_uuid: Uuid,
    pub reward_config_id: i64,
    pub retailer_id: i64,
    pub account_holder_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub code: String,
    pub issued_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub redeemed_date: Option<DateTime<Utc>>,
    pub cancelled_date: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Reward {
    /// Whether the reward has been issued to an account holder.
    pub fn is_issued(&self) -> bool {
        self.account_holder_id.is_some() && self.issued_date.is_some()
    }

    /// Whether the reward can still be redeemed at the given instant.
    pub fn is_redeemable_at(&self, at: DateTime<Utc>) -> bool {
        self.is_issued()
            && !self.deleted
            && self.redeemed_date.is_none()
            && self.cancelled_date.is_none()
            && self.expiry_date.map(|expiry| expiry >= at).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn issued_reward() -> Reward {
        Reward {
            id: 1,
            reward_uuid: Uuid::new_v4(),
            reward_config_id: 1,
            retailer_id: 1,
            account_holder_id: Some(1),
            campaign_id: Some(1),
            code: "CODE-0001".into(),
            issued_date: Some(Utc::now()),
            expiry_date: Some(Utc::now() + Duration::days(30)),
            redeemed_date: None,
            cancelled_date: None,
            deleted: false,
        }
    }

    #[test]
    fn test_unallocated_stock_is_not_issued() {
        let mut reward = issued_reward();
        reward.account_holder_id = None;
        reward.issued_date = None;
        assert!(!reward.is_issued());
        assert!(!reward.is_redeemable_at(Utc::now()));
    }

    #[test]
    fn test_issued_reward_is_redeemable() {
        assert!(issued_reward().is_redeemable_at(Utc::now()));
    }

    #[test]
    fn test_cancelled_reward_is_not_redeemable() {
        let mut reward = issued_reward();
        reward.cancelled_date = Some(Utc::now());
        assert!(!reward.is_redeemable_at(Utc::now()));
    }

    #[test]
    fn test_expired_reward_is_not_redeemable() {
        let mut reward = issued_reward();
        reward.expiry_date = Some(Utc::now() - Duration::days(1));
        assert!(!reward.is_redeemable_at(Utc::now()));
    }

    #[test]
    fn test_redeemed_reward_is_not_redeemable_again() {
        let mut reward = issued_reward();
        reward.redeemed_date = Some(Utc::now());
        assert!(!reward.is_redeemable_at(Utc::now()));
    }
}
