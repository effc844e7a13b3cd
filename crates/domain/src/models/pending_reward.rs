//! Pending reward domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Over-threshold earn progress not yet converted into an issued reward.
///
/// `total_cost_to_user` can exceed `count * value` when the earn that
/// crossed the goal overshot it; the surplus ("slush") is the first thing a
/// later refund absorbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReward {
    pub id: i64,
    pub pending_reward_uuid: Uuid,
    pub account_holder_id: i64,
    pub campaign_id: i64,
    pub reward_config_id: i64,
    /// Balance portion allocated per reward unit.
    pub value: i64,
    /// Reward units owed.
    pub count: i64,
    pub total_cost_to_user: i64,
    pub created_date: DateTime<Utc>,
    /// Date after which this converts into issued rewards.
    pub conversion_date: NaiveDate,
}

impl PendingReward {
    /// The balance value this pending reward represents.
    pub fn total_value(&self) -> i64 {
        self.count * self.value
    }

    /// Refund-absorption headroom above the reward value itself.
    pub fn slush(&self) -> i64 {
        self.total_cost_to_user - self.total_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(count: i64, value: i64, total_cost: i64) -> PendingReward {
        PendingReward {
            id: 1,
            pending_reward_uuid: Uuid::new_v4(),
            account_holder_id: 1,
            campaign_id: 1,
            reward_config_id: 1,
            value,
            count,
            total_cost_to_user: total_cost,
            created_date: Utc::now(),
            conversion_date: Utc::now().date_naive(),
        }
    }

    #[test]
    fn test_total_value() {
        assert_eq!(pending(2, 500, 1000).total_value(), 1000);
    }

    #[test]
    fn test_slush_is_overshoot() {
        assert_eq!(pending(1, 500, 650).slush(), 150);
        assert_eq!(pending(2, 500, 1000).slush(), 0);
    }
}
