//! Campaign entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{
    Campaign, CampaignStatus, CampaignWithRules, EarnRule, LoyaltyType, RewardRule,
};
use sqlx::FromRow;

/// Database row mapping for the campaign table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignEntity {
    pub id: i64,
    pub retailer_id: i64,
    pub slug: String,
    pub name: String,
    pub status: CampaignStatus,
    pub loyalty_type: LoyaltyType,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CampaignEntity> for Campaign {
    fn from(entity: CampaignEntity) -> Self {
        Self {
            id: entity.id,
            retailer_id: entity.retailer_id,
            slug: entity.slug,
            name: entity.name,
            status: entity.status,
            loyalty_type: entity.loyalty_type,
            start_date: entity.start_date,
            end_date: entity.end_date,
        }
    }
}

/// Flat row for a campaign LEFT JOINed onto its earn and reward rules.
///
/// Rule columns are nullable because a DRAFT campaign may lack either rule.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignRuleRow {
    pub id: i64,
    pub retailer_id: i64,
    pub slug: String,
    pub name: String,
    pub status: CampaignStatus,
    pub loyalty_type: LoyaltyType,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    pub earn_rule_id: Option<i64>,
    pub threshold: Option<i64>,
    pub increment: Option<i64>,
    pub increment_multiplier: Option<f64>,
    pub max_amount: Option<i64>,

    pub reward_rule_id: Option<i64>,
    pub reward_goal: Option<i64>,
    pub allocation_window: Option<i32>,
    pub reward_cap: Option<i32>,
    pub reward_config_id: Option<i64>,
}

impl From<CampaignRuleRow> for CampaignWithRules {
    fn from(row: CampaignRuleRow) -> Self {
        let campaign = Campaign {
            id: row.id,
            retailer_id: row.retailer_id,
            slug: row.slug,
            name: row.name,
            status: row.status,
            loyalty_type: row.loyalty_type,
            start_date: row.start_date,
            end_date: row.end_date,
        };

        let earn_rule = match (row.earn_rule_id, row.threshold) {
            (Some(id), Some(threshold)) => Some(EarnRule {
                id,
                campaign_id: campaign.id,
                threshold,
                increment: row.increment.unwrap_or(0),
                increment_multiplier: row.increment_multiplier.unwrap_or(1.0),
                max_amount: row.max_amount.unwrap_or(0),
            }),
            _ => None,
        };

        let reward_rule = match (row.reward_rule_id, row.reward_goal, row.reward_config_id) {
            (Some(id), Some(reward_goal), Some(reward_config_id)) => Some(RewardRule {
                id,
                campaign_id: campaign.id,
                reward_goal,
                allocation_window: row.allocation_window.unwrap_or(0),
                reward_cap: row.reward_cap,
                reward_config_id,
            }),
            _ => None,
        };

        CampaignWithRules { campaign, earn_rule, reward_rule }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_row() -> CampaignRuleRow {
        CampaignRuleRow {
            id: 3,
            retailer_id: 1,
            slug: "summer".into(),
            name: "Summer".into(),
            status: CampaignStatus::Active,
            loyalty_type: LoyaltyType::Accumulator,
            start_date: Some(Utc::now()),
            end_date: None,
            earn_rule_id: Some(11),
            threshold: Some(100),
            increment: Some(0),
            increment_multiplier: Some(0.5),
            max_amount: Some(0),
            reward_rule_id: Some(12),
            reward_goal: Some(500),
            allocation_window: Some(14),
            reward_cap: None,
            reward_config_id: Some(9),
        }
    }

    #[test]
    fn test_rule_row_assembles_both_rules() {
        let cwr: CampaignWithRules = rule_row().into();
        assert_eq!(cwr.campaign.id, 3);
        let earn = cwr.earn_rule.expect("earn rule");
        assert_eq!(earn.threshold, 100);
        assert_eq!(earn.increment_multiplier, 0.5);
        let reward = cwr.reward_rule.expect("reward rule");
        assert_eq!(reward.reward_goal, 500);
        assert_eq!(reward.allocation_window, 14);
    }

    #[test]
    fn test_rule_row_without_rules_maps_to_none() {
        let mut row = rule_row();
        row.earn_rule_id = None;
        row.threshold = None;
        row.reward_rule_id = None;
        row.reward_goal = None;
        row.reward_config_id = None;
        let cwr: CampaignWithRules = row.into();
        assert!(cwr.earn_rule.is_none());
        assert!(cwr.reward_rule.is_none());
        assert!(!cwr.is_activable());
    }
}
