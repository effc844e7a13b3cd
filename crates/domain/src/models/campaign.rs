//! Campaign domain models and the status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Campaign lifecycle status.
///
/// Legal transitions: DRAFT -> ACTIVE, DRAFT -> CANCELLED,
/// ACTIVE -> ENDED, ACTIVE -> CANCELLED. ENDED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "campaign_status", rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Cancelled,
    Ended,
}

impl CampaignStatus {
    /// Whether a transition from `self` to `requested` is legal.
    pub fn can_transition_to(self, requested: CampaignStatus) -> bool {
        matches!(
            (self, requested),
            (CampaignStatus::Draft, CampaignStatus::Active)
                | (CampaignStatus::Draft, CampaignStatus::Cancelled)
                | (CampaignStatus::Active, CampaignStatus::Ended)
                | (CampaignStatus::Active, CampaignStatus::Cancelled)
        )
    }

    /// Whether no further transition is possible out of this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Cancelled | CampaignStatus::Ended)
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(CampaignStatus::Draft),
            "ACTIVE" => Ok(CampaignStatus::Active),
            "CANCELLED" => Ok(CampaignStatus::Cancelled),
            "ENDED" => Ok(CampaignStatus::Ended),
            _ => Err(format!("Unknown campaign status: {s}")),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "DRAFT"),
            CampaignStatus::Active => write!(f, "ACTIVE"),
            CampaignStatus::Cancelled => write!(f, "CANCELLED"),
            CampaignStatus::Ended => write!(f, "ENDED"),
        }
    }
}

/// What happens to a campaign's pending rewards when it ends.
///
/// Ignored on cancellation: cancelling always removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingRewardsAction {
    Remove,
    Convert,
}

/// How a campaign converts spend into balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "loyalty_type", rename_all = "UPPERCASE")]
pub enum LoyaltyType {
    /// Balance accumulates a fraction of each qualifying spend, in pence.
    Accumulator,
    /// Balance counts whole stamps awarded per spend threshold.
    Stamps,
}

impl fmt::Display for LoyaltyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoyaltyType::Accumulator => write!(f, "ACCUMULATOR"),
            LoyaltyType::Stamps => write!(f, "STAMPS"),
        }
    }
}

/// A retailer-scoped earn/reward program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub retailer_id: i64,
    pub slug: String,
    pub name: String,
    pub status: CampaignStatus,
    pub loyalty_type: LoyaltyType,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Whether the campaign accepts earns at the given instant.
    ///
    /// ACTIVE alone is not sufficient: the transaction datetime must fall
    /// within [start_date, end_date).
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active
            && self.start_date.map(|start| start <= at).unwrap_or(false)
            && self.end_date.map(|end| end > at).unwrap_or(true)
    }
}

/// Formula converting a transaction amount into a balance delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnRule {
    pub id: i64,
    pub campaign_id: i64,
    /// ACCUMULATOR: minimum qualifying transaction amount in pence.
    /// STAMPS: the spend that earns one increment of stamps.
    pub threshold: i64,
    /// Stamps awarded per threshold crossing; unused for accumulator.
    pub increment: i64,
    /// ACCUMULATOR: fraction of spend earned.
    pub increment_multiplier: f64,
    /// Per-transaction cap on earn magnitude; 0 = uncapped.
    pub max_amount: i64,
}

/// Threshold and reward-config link between balance and reward issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRule {
    pub id: i64,
    pub campaign_id: i64,
    /// Balance at which a reward is owed.
    pub reward_goal: i64,
    /// Days before an over-goal balance converts into an issued reward;
    /// 0 = issue immediately, no pending rewards.
    pub allocation_window: i32,
    /// Max reward-goal crossings honoured within one transaction.
    pub reward_cap: Option<i32>,
    pub reward_config_id: i64,
}

impl RewardRule {
    /// Whether earns queue as pending rewards instead of issuing directly.
    pub fn uses_pending_rewards(&self) -> bool {
        self.allocation_window > 0
    }
}

/// A campaign together with its rules, as loaded for earn processing or
/// activation checks. Both rules are optional while the campaign is DRAFT.
#[derive(Debug, Clone)]
pub struct CampaignWithRules {
    pub campaign: Campaign,
    pub earn_rule: Option<EarnRule>,
    pub reward_rule: Option<RewardRule>,
}

impl CampaignWithRules {
    /// A campaign may only activate once both rules are present.
    pub fn is_activable(&self) -> bool {
        self.campaign.status == CampaignStatus::Draft
            && self.earn_rule.is_some()
            && self.reward_rule.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn campaign(status: CampaignStatus) -> Campaign {
        Campaign {
            id: 1,
            retailer_id: 1,
            slug: "summer-stamps".into(),
            name: "Summer Stamps".into(),
            status,
            loyalty_type: LoyaltyType::Stamps,
            start_date: Some(Utc::now() - Duration::days(1)),
            end_date: None,
        }
    }

    fn with_rules(
        status: CampaignStatus,
        earn: bool,
        reward: bool,
    ) -> CampaignWithRules {
        CampaignWithRules {
            campaign: campaign(status),
            earn_rule: earn.then(|| EarnRule {
                id: 1,
                campaign_id: 1,
                threshold: 100,
                increment: 1,
                increment_multiplier: 1.0,
                max_amount: 0,
            }),
            reward_rule: reward.then(|| RewardRule {
                id: 1,
                campaign_id: 1,
                reward_goal: 500,
                allocation_window: 0,
                reward_cap: None,
                reward_config_id: 1,
            }),
        }
    }

    #[test]
    fn test_legal_transitions() {
        assert!(CampaignStatus::Draft.can_transition_to(CampaignStatus::Active));
        assert!(CampaignStatus::Draft.can_transition_to(CampaignStatus::Cancelled));
        assert!(CampaignStatus::Active.can_transition_to(CampaignStatus::Ended));
        assert!(CampaignStatus::Active.can_transition_to(CampaignStatus::Cancelled));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!CampaignStatus::Draft.can_transition_to(CampaignStatus::Ended));
        assert!(!CampaignStatus::Active.can_transition_to(CampaignStatus::Draft));
        assert!(!CampaignStatus::Ended.can_transition_to(CampaignStatus::Active));
        assert!(!CampaignStatus::Cancelled.can_transition_to(CampaignStatus::Active));
        assert!(!CampaignStatus::Active.can_transition_to(CampaignStatus::Active));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CampaignStatus::Ended.is_terminal());
        assert!(CampaignStatus::Cancelled.is_terminal());
        assert!(!CampaignStatus::Draft.is_terminal());
        assert!(!CampaignStatus::Active.is_terminal());
    }

    #[test]
    fn test_is_live_at_requires_started() {
        let mut c = campaign(CampaignStatus::Active);
        assert!(c.is_live_at(Utc::now()));

        c.start_date = Some(Utc::now() + Duration::days(1));
        assert!(!c.is_live_at(Utc::now()));

        c.start_date = None;
        assert!(!c.is_live_at(Utc::now()));
    }

    #[test]
    fn test_is_live_at_respects_end_date() {
        let mut c = campaign(CampaignStatus::Active);
        c.end_date = Some(Utc::now() - Duration::hours(1));
        assert!(!c.is_live_at(Utc::now()));
    }

    #[test]
    fn test_draft_campaign_is_never_live() {
        assert!(!campaign(CampaignStatus::Draft).is_live_at(Utc::now()));
    }

    #[test]
    fn test_is_activable_requires_both_rules() {
        assert!(with_rules(CampaignStatus::Draft, true, true).is_activable());
        assert!(!with_rules(CampaignStatus::Draft, true, false).is_activable());
        assert!(!with_rules(CampaignStatus::Draft, false, true).is_activable());
        assert!(!with_rules(CampaignStatus::Active, true, true).is_activable());
    }

    #[test]
    fn test_uses_pending_rewards() {
        let mut rule = RewardRule {
            id: 1,
            campaign_id: 1,
            reward_goal: 500,
            allocation_window: 0,
            reward_cap: None,
            reward_config_id: 1,
        };
        assert!(!rule.uses_pending_rewards());
        rule.allocation_window = 14;
        assert!(rule.uses_pending_rewards());
    }
}
