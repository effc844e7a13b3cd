//! Earn engine: converts a transaction amount into per-campaign balance
//! deltas.
//!
//! All functions here are pure. Refunds (negative amounts) flow through the
//! same formulas as purchases and produce negative earns, which is what
//! allows a refund of an earlier purchase to reverse its earn exactly.
//!
//! Rounding rules, fixed and relied upon by tests:
//! - ACCUMULATOR earns round half away from zero, so `earn(-x) == -earn(x)`.
//! - STAMPS threshold crossings use integer division truncating toward
//!   zero, so a refund smaller than one full threshold earns nothing.

use crate::models::{CampaignWithRules, EarnRule, LoyaltyType};

/// The earn computed for one campaign from one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnResult {
    pub campaign_id: i64,
    pub campaign_slug: String,
    pub loyalty_type: LoyaltyType,
    /// The earn rule threshold, carried for activity reporting.
    pub threshold: i64,
    /// Signed balance delta; 0 when not accepted.
    pub amount: i64,
    /// Whether the transaction qualified under the earn rule at all.
    pub accepted: bool,
}

/// Computes the earn for every supplied campaign.
///
/// Campaigns without an earn rule are skipped; active campaigns are
/// guaranteed one by the activation precondition, so a missing rule here
/// means the caller passed a draft campaign.
pub fn compute_earns(tx_amount: i64, campaigns: &[CampaignWithRules]) -> Vec<EarnResult> {
    campaigns
        .iter()
        .filter_map(|cwr| {
            let rule = cwr.earn_rule.as_ref()?;
            let earn = evaluate(tx_amount, cwr.campaign.loyalty_type, rule);
            Some(EarnResult {
                campaign_id: cwr.campaign.id,
                campaign_slug: cwr.campaign.slug.clone(),
                loyalty_type: cwr.campaign.loyalty_type,
                threshold: rule.threshold,
                amount: earn.unwrap_or(0),
                accepted: earn.is_some(),
            })
        })
        .collect()
}

/// Evaluates one earn rule against a transaction amount.
///
/// Returns None when the transaction does not qualify (threshold not met,
/// or a refund below one full stamp threshold).
pub fn evaluate(tx_amount: i64, loyalty_type: LoyaltyType, rule: &EarnRule) -> Option<i64> {
    match loyalty_type {
        LoyaltyType::Accumulator => accumulator_earn(tx_amount, rule),
        LoyaltyType::Stamps => stamps_earn(tx_amount, rule),
    }
}

fn accumulator_earn(tx_amount: i64, rule: &EarnRule) -> Option<i64> {
    if tx_amount.unsigned_abs() < rule.threshold.unsigned_abs() {
        return None;
    }

    // Half-away-from-zero, which f64::round provides.
    let earn = (tx_amount as f64 * rule.increment_multiplier).round() as i64;

    Some(clamp_magnitude(earn, rule.max_amount))
}

fn stamps_earn(tx_amount: i64, rule: &EarnRule) -> Option<i64> {
    if rule.threshold <= 0 {
        return None;
    }

    // Truncating division: ±150 / 100 is ±1 crossing, -50 / 100 is none.
    let crossings = tx_amount / rule.threshold;
    if crossings == 0 {
        return None;
    }

    Some(crossings * rule.increment)
}

/// Clamps `earn` so its magnitude does not exceed `max_amount`, preserving
/// sign. `max_amount == 0` means uncapped.
fn clamp_magnitude(earn: i64, max_amount: i64) -> i64 {
    if max_amount > 0 && earn.unsigned_abs() > max_amount.unsigned_abs() {
        max_amount * earn.signum()
    } else {
        earn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campaign, CampaignStatus};
    use chrono::Utc;

    fn accumulator_rule(threshold: i64, multiplier: f64, max_amount: i64) -> EarnRule {
        EarnRule {
            id: 1,
            campaign_id: 1,
            threshold,
            increment: 0,
            increment_multiplier: multiplier,
            max_amount,
        }
    }

    fn stamps_rule(threshold: i64, increment: i64) -> EarnRule {
        EarnRule {
            id: 1,
            campaign_id: 1,
            threshold,
            increment,
            increment_multiplier: 1.0,
            max_amount: 0,
        }
    }

    #[test]
    fn test_accumulator_below_threshold_earns_nothing() {
        let rule = accumulator_rule(100, 0.5, 0);
        assert_eq!(evaluate(99, LoyaltyType::Accumulator, &rule), None);
        assert_eq!(evaluate(-99, LoyaltyType::Accumulator, &rule), None);
    }

    #[test]
    fn test_accumulator_earns_fraction_of_spend() {
        let rule = accumulator_rule(100, 0.5, 0);
        assert_eq!(evaluate(200, LoyaltyType::Accumulator, &rule), Some(100));
    }

    #[test]
    fn test_accumulator_refund_symmetry() {
        // A refund of a prior purchase reverses its earn exactly.
        let rule = accumulator_rule(100, 0.5, 0);
        assert_eq!(evaluate(200, LoyaltyType::Accumulator, &rule), Some(100));
        assert_eq!(evaluate(-200, LoyaltyType::Accumulator, &rule), Some(-100));
    }

    #[test]
    fn test_accumulator_rounding_is_half_away_from_zero() {
        let rule = accumulator_rule(100, 1.25, 0);
        // 399 * 1.25 = 498.75 -> 499
        assert_eq!(evaluate(399, LoyaltyType::Accumulator, &rule), Some(499));
        assert_eq!(evaluate(-399, LoyaltyType::Accumulator, &rule), Some(-499));

        let rule = accumulator_rule(100, 0.5, 0);
        // 101 * 0.5 = 50.5 -> 51, symmetric under negation
        assert_eq!(evaluate(101, LoyaltyType::Accumulator, &rule), Some(51));
        assert_eq!(evaluate(-101, LoyaltyType::Accumulator, &rule), Some(-51));
    }

    #[test]
    fn test_accumulator_max_amount_caps_magnitude() {
        let rule = accumulator_rule(100, 1.0, 250);
        assert_eq!(evaluate(1000, LoyaltyType::Accumulator, &rule), Some(250));
        assert_eq!(evaluate(-1000, LoyaltyType::Accumulator, &rule), Some(-250));
        // Below the cap, unaffected
        assert_eq!(evaluate(200, LoyaltyType::Accumulator, &rule), Some(200));
    }

    #[test]
    fn test_accumulator_zero_max_amount_is_uncapped() {
        let rule = accumulator_rule(100, 1.0, 0);
        assert_eq!(evaluate(100_000, LoyaltyType::Accumulator, &rule), Some(100_000));
    }

    #[test]
    fn test_stamps_earn_per_threshold() {
        let rule = stamps_rule(500, 1);
        assert_eq!(evaluate(499, LoyaltyType::Stamps, &rule), None);
        assert_eq!(evaluate(500, LoyaltyType::Stamps, &rule), Some(1));
        assert_eq!(evaluate(999, LoyaltyType::Stamps, &rule), Some(1));
        assert_eq!(evaluate(1500, LoyaltyType::Stamps, &rule), Some(3));
    }

    #[test]
    fn test_stamps_multiple_increment() {
        let rule = stamps_rule(500, 2);
        assert_eq!(evaluate(1000, LoyaltyType::Stamps, &rule), Some(4));
    }

    #[test]
    fn test_stamps_refund_truncates_toward_zero() {
        let rule = stamps_rule(500, 1);
        // A refund below one full threshold earns nothing back.
        assert_eq!(evaluate(-499, LoyaltyType::Stamps, &rule), None);
        assert_eq!(evaluate(-500, LoyaltyType::Stamps, &rule), Some(-1));
        assert_eq!(evaluate(-999, LoyaltyType::Stamps, &rule), Some(-1));
    }

    #[test]
    fn test_stamps_invalid_threshold_earns_nothing() {
        let rule = stamps_rule(0, 1);
        assert_eq!(evaluate(1000, LoyaltyType::Stamps, &rule), None);
    }

    #[test]
    fn test_compute_earns_reports_unaccepted_campaigns() {
        let campaigns = vec![
            campaign_with_rules(3, "acc", LoyaltyType::Accumulator, accumulator_rule(100, 0.5, 0)),
            campaign_with_rules(7, "stamps", LoyaltyType::Stamps, stamps_rule(500, 1)),
        ];

        let earns = compute_earns(250, &campaigns);
        assert_eq!(earns.len(), 2);

        assert_eq!(earns[0].campaign_id, 3);
        assert!(earns[0].accepted);
        assert_eq!(earns[0].amount, 125);

        // 250 is below one stamp threshold
        assert_eq!(earns[1].campaign_id, 7);
        assert!(!earns[1].accepted);
        assert_eq!(earns[1].amount, 0);
    }

    #[test]
    fn test_compute_earns_skips_campaigns_without_earn_rule() {
        let mut cwr =
            campaign_with_rules(1, "draftish", LoyaltyType::Stamps, stamps_rule(500, 1));
        cwr.earn_rule = None;
        assert!(compute_earns(1000, &[cwr]).is_empty());
    }

    fn campaign_with_rules(
        id: i64,
        slug: &str,
        loyalty_type: LoyaltyType,
        rule: EarnRule,
    ) -> CampaignWithRules {
        CampaignWithRules {
            campaign: Campaign {
                id,
                retailer_id: 1,
                slug: slug.into(),
                name: slug.to_uppercase(),
                status: CampaignStatus::Active,
                loyalty_type,
                start_date: Some(Utc::now()),
                end_date: None,
            },
            earn_rule: Some(EarnRule { campaign_id: id, ..rule }),
            reward_rule: None,
        }
    }
}
