//! Activity record builders.
//!
//! One constructor per activity type. All constructors are pure: they take
//! already-known facts and produce an [`Activity`] ready for the outbox.
//! Summaries follow the wording the activity stream consumers display
//! verbatim.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::models::{Activity, ActivityType, CampaignStatus, LoyaltyType, Transaction};
use crate::services::earn::EarnResult;
use shared::currency::{pence_to_currency_string, stamps_to_string};

/// Formats a signed earn for a summary line: "+£1.50", "-2 stamps".
fn earn_summary_value(loyalty_type: LoyaltyType, amount: i64) -> String {
    let sign = if amount > 0 { "+" } else { "" };
    match loyalty_type {
        LoyaltyType::Accumulator => {
            format!("{sign}{}", pence_to_currency_string(amount, "GBP"))
        }
        LoyaltyType::Stamps => format!("{sign}{}", stamps_to_string(amount)),
    }
}

/// A processed transaction and its per-campaign earns.
pub fn processed_tx(
    retailer_slug: &str,
    retailer_name: &str,
    account_holder_uuid: Uuid,
    tx: &Transaction,
    store_name: &str,
    earns: &[EarnResult],
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::TxHistory,
        underlying_datetime: tx.datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: earns.iter().map(|e| e.campaign_slug.clone()).collect(),
        summary: format!("{retailer_name} Transaction Processed for {store_name} (id: {})", tx.transaction_id),
        reason: None,
        payload: json!({
            "transaction_id": tx.transaction_id,
            "datetime": tx.datetime,
            "amount": pence_to_currency_string(tx.amount, "GBP"),
            "amount_currency": "GBP",
            "store_name": store_name,
            "mid": tx.mid,
            "earned": earns.iter().map(|earn| json!({
                "loyalty_type": earn.loyalty_type,
                "value": earn_summary_value(earn.loyalty_type, earn.amount),
                "accepted": earn.accepted,
            })).collect::<Vec<_>>(),
        }),
    }
}

/// Receipt of a transaction request, successful or not.
pub fn tx_import(
    retailer_slug: &str,
    transaction_id: &str,
    amount: i64,
    datetime: DateTime<Utc>,
    campaign_slugs: Vec<String>,
    invalid_refund: bool,
    error: Option<&str>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::TxImport,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: None,
        campaign_slugs,
        summary: format!("{retailer_slug} Transaction Imported"),
        reason: error.map(str::to_string),
        payload: json!({
            "transaction_id": transaction_id,
            "amount": amount,
            "datetime": datetime,
            "invalid_refund": invalid_refund,
            "error": error,
        }),
    }
}

/// A campaign balance changed.
#[allow(clippy::too_many_arguments)]
pub fn balance_change(
    retailer_slug: &str,
    retailer_name: &str,
    campaign_slug: &str,
    campaign_name: &str,
    loyalty_type: LoyaltyType,
    account_holder_uuid: Uuid,
    original_balance: i64,
    new_balance: i64,
    reason: String,
    datetime: DateTime<Utc>,
) -> Activity {
    let adjustment = new_balance - original_balance;
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::BalanceChange,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: vec![campaign_slug.to_string()],
        summary: format!(
            "{retailer_name} - {campaign_name}: {}",
            earn_summary_value(loyalty_type, adjustment)
        ),
        reason: Some(reason),
        payload: json!({
            "loyalty_type": loyalty_type,
            "original_balance": original_balance,
            "new_balance": new_balance,
        }),
    }
}

/// A refund could not be fully recouped from the ledger.
#[allow(clippy::too_many_arguments)]
pub fn refund_not_recouped(
    retailer_slug: &str,
    retailer_name: &str,
    campaign_slug: &str,
    account_holder_uuid: Uuid,
    adjustment: i64,
    amount_not_recouped: i64,
    transaction_id: &str,
    datetime: DateTime<Utc>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::RefundNotRecouped,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: vec![campaign_slug.to_string()],
        summary: format!("{retailer_name} Refund transaction caused an account shortfall"),
        reason: Some(format!("Refund transaction id: {transaction_id}")),
        payload: json!({
            "adjustment": adjustment,
            "amount_recouped": adjustment.abs() - amount_not_recouped,
            "amount_not_recouped": amount_not_recouped,
            "transaction_id": transaction_id,
        }),
    }
}

/// A campaign changed status.
pub fn campaign_status_change(
    retailer_slug: &str,
    campaign_slug: &str,
    campaign_name: &str,
    original_status: CampaignStatus,
    new_status: CampaignStatus,
    sso_username: &str,
    datetime: DateTime<Utc>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::CampaignStatusChange,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: None,
        campaign_slugs: vec![campaign_slug.to_string()],
        summary: format!("{campaign_name} {new_status}"),
        reason: Some(format!("Updated by {sso_username}")),
        payload: json!({
            "original_status": original_status,
            "new_status": new_status,
            "sso_username": sso_username,
        }),
    }
}

/// A pending reward was created, deleted or converted.
#[allow(clippy::too_many_arguments)]
pub fn pending_reward_status(
    retailer_slug: &str,
    retailer_name: &str,
    campaign_slug: &str,
    campaign_name: &str,
    account_holder_uuid: Uuid,
    pending_reward_uuid: Uuid,
    count: i64,
    new_status: &str,
    reason: &str,
    datetime: DateTime<Utc>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::RewardStatus,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: vec![campaign_slug.to_string()],
        summary: format!("{retailer_name} Pending reward {new_status} for {campaign_name}"),
        reason: Some(reason.to_string()),
        payload: json!({
            "pending_reward_uuid": pending_reward_uuid,
            "count": count,
            "new_status": new_status,
        }),
    }
}

/// A pending reward's total cost to user was adjusted by a refund.
pub fn pending_reward_cost_updated(
    retailer_slug: &str,
    campaign_slug: &str,
    account_holder_uuid: Uuid,
    pending_reward_uuid: Uuid,
    original_total_cost_to_user: i64,
    new_total_cost_to_user: i64,
    datetime: DateTime<Utc>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::RewardStatus,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: vec![campaign_slug.to_string()],
        summary: "Pending reward total cost to user updated".to_string(),
        reason: Some("Pending reward updated due to refund".to_string()),
        payload: json!({
            "pending_reward_uuid": pending_reward_uuid,
            "original_total_cost_to_user": original_total_cost_to_user,
            "new_total_cost_to_user": new_total_cost_to_user,
        }),
    }
}

/// An issued reward changed status (issued, cancelled).
#[allow(clippy::too_many_arguments)]
pub fn reward_status(
    retailer_slug: &str,
    campaign_slug: Option<&str>,
    account_holder_uuid: Uuid,
    reward_uuid: Uuid,
    original_status: &str,
    new_status: &str,
    reason: &str,
    datetime: DateTime<Utc>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::RewardStatus,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: campaign_slug.map(str::to_string).into_iter().collect(),
        summary: format!("{retailer_slug} Reward {new_status}"),
        reason: Some(reason.to_string()),
        payload: json!({
            "reward_uuid": reward_uuid,
            "original_status": original_status,
            "new_status": new_status,
        }),
    }
}

/// An account holder completed enrolment and became active.
pub fn account_enrolment(
    retailer_slug: &str,
    account_holder_uuid: Uuid,
    account_number: &str,
    datetime: DateTime<Utc>,
) -> Activity {
    Activity {
        activity_uuid: Uuid::new_v4(),
        activity_type: ActivityType::AccountEnrolment,
        underlying_datetime: datetime,
        retailer_slug: retailer_slug.to_string(),
        account_holder_uuid: Some(account_holder_uuid),
        campaign_slugs: Vec::new(),
        summary: format!("{retailer_slug} Account holder activated"),
        reason: None,
        payload: json!({
            "account_number": account_number,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earn_summary_value_accumulator() {
        assert_eq!(earn_summary_value(LoyaltyType::Accumulator, 150), "+£1.50");
        assert_eq!(earn_summary_value(LoyaltyType::Accumulator, -150), "-£1.50");
    }

    #[test]
    fn test_earn_summary_value_stamps() {
        assert_eq!(earn_summary_value(LoyaltyType::Stamps, 1), "+1 stamp");
        assert_eq!(earn_summary_value(LoyaltyType::Stamps, 3), "+3 stamps");
        assert_eq!(earn_summary_value(LoyaltyType::Stamps, -2), "-2 stamps");
    }

    #[test]
    fn test_balance_change_summary() {
        let activity = balance_change(
            "test-retailer",
            "Test Retailer",
            "summer",
            "Summer Campaign",
            LoyaltyType::Accumulator,
            Uuid::new_v4(),
            100,
            250,
            "Purchase transaction id: tx-1".to_string(),
            Utc::now(),
        );
        assert_eq!(activity.activity_type, ActivityType::BalanceChange);
        assert_eq!(activity.summary, "Test Retailer - Summer Campaign: +£1.50");
        assert_eq!(activity.payload["new_balance"], 250);
    }

    #[test]
    fn test_refund_not_recouped_carries_amounts() {
        let activity = refund_not_recouped(
            "test-retailer",
            "Test Retailer",
            "summer",
            Uuid::new_v4(),
            -200,
            150,
            "tx-2",
            Utc::now(),
        );
        assert_eq!(activity.activity_type, ActivityType::RefundNotRecouped);
        assert_eq!(activity.payload["amount_not_recouped"], 150);
        assert_eq!(activity.payload["amount_recouped"], 50);
    }

    #[test]
    fn test_campaign_status_change_payload() {
        let activity = campaign_status_change(
            "test-retailer",
            "summer",
            "Summer Campaign",
            CampaignStatus::Draft,
            CampaignStatus::Active,
            "ops@example.com",
            Utc::now(),
        );
        assert_eq!(activity.campaign_slugs, vec!["summer".to_string()]);
        assert_eq!(activity.payload["original_status"], "DRAFT");
        assert_eq!(activity.payload["new_status"], "ACTIVE");
    }

    #[test]
    fn test_reward_status_without_campaign() {
        let activity = reward_status(
            "test-retailer",
            None,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "issued",
            "cancelled",
            "Reward cancelled due to campaign cancellation",
            Utc::now(),
        );
        assert!(activity.campaign_slugs.is_empty());
    }
}
