//! Campaign balance domain model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per (account holder, campaign) ledger entry.
///
/// The balance is signed: pence for accumulator campaigns, stamp counts for
/// stamp campaigns. A negative balance is only ever produced by a refund
/// that could not be fully recouped and represents the amount owed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBalance {
    pub id: i64,
    pub account_holder_id: i64,
    pub campaign_id: i64,
    pub balance: i64,
    /// Date on which the balance resets to zero; None = never.
    pub reset_date: Option<NaiveDate>,
}
