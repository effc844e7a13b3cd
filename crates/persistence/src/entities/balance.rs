//! Campaign balance entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::CampaignBalance;
use sqlx::FromRow;

/// Database row mapping for the campaign_balance table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignBalanceEntity {
    pub id: i64,
    pub account_holder_id: i64,
    pub campaign_id: i64,
    pub balance: i64,
    pub reset_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CampaignBalanceEntity> for CampaignBalance {
    fn from(entity: CampaignBalanceEntity) -> Self {
        Self {
            id: entity.id,
            account_holder_id: entity.account_holder_id,
            campaign_id: entity.campaign_id,
            balance: entity.balance,
            reset_date: entity.reset_date,
        }
    }
}

/// A balance due for reset, joined onto its owners so the reset job can
/// build the balance-change activity without further lookups.
#[derive(Debug, Clone, FromRow)]
pub struct BalanceResetRow {
    pub id: i64,
    pub balance: i64,
    pub reset_date: NaiveDate,
    pub account_holder_uuid: uuid::Uuid,
    pub retailer_slug: String,
    pub retailer_name: String,
    pub balance_lifespan: Option<i32>,
    pub campaign_slug: String,
    pub campaign_name: String,
    pub loyalty_type: domain::models::LoyaltyType,
}
