//! Reward entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{Reward, RewardConfig};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the reward table.
#[derive(Debug, Clone, FromRow)]
pub struct RewardEntity {
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

impl From<RewardEntity> for Reward {
    fn from(entity: RewardEntity) -> Self {
        Self {
            id: entity.id,
            reward_uuid: entity.reward_uuid,
            reward_config_id: entity.reward_config_id,
            retailer_id: entity.retailer_id,
            account_holder_id: entity.account_holder_id,
            campaign_id: entity.campaign_id,
            code: entity.code,
            issued_date: entity.issued_date,
            expiry_date: entity.expiry_date,
            redeemed_date: entity.redeemed_date,
            cancelled_date: entity.cancelled_date,
            deleted: entity.deleted,
        }
    }
}

/// Database row mapping for the reward_config table.
#[derive(Debug, Clone, FromRow)]
pub struct RewardConfigEntity {
    pub id: i64,
    pub retailer_id: i64,
    pub slug: String,
    pub validity_days: i32,
}

impl From<RewardConfigEntity> for RewardConfig {
    fn from(entity: RewardConfigEntity) -> Self {
        Self {
            id: entity.id,
            retailer_id: entity.retailer_id,
            slug: entity.slug,
            validity_days: entity.validity_days,
        }
    }
}

/// RETURNING row of a bulk reward soft-cancel, joined onto the owning
/// account holder for activity reporting.
#[derive(Debug, Clone, FromRow)]
pub struct CancelledRewardRow {
    pub reward_uuid: Uuid,
    pub account_holder_uuid: Uuid,
    pub cancelled_date: Option<DateTime<Utc>>,
}
