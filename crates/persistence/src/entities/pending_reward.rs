//! Pending reward entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::PendingReward;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the pending_reward table.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRewardEntity {
    pub id: i64,
    pub pending_reward_uuid: Uuid,
    pub account_holder_id: i64,
    pub campaign_id: i64,
    pub reward_config_id: i64,
    pub value: i64,
    pub count: i64,
    pub total_cost_to_user: i64,
    pub created_date: DateTime<Utc>,
    pub conversion_date: NaiveDate,
}

impl From<PendingRewardEntity> for PendingReward {
    fn from(entity: PendingRewardEntity) -> Self {
        Self {
            id: entity.id,
            pending_reward_uuid: entity.pending_reward_uuid,
            account_holder_id: entity.account_holder_id,
            campaign_id: entity.campaign_id,
            reward_config_id: entity.reward_config_id,
            value: entity.value,
            count: entity.count,
            total_cost_to_user: entity.total_cost_to_user,
            created_date: entity.created_date,
            conversion_date: entity.conversion_date,
        }
    }
}

/// RETURNING row of a bulk pending-reward delete, joined onto the owning
/// account holder for activity reporting and reward conversion.
#[derive(Debug, Clone, FromRow)]
pub struct DeletedPendingRewardRow {
    pub pending_reward_uuid: Uuid,
    pub account_holder_id: i64,
    pub account_holder_uuid: Uuid,
    pub reward_config_id: i64,
    pub count: i64,
}
