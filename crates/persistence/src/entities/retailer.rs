//! Retailer entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{Retailer, RetailerStatus, RetailerStore};
use sqlx::FromRow;

/// Database row mapping for the retailer table.
#[derive(Debug, Clone, FromRow)]
pub struct RetailerEntity {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub status: RetailerStatus,
    pub loyalty_name: String,
    pub account_number_prefix: String,
    pub account_number_length: i32,
    pub balance_lifespan: Option<i32>,
    pub callback_url: Option<String>,
    pub callback_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RetailerEntity> for Retailer {
    fn from(entity: RetailerEntity) -> Self {
        Self {
            id: entity.id,
            slug: entity.slug,
            name: entity.name,
            status: entity.status,
            loyalty_name: entity.loyalty_name,
            account_number_prefix: entity.account_number_prefix,
            account_number_length: entity.account_number_length,
            balance_lifespan: entity.balance_lifespan,
            callback_url: entity.callback_url,
            callback_secret: entity.callback_secret,
        }
    }
}

/// Database row mapping for the retailer_store table.
#[derive(Debug, Clone, FromRow)]
pub struct RetailerStoreEntity {
    pub id: i64,
    pub retailer_id: i64,
    pub store_name: String,
    pub mid: String,
}

impl From<RetailerStoreEntity> for RetailerStore {
    fn from(entity: RetailerStoreEntity) -> Self {
        Self {
            id: entity.id,
            retailer_id: entity.retailer_id,
            store_name: entity.store_name,
            mid: entity.mid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retailer_entity_to_domain() {
        let entity = RetailerEntity {
            id: 7,
            slug: "test-retailer".into(),
            name: "Test Retailer".into(),
            status: RetailerStatus::Active,
            loyalty_name: "points".into(),
            account_number_prefix: "TEST".into(),
            account_number_length: 10,
            balance_lifespan: Some(365),
            callback_url: None,
            callback_secret: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let retailer: Retailer = entity.into();
        assert_eq!(retailer.id, 7);
        assert_eq!(retailer.status, RetailerStatus::Active);
        assert_eq!(retailer.balance_lifespan, Some(365));
    }
}
