//! Account holder entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AccountHolder, AccountHolderStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the account_holder table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountHolderEntity {
    pub id: i64,
    pub account_holder_uuid: Uuid,
    pub retailer_id: i64,
    pub email: String,
    pub status: AccountHolderStatus,
    pub account_number: Option<String>,
    pub opt_out_token: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountHolderEntity> for AccountHolder {
    fn from(entity: AccountHolderEntity) -> Self {
        Self {
            id: entity.id,
            account_holder_uuid: entity.account_holder_uuid,
            retailer_id: entity.retailer_id,
            email: entity.email,
            status: entity.status,
            account_number: entity.account_number,
            opt_out_token: entity.opt_out_token,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_holder_entity_to_domain() {
        let uuid = Uuid::new_v4();
        let entity = AccountHolderEntity {
            id: 3,
            account_holder_uuid: uuid,
            retailer_id: 1,
            email: "customer@example.com".into(),
            status: AccountHolderStatus::Pending,
            account_number: None,
            opt_out_token: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let holder: AccountHolder = entity.into();
        assert_eq!(holder.account_holder_uuid, uuid);
        assert_eq!(holder.status, AccountHolderStatus::Pending);
        assert!(holder.account_number.is_none());
    }
}
