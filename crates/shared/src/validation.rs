//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of retailer and campaign slugs.
const MAX_SLUG_LENGTH: usize = 32;

/// Maximum length of external transaction identifiers.
const MAX_TRANSACTION_ID_LENGTH: usize = 128;

/// Validates that a slug is non-empty, lowercase kebab-case and within length.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let well_formed = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');

    if well_formed {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug_format");
        err.message = Some("Slug must be lowercase kebab-case, at most 32 characters".into());
        Err(err)
    }
}

/// Validates an external transaction id.
pub fn validate_transaction_id(id: &str) -> Result<(), ValidationError> {
    if !id.is_empty() && id.len() <= MAX_TRANSACTION_ID_LENGTH {
        Ok(())
    } else {
        let mut err = ValidationError::new("transaction_id_length");
        err.message = Some("Transaction id must be between 1 and 128 characters".into());
        Err(err)
    }
}

/// Validates that a transaction amount is non-zero.
///
/// Zero-amount transactions carry no earn information and are rejected at
/// the validation boundary rather than being threaded through the pipeline.
pub fn validate_amount(amount: i64) -> Result<(), ValidationError> {
    if amount != 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount_zero");
        err.message = Some("Transaction amount must be non-zero".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug_accepts_kebab_case() {
        assert!(validate_slug("test-retailer").is_ok());
        assert!(validate_slug("campaign-10pct").is_ok());
    }

    #[test]
    fn test_validate_slug_rejects_bad_input() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Has-Uppercase").is_err());
        assert!(validate_slug("spaces here").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
        assert!(validate_slug(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_transaction_id() {
        assert!(validate_transaction_id("tx-0001").is_ok());
        assert!(validate_transaction_id("").is_err());
        assert!(validate_transaction_id(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(100).is_ok());
        assert!(validate_amount(-100).is_ok());
        assert!(validate_amount(0).is_err());
    }
}
