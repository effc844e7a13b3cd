//! Display formatting for monetary and stamp balances.
//!
//! Balances are stored as signed integers: pence for accumulator campaigns,
//! stamp counts for stamp campaigns. These helpers produce the
//! human-readable strings used in activity summaries.

/// Formats an amount in minor currency units as a currency string.
///
/// Only GBP is currently supported by the activity stream consumers.
pub fn pence_to_currency_string(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let symbol = match currency {
        "GBP" => "£",
        _ => "",
    };
    format!("{sign}{symbol}{}.{:02}", abs / 100, abs % 100)
}

/// Formats a raw stamp count as a stamp string.
pub fn stamps_to_string(count: i64) -> String {
    if count == 1 || count == -1 {
        format!("{count} stamp")
    } else {
        format!("{count} stamps")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pence_to_currency_string() {
        assert_eq!(pence_to_currency_string(1550, "GBP"), "£15.50");
        assert_eq!(pence_to_currency_string(5, "GBP"), "£0.05");
        assert_eq!(pence_to_currency_string(0, "GBP"), "£0.00");
    }

    #[test]
    fn test_pence_to_currency_string_negative() {
        assert_eq!(pence_to_currency_string(-1550, "GBP"), "-£15.50");
        assert_eq!(pence_to_currency_string(-1, "GBP"), "-£0.01");
    }

    #[test]
    fn test_pence_to_currency_string_unknown_currency() {
        assert_eq!(pence_to_currency_string(100, "XXX"), "1.00");
    }

    #[test]
    fn test_stamps_to_string() {
        assert_eq!(stamps_to_string(1), "1 stamp");
        assert_eq!(stamps_to_string(-1), "-1 stamp");
        assert_eq!(stamps_to_string(3), "3 stamps");
        assert_eq!(stamps_to_string(0), "0 stamps");
    }
}
