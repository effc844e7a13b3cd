//! Loyalty account number generation.
//!
//! Account numbers have the shape `{prefix}{digits}` where the digit run is
//! zero-padded to the retailer's configured total length. Collisions are
//! possible and must be handled by the caller (retry on unique violation).

use rand::Rng;

/// Minimum total length of the numeric portion.
const MIN_DIGIT_COUNT: usize = 6;

/// Generates a new account number for the given retailer prefix.
///
/// `total_length` is the length of the numeric portion, not counting the
/// prefix; values below the minimum are raised to it.
pub fn generate(prefix: &str, total_length: usize) -> String {
    let digit_count = total_length.max(MIN_DIGIT_COUNT);
    let mut rng = rand::thread_rng();
    let digits: String = (0..digit_count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect();
    format!("{}{}", prefix.to_uppercase(), digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_prefix_and_length() {
        let number = generate("TEST", 10);
        assert!(number.starts_with("TEST"));
        assert_eq!(number.len(), 4 + 10);
    }

    #[test]
    fn test_generate_uppercases_prefix() {
        let number = generate("acme", 8);
        assert!(number.starts_with("ACME"));
    }

    #[test]
    fn test_generate_numeric_portion_is_digits() {
        let number = generate("LOY", 10);
        assert!(number[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_enforces_minimum_length() {
        let number = generate("X", 2);
        assert_eq!(number.len(), 1 + MIN_DIGIT_COUNT);
    }

    #[test]
    fn test_generate_is_randomised() {
        // Two 10-digit draws colliding is a 1-in-10^10 event; treat as never.
        assert_ne!(generate("A", 10), generate("A", 10));
    }
}
