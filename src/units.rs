//! Conversion of raw smallest-unit balances into decimal quantities

/// Decimal precision assumed when a token does not declare one
pub const DEFAULT_DECIMALS: i64 = 18;

/// Convert a raw integer balance into a decimal quantity
///
/// `raw` is expressed in the asset's smallest indivisible unit (wei for ETH).
/// A negative `decimals` value falls back to [`DEFAULT_DECIMALS`]. A value of
/// zero returns the raw integer unchanged, with no scaling applied.
pub fn normalize_units(raw: u128, decimals: i64) -> f64 {
    if raw == 0 {
        return 0.0;
    }

    let decimals = if decimals < 0 { DEFAULT_DECIMALS } else { decimals };
    if decimals == 0 {
        return raw as f64;
    }

    raw as f64 / 10f64.powi(decimals as i32)
}

/// Parse a decimal-string wire payload into a raw integer amount
///
/// Etherscan returns balances as base-10 strings of the smallest unit.
/// A malformed payload yields `None` so the caller can skip the entry
/// instead of aborting the refresh cycle.
pub fn parse_raw_amount(raw: &str) -> Option<u128> {
    raw.trim().parse::<u128>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_matches_power_of_ten_division() {
        let raw = 123_456_789_000_000_000_000u128;
        for decimals in 0..=18i64 {
            let expected = raw as f64 / 10f64.powi(decimals as i32);
            assert_eq!(normalize_units(raw, decimals), expected, "decimals={}", decimals);
        }
    }

    #[test]
    fn test_negative_decimals_default_to_eighteen() {
        let raw = 2_000_000_000_000_000_000u128;
        assert_eq!(normalize_units(raw, -1), normalize_units(raw, 18));
        assert_eq!(normalize_units(raw, -1), 2.0);
    }

    #[test]
    fn test_zero_decimals_returns_raw_unchanged() {
        assert_eq!(normalize_units(42, 0), 42.0);
        assert_eq!(normalize_units(1_000_000, 0), 1_000_000.0);
    }

    #[test]
    fn test_zero_raw_normalizes_to_zero() {
        assert_eq!(normalize_units(0, 18), 0.0);
        assert_eq!(normalize_units(0, 0), 0.0);
        assert_eq!(normalize_units(0, -1), 0.0);
    }

    #[test]
    fn test_typical_token_amounts() {
        // 5 USDC at 6 decimals
        assert_eq!(normalize_units(5_000_000, 6), 5.0);
        // 2 ETH in wei
        assert_eq!(normalize_units(2_000_000_000_000_000_000, 18), 2.0);
        // 1 WBTC at 8 decimals
        assert_eq!(normalize_units(100_000_000, 8), 1.0);
    }

    #[test]
    fn test_parse_raw_amount() {
        assert_eq!(parse_raw_amount("5000000"), Some(5_000_000));
        assert_eq!(parse_raw_amount(" 42 "), Some(42));
        assert_eq!(parse_raw_amount("0"), Some(0));
        assert_eq!(parse_raw_amount(""), None);
        assert_eq!(parse_raw_amount("abc"), None);
        assert_eq!(parse_raw_amount("-1"), None);
        assert_eq!(parse_raw_amount("1.5"), None);
    }
}
