//! Pure Dutch-auction pricing (C4). No I/O, no async, deterministic —
//! callers never need a runtime to exercise this module, matching the
//! spec's requirement that the pricing engine never suspends.

use chrono::{DateTime, Utc};

use crate::domain::AuctionParams;
use crate::error::ValidationError;

/// `currentPrice(auction, tNow)`. Monotonically non-increasing in
/// `tNow`, floored at `endPrice`. Uses integer arithmetic with the
/// auction duration as the fixed-point denominator, as specified.
pub fn current_price(auction: &AuctionParams, now: DateTime<Utc>) -> u128 {
    let elapsed = (now - auction.start_time).num_seconds().max(0) as u128;
    let duration = auction.duration_secs as u128;
    if duration == 0 || elapsed >= duration {
        return auction.end_price;
    }
    let span = auction.start_price - auction.end_price;
    auction.start_price - (span * elapsed) / duration
}

/// `validateQuote`. Succeeds iff `endPrice <= quoted <= currentPrice + tolerance`.
pub fn validate_quote(
    auction: &AuctionParams,
    quoted: u128,
    now: DateTime<Utc>,
    tolerance: u128,
) -> Result<(), ValidationError> {
    let ceiling = current_price(auction, now) + tolerance;
    if quoted < auction.end_price || quoted > ceiling {
        return Err(ValidationError::PriceOutOfBand {
            quoted,
            floor: auction.end_price,
            ceiling,
        });
    }
    Ok(())
}

/// Internal fixed-point scale for price-based conversions. A "quoted"
/// price of `PRICE_SCALE` base units of dst per 1 base unit of src at
/// matching decimals is treated as 1:1.
pub const PRICE_SCALE: u128 = 1_000_000;

/// `tokenAmounts`. Converts `srcAmount` base units into the
/// corresponding `dstAmount` base units at the quoted price, adjusting
/// for the two tokens' decimals. Division truncates toward zero.
pub fn token_amounts(
    src_amount: u128,
    src_decimals: u8,
    dst_decimals: u8,
    quoted_price: u128,
) -> u128 {
    let numerator = src_amount.saturating_mul(quoted_price);
    let scaled = if dst_decimals >= src_decimals {
        numerator.saturating_mul(10u128.pow((dst_decimals - src_decimals) as u32))
    } else {
        numerator / 10u128.pow((src_decimals - dst_decimals) as u32)
    };
    scaled / PRICE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auction(start_price: u128, end_price: u128, duration_secs: u64, start_time: DateTime<Utc>) -> AuctionParams {
        AuctionParams { start_price, end_price, duration_secs, start_time }
    }

    #[test]
    fn price_decays_linearly() {
        let t0 = Utc::now();
        let a = auction(1_000_000, 900_000, 60, t0);
        assert_eq!(current_price(&a, t0), 1_000_000);
        assert_eq!(current_price(&a, t0 + Duration::seconds(30)), 950_000);
        assert_eq!(current_price(&a, t0 + Duration::seconds(60)), 900_000);
    }

    #[test]
    fn price_floors_at_end_price_after_expiry() {
        let t0 = Utc::now();
        let a = auction(1_000_000, 900_000, 60, t0);
        assert_eq!(current_price(&a, t0 + Duration::seconds(301)), 900_000);
    }

    #[test]
    fn price_is_monotonic_non_increasing() {
        let t0 = Utc::now();
        let a = auction(2_000_000, 500_000, 120, t0);
        let mut prev = current_price(&a, t0);
        for s in 1..=130 {
            let p = current_price(&a, t0 + Duration::seconds(s));
            assert!(p <= prev);
            assert!(p >= a.end_price);
            prev = p;
        }
    }

    #[test]
    fn validate_quote_rejects_above_ceiling() {
        let t0 = Utc::now();
        let a = auction(1_000_000, 900_000, 60, t0);
        assert!(validate_quote(&a, 999_999, t0 + Duration::seconds(30), 0).is_err());
        assert!(validate_quote(&a, 950_000, t0 + Duration::seconds(30), 0).is_ok());
    }

    #[test]
    fn validate_quote_rejects_below_end_price() {
        let t0 = Utc::now();
        let a = auction(1_000_000, 900_000, 60, t0);
        assert!(validate_quote(&a, 899_999, t0, 0).is_err());
    }

    #[test]
    fn token_amounts_same_decimals() {
        // quoted == PRICE_SCALE means 1:1.
        assert_eq!(token_amounts(1_000_000, 18, 18, PRICE_SCALE), 1_000_000);
    }

    #[test]
    fn token_amounts_handles_decimal_skew() {
        // src has 6 decimals, dst has 18: 1 src unit (1e-6 token) at 1:1
        // price becomes 1e12 dst base units (1e-6 token at 18 decimals).
        let amount = token_amounts(1, 6, 18, PRICE_SCALE);
        assert_eq!(amount, 1_000_000_000_000);
    }
}
