//! Monetary arithmetic helpers.
//!
//! Amounts are `rust_decimal::Decimal` in the invoice currency. Stored and
//! displayed amounts carry two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to cents, midpoint away from zero (`0.125 -> 0.13`).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `amount` needs no more than cent precision (`10.50`, `10.500`),
/// false for sub-cent amounts (`10.005`).
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// `round(amount * percent / 100)` to cents.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn whole_cents_ignores_trailing_zeros() {
        assert!(is_whole_cents(dec!(10)));
        assert!(is_whole_cents(dec!(10.5)));
        assert!(is_whole_cents(dec!(10.50)));
        assert!(is_whole_cents(dec!(10.500)));
        assert!(!is_whole_cents(dec!(10.005)));
        assert!(!is_whole_cents(dec!(0.001)));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(0.124)), dec!(0.12));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
    }

    #[test]
    fn percent_of_standard_rate() {
        assert_eq!(percent_of(dec!(175.00), dec!(19)), dec!(33.25));
        assert_eq!(percent_of(dec!(10.05), dec!(7)), dec!(0.70));
        assert_eq!(percent_of(dec!(0), dec!(19)), dec!(0));
    }
}
