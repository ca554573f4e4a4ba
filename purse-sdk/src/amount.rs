//! Exact conversion between caller-facing amounts and gateway minor units.
//!
//! Caller-facing amounts are decimals in the major currency unit with at most
//! two fractional digits. The gateway speaks integer minor units (kobo for
//! NGN), so `50.25` becomes `5025`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Number of minor units in one major unit.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Fractional digits allowed on a caller-facing amount.
pub const AMOUNT_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount has more than {AMOUNT_SCALE} decimal places")]
    TooPrecise,
    #[error("amount is out of range")]
    OutOfRange,
}

/// Convert a major-unit amount into gateway minor units.
///
/// Fails instead of rounding when the amount carries sub-minor precision.
pub fn to_minor_units(amount: Decimal) -> Result<i64, AmountError> {
    let scaled = amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or(AmountError::OutOfRange)?;
    if !scaled.fract().is_zero() {
        return Err(AmountError::TooPrecise);
    }
    scaled.trunc().to_i64().ok_or(AmountError::OutOfRange)
}

/// Convert gateway minor units into a major-unit amount with scale 2.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, AMOUNT_SCALE)
}

/// Validate a caller-supplied amount and normalise it to scale 2.
///
/// Returns the normalised amount together with its minor-unit value.
pub fn normalize_positive(amount: Decimal) -> Result<(Decimal, i64), AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }
    let minor = to_minor_units(amount)?;
    Ok((from_minor_units(minor), minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_minor_units_exact() {
        assert_eq!(to_minor_units(dec("50.00")).unwrap(), 5000);
        assert_eq!(to_minor_units(dec("0.01")).unwrap(), 1);
        assert_eq!(to_minor_units(dec("40.1")).unwrap(), 4010);
        assert_eq!(to_minor_units(dec("19.99")).unwrap(), 1999);
        assert_eq!(to_minor_units(dec("123456789.99")).unwrap(), 12_345_678_999);
    }

    #[test]
    fn test_to_minor_units_rejects_sub_kobo() {
        assert_eq!(to_minor_units(dec("0.001")), Err(AmountError::TooPrecise));
        assert_eq!(to_minor_units(dec("10.125")), Err(AmountError::TooPrecise));
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        assert_eq!(to_minor_units(dec("7.5000")).unwrap(), 750);
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(from_minor_units(5000), dec("50.00"));
        assert_eq!(from_minor_units(1), dec("0.01"));
        assert_eq!(from_minor_units(5000).to_string(), "50.00");
    }

    #[test]
    fn test_every_cent_survives_the_round_trip() {
        for minor in 0..10_000 {
            assert_eq!(to_minor_units(from_minor_units(minor)).unwrap(), minor);
        }
    }

    #[test]
    fn test_normalize_positive() {
        let (amount, minor) = normalize_positive(dec("40.1")).unwrap();
        assert_eq!(amount.to_string(), "40.10");
        assert_eq!(minor, 4010);
        assert_eq!(normalize_positive(Decimal::ZERO), Err(AmountError::NotPositive));
        assert_eq!(normalize_positive(dec("-5")), Err(AmountError::NotPositive));
    }
}
