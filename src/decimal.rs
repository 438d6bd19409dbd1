use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// money type with 2 decimal places precision, enough for any school currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const DP: u32 = 2;

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(Self::DP))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(Self::DP)))
    }

    /// create from whole currency units (shillings, dollars, ...)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// check if strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// check if negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// `max(0, self - other)`
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Money::ZERO)
    }

    /// coerce an untrusted json value into a non-negative amount.
    ///
    /// Numbers and numeric strings (thousands separators allowed) are
    /// accepted. Everything else, including negative figures, becomes zero.
    pub fn coerce(value: &serde_json::Value) -> Self {
        let parsed = match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Decimal::from(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Decimal::from(u))
                } else {
                    n.as_f64().and_then(Decimal::from_f64)
                }
            }
            serde_json::Value::String(s) => parse_lenient(s),
            serde_json::Value::Null => return Money::ZERO,
            _ => None,
        };

        match parsed {
            Some(d) if d >= Decimal::ZERO => Money::from_decimal(d),
            Some(d) => {
                tracing::warn!(amount = %d, "negative amount coerced to zero");
                Money::ZERO
            }
            None => {
                tracing::warn!(value = %value, "non-numeric amount coerced to zero");
                Money::ZERO
            }
        }
    }
}

fn parse_lenient(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).ok()
}

/// serde helper for amounts arriving from the fee and payment stores
pub fn coerce_money<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Money::coerce(&value))
}

/// same as [`coerce_money`] but keeps absence distinct from zero
pub fn coerce_optional_money<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| Money::coerce(&v)))
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(Self::DP))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(Self::DP);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(Self::DP))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.126").unwrap();
        assert_eq!(m.to_string(), "100.13");
    }

    #[test]
    fn test_saturating_sub_never_negative() {
        let fee = Money::from_major(50_000);
        let paid = Money::from_major(80_000);

        assert_eq!(fee.saturating_sub(paid), Money::ZERO);
        assert_eq!(paid.saturating_sub(fee), Money::from_major(30_000));
    }

    #[test]
    fn test_coerce_numbers_and_strings() {
        assert_eq!(Money::coerce(&json!(800000)), Money::from_major(800_000));
        assert_eq!(Money::coerce(&json!(1250.5)), Money::from_decimal(dec!(1250.5)));
        assert_eq!(Money::coerce(&json!("500,000")), Money::from_major(500_000));
        assert_eq!(Money::coerce(&json!(" 75 000 ")), Money::from_major(75_000));
        assert_eq!(Money::coerce(&json!("")), Money::ZERO);
    }

    #[test]
    fn test_coerce_garbage_is_zero() {
        assert_eq!(Money::coerce(&json!(null)), Money::ZERO);
        assert_eq!(Money::coerce(&json!("abc")), Money::ZERO);
        assert_eq!(Money::coerce(&json!(true)), Money::ZERO);
        assert_eq!(Money::coerce(&json!({"amount": 5})), Money::ZERO);
        assert_eq!(Money::coerce(&json!(-200)), Money::ZERO);
    }

    #[test]
    fn test_sum() {
        let items = vec![Money::from_major(1), Money::from_major(2), Money::from_major(3)];
        let total: Money = items.iter().sum();
        assert_eq!(total, Money::from_major(6));
    }
}
