//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10, 2)`: at most ten digits, two of them
//! after the decimal point, never negative. A [`Price`] always carries a
//! scale of exactly two, so `10` serializes as `"10.00"`.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("price must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum allowed decimal places.
        max: u32,
    },
    /// The amount does not fit in ten digits.
    #[error("price must be at most {max}")]
    TooLarge {
        /// Maximum allowed amount.
        max: Decimal,
    },
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative amount with two decimal places.
///
/// ## Examples
///
/// ```
/// use bazaar_core::Price;
///
/// let price: Price = "10".parse().unwrap();
/// assert_eq!(price.to_string(), "10.00");
/// assert_eq!(price.times(3).to_string(), "30.00");
///
/// assert!("-1".parse::<Price>().is_err());
/// assert!("0.001".parse::<Price>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Number of decimal places every price carries.
    pub const SCALE: u32 = 2;

    /// Largest amount a single price may hold (`99999999.99`).
    #[must_use]
    pub fn max_amount() -> Decimal {
        Decimal::new(9_999_999_999, Self::SCALE)
    }

    /// Largest total an order may hold (`NUMERIC(20, 2)`).
    #[must_use]
    pub fn max_total() -> Decimal {
        Decimal::from_i128_with_scale(99_999_999_999_999_999_999, Self::SCALE)
    }

    /// A zero price.
    #[must_use]
    pub fn zero() -> Self {
        Self(Decimal::new(0, Self::SCALE))
    }

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or exceeds [`Price::max_amount`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_zero() {
            return Ok(Self::zero());
        }

        if amount.is_sign_negative() {
            return Err(PriceError::Negative);
        }

        if amount.normalize().scale() > Self::SCALE {
            return Err(PriceError::TooPrecise { max: Self::SCALE });
        }

        if amount > Self::max_amount() {
            return Err(PriceError::TooLarge {
                max: Self::max_amount(),
            });
        }

        Ok(Self::rescaled(amount))
    }

    /// Create a price from a whole number of cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or too large.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The price of `quantity` units.
    ///
    /// Totals are not capped at [`Price::max_amount`]; only single prices are.
    /// Callers storing a total check it against [`Price::max_total`].
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::rescaled(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
        )
    }

    fn rescaled(mut amount: Decimal) -> Self {
        amount.rescale(Self::SCALE);
        Self(amount)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount =
            Decimal::from_str(s.trim()).map_err(|e| PriceError::Invalid(e.to_string()))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::rescaled(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // NUMERIC(10, 2) columns are assumed valid; totals may exceed a single price
        Ok(Self::rescaled(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_number_gets_two_places() {
        let price: Price = "10".parse().unwrap();
        assert_eq!(price.to_string(), "10.00");
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!("-0.01".parse::<Price>(), Err(PriceError::Negative));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let price: Price = "-0.00".parse().unwrap();
        assert_eq!(price, Price::zero());
    }

    #[test]
    fn test_parse_too_precise() {
        assert!(matches!(
            "1.005".parse::<Price>(),
            Err(PriceError::TooPrecise { max: 2 })
        ));
    }

    #[test]
    fn test_trailing_zeros_are_not_too_precise() {
        let price: Price = "1.5000".parse().unwrap();
        assert_eq!(price.to_string(), "1.50");
    }

    #[test]
    fn test_parse_too_large() {
        assert!("99999999.99".parse::<Price>().is_ok());
        assert!(matches!(
            "100000000".parse::<Price>(),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            "ten dollars".parse::<Price>(),
            Err(PriceError::Invalid(_))
        ));
    }

    #[test]
    fn test_times() {
        let price = Price::from_cents(1999).unwrap();
        assert_eq!(price.times(3).to_string(), "59.97");
        assert_eq!(price.times(0), Price::zero());
    }

    #[test]
    fn test_sum() {
        let total: Price = [
            Price::from_cents(1000).unwrap(),
            Price::from_cents(250).unwrap(),
        ]
        .into_iter()
        .sum();
        assert_eq!(total.to_string(), "12.50");

        let empty: Price = std::iter::empty().sum();
        assert_eq!(empty.to_string(), "0.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let price = Price::from_cents(1000).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"10.00\"");
    }

    #[test]
    fn test_deserialize_validates() {
        let price: Price = serde_json::from_str("\"4.20\"").unwrap();
        assert_eq!(price.to_string(), "4.20");
        assert!(serde_json::from_str::<Price>("\"-4.20\"").is_err());
    }

    #[test]
    fn test_max_total_holds_large_carts() {
        let line = Price::new(Price::max_amount()).unwrap().times(101);
        assert_eq!(line.to_string(), "10099999998.99");
        assert!(line.amount() <= Price::max_total());
        assert_eq!(Price::max_total().to_string(), "999999999999999999.99");

        let widest_line = Price::new(Price::max_amount()).unwrap().times(u32::MAX);
        assert!(widest_line.amount() <= Price::max_total());
        assert!((widest_line + widest_line + widest_line).amount() > Price::max_total());
    }
}
