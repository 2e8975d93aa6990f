//! Value Objects for E-commerce

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Round a monetary amount to two decimal places, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// How a discount value is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for DiscountKind {
    type Err = OfferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(OfferError::UnknownKind(other.to_string())),
        }
    }
}

/// A product- or category-level offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Offer {
    kind: DiscountKind,
    value: Decimal,
}

impl Offer {
    pub fn new(kind: DiscountKind, value: Decimal) -> Result<Self, OfferError> {
        if value <= Decimal::ZERO { return Err(OfferError::NonPositive); }
        if kind == DiscountKind::Percentage && value > Decimal::ONE_HUNDRED {
            return Err(OfferError::PercentageAbove100);
        }
        Ok(Self { kind, value })
    }

    /// Build an offer from the nullable `(offer_type, offer_value)` column pair.
    /// A missing type or a zero value means "no offer".
    pub fn from_columns(kind: Option<&str>, value: Decimal) -> Result<Option<Self>, OfferError> {
        match kind {
            None | Some("") => Ok(None),
            Some(_) if value.is_zero() => Ok(None),
            Some(kind) => Self::new(kind.parse()?, value).map(Some),
        }
    }

    pub fn kind(&self) -> DiscountKind { self.kind }
    pub fn value(&self) -> Decimal { self.value }

    /// Absolute amount this offer takes off `price`, never more than `price`.
    pub fn discount_on(&self, price: Decimal) -> Decimal {
        let raw = match self.kind {
            DiscountKind::Percentage => price * self.value / Decimal::ONE_HUNDRED,
            DiscountKind::Fixed => self.value,
        };
        round_money(raw.min(price).max(Decimal::ZERO))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfferError {
    #[error("discount type must be either 'percentage' or 'fixed', got '{0}'")]
    UnknownKind(String),
    #[error("offer value must be greater than 0")]
    NonPositive,
    #[error("percentage discount cannot exceed 100%")]
    PercentageAbove100,
    #[error("offer type and offer value must be provided together")]
    Incomplete,
}

/// Coupon display name. Always upper case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponName(String);

impl CouponName {
    pub fn new(value: impl Into<String>) -> Result<Self, CouponNameError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(CouponNameError::Empty); }
        if value.len() > 50 { return Err(CouponNameError::TooLong); }
        if value != value.to_uppercase() { return Err(CouponNameError::NotUppercase); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for CouponName {
    type Error = CouponNameError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CouponName> for String {
    fn from(name: CouponName) -> Self { name.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponNameError {
    #[error("coupon name is required")]
    Empty,
    #[error("coupon name is too long")]
    TooLong,
    #[error("coupon name must be in uppercase")]
    NotUppercase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_name() {
        assert_eq!(CouponName::new(" DIWALI20 ").unwrap().as_str(), "DIWALI20");
        assert_eq!(CouponName::new("diwali20"), Err(CouponNameError::NotUppercase));
        assert_eq!(CouponName::new(""), Err(CouponNameError::Empty));
    }

    #[test]
    fn test_offer_bounds() {
        assert_eq!(Offer::new(DiscountKind::Percentage, Decimal::new(101, 0)), Err(OfferError::PercentageAbove100));
        assert_eq!(Offer::new(DiscountKind::Fixed, Decimal::ZERO), Err(OfferError::NonPositive));
        assert!(Offer::new(DiscountKind::Fixed, Decimal::new(500, 0)).is_ok());
    }

    #[test]
    fn test_offer_discount() {
        let pct = Offer::new(DiscountKind::Percentage, Decimal::new(10, 0)).unwrap();
        assert_eq!(pct.discount_on(Decimal::new(250, 0)), Decimal::new(25, 0));
        let fixed = Offer::new(DiscountKind::Fixed, Decimal::new(300, 0)).unwrap();
        assert_eq!(fixed.discount_on(Decimal::new(250, 0)), Decimal::new(250, 0));
    }

    #[test]
    fn test_offer_from_columns() {
        assert_eq!(Offer::from_columns(None, Decimal::new(5, 0)), Ok(None));
        assert_eq!(Offer::from_columns(Some("fixed"), Decimal::ZERO), Ok(None));
        assert!(Offer::from_columns(Some("bogus"), Decimal::ONE).is_err());
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(Decimal::new(10005, 3)), Decimal::new(1001, 2));
    }
}
