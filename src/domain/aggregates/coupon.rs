//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::{round_money, CouponName, DiscountKind};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Coupon {
    pub id: Uuid,
    pub name: CouponName,
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    /// Cap for percentage coupons; zero means uncapped.
    pub maximum_discount: Decimal,
    pub minimum_amount: Decimal,
    /// Redemptions allowed per user.
    pub usage_limit: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Coupon::create`].
#[derive(Clone, Debug)]
pub struct CouponDraft {
    pub name: CouponName,
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    pub maximum_discount: Decimal,
    pub minimum_amount: Decimal,
    pub usage_limit: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Coupon {
    pub fn create(draft: CouponDraft, now: DateTime<Utc>) -> Result<Self, CouponError> {
        let coupon = Self {
            id: Uuid::now_v7(), name: draft.name, code: draft.code.trim().to_string(),
            discount_kind: draft.discount_kind, discount_value: draft.discount_value,
            maximum_discount: draft.maximum_discount, minimum_amount: draft.minimum_amount,
            usage_limit: draft.usage_limit, starts_at: draft.starts_at, expires_at: draft.expires_at,
            is_active: true, created_at: now, updated_at: now,
        };
        coupon.validate()?;
        coupon.ensure_expiry_ahead(now)?;
        Ok(coupon)
    }

    /// Check the coupon's own consistency rules.
    pub fn validate(&self) -> Result<(), CouponError> {
        let invalid = |msg: &str| -> Result<(), CouponError> { Err(CouponError::Invalid(msg.to_string())) };
        if self.code.is_empty() { return invalid("coupon code is required"); }
        if self.discount_value <= Decimal::ZERO { return invalid("discount value must be greater than 0"); }
        if self.discount_kind == DiscountKind::Percentage {
            if self.discount_value > Decimal::ONE_HUNDRED {
                return invalid("percentage discount cannot exceed 100");
            }
            if self.maximum_discount > Decimal::ZERO && self.maximum_discount < self.discount_value {
                return invalid("maximum discount must not be less than the discount value");
            }
        }
        if self.maximum_discount < Decimal::ZERO { return invalid("maximum discount cannot be negative"); }
        if self.minimum_amount < Decimal::ZERO { return invalid("minimum amount cannot be negative"); }
        if self.usage_limit <= 0 { return invalid("usage limit must be greater than 0"); }
        if self.expires_at <= self.starts_at { return invalid("expiry date must be after the start date"); }
        Ok(())
    }

    /// A newly set expiry date must lie in the future.
    pub fn ensure_expiry_ahead(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if self.expires_at <= now {
            return Err(CouponError::Invalid("expiry date cannot be in the past".into()));
        }
        Ok(())
    }

    /// Whether a user who has redeemed this coupon `times_used` times may apply
    /// it to an order with the given subtotal.
    pub fn check_redeemable(&self, now: DateTime<Utc>, times_used: i32, subtotal: Decimal) -> Result<(), CouponError> {
        if !self.is_active { return Err(CouponError::Inactive); }
        if now < self.starts_at { return Err(CouponError::NotStarted); }
        if now >= self.expires_at { return Err(CouponError::Expired); }
        if times_used >= self.usage_limit { return Err(CouponError::UsageLimitReached); }
        if subtotal < self.minimum_amount {
            return Err(CouponError::BelowMinimum { minimum: self.minimum_amount });
        }
        Ok(())
    }

    /// Discount granted on `subtotal`, never more than the subtotal itself.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.discount_kind {
            DiscountKind::Fixed => self.discount_value,
            DiscountKind::Percentage => {
                let amount = subtotal * self.discount_value / Decimal::ONE_HUNDRED;
                if self.maximum_discount > Decimal::ZERO { amount.min(self.maximum_discount) } else { amount }
            }
        };
        round_money(raw.min(subtotal).max(Decimal::ZERO))
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Per-user redemption counter for one coupon code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CouponUsage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coupon_code: String,
    pub times_used: i32,
}

impl CouponUsage {
    pub fn new(user_id: Uuid, coupon_code: impl Into<String>) -> Self {
        Self { id: Uuid::now_v7(), user_id, coupon_code: coupon_code.into(), times_used: 0 }
    }

    pub fn record_use(&mut self) { self.times_used += 1; }
    pub fn release(&mut self) { self.times_used = (self.times_used - 1).max(0); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponError {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("you exceeded the coupon usage limit")]
    UsageLimitReached,
    #[error("order amount must be at least {minimum} to use this coupon")]
    BelowMinimum { minimum: Decimal },
    #[error("{0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: DiscountKind, value: i64, max: i64, min: i64) -> Coupon {
        let now = Utc::now();
        Coupon::create(CouponDraft {
            name: CouponName::new("FESTIVE").unwrap(), code: "FEST".into(), discount_kind: kind,
            discount_value: Decimal::new(value, 0), maximum_discount: Decimal::new(max, 0),
            minimum_amount: Decimal::new(min, 0), usage_limit: 2,
            starts_at: now - Duration::days(1), expires_at: now + Duration::days(30),
        }, now).unwrap()
    }

    #[test]
    fn test_percentage_cap() {
        let c = coupon(DiscountKind::Percentage, 20, 150, 0);
        assert_eq!(c.discount_for(Decimal::new(1000, 0)), Decimal::new(150, 0));
        assert_eq!(c.discount_for(Decimal::new(500, 0)), Decimal::new(100, 0));
    }

    #[test]
    fn test_uncapped_percentage() {
        let c = coupon(DiscountKind::Percentage, 20, 0, 0);
        assert_eq!(c.discount_for(Decimal::new(1000, 0)), Decimal::new(200, 0));
    }

    #[test]
    fn test_fixed_clamped_to_subtotal() {
        let c = coupon(DiscountKind::Fixed, 300, 0, 0);
        assert_eq!(c.discount_for(Decimal::new(120, 0)), Decimal::new(120, 0));
    }

    #[test]
    fn test_redeemable_rules() {
        let mut c = coupon(DiscountKind::Fixed, 50, 0, 200);
        let now = Utc::now();
        assert!(c.check_redeemable(now, 0, Decimal::new(250, 0)).is_ok());
        assert_eq!(c.check_redeemable(now, 2, Decimal::new(250, 0)), Err(CouponError::UsageLimitReached));
        assert!(matches!(c.check_redeemable(now, 0, Decimal::new(150, 0)), Err(CouponError::BelowMinimum { .. })));
        assert_eq!(c.check_redeemable(now + Duration::days(31), 0, Decimal::new(250, 0)), Err(CouponError::Expired));
        assert_eq!(c.check_redeemable(now - Duration::days(2), 0, Decimal::new(250, 0)), Err(CouponError::NotStarted));
        c.is_active = false;
        assert_eq!(c.check_redeemable(now, 0, Decimal::new(250, 0)), Err(CouponError::Inactive));
    }

    #[test]
    fn test_create_validation() {
        let now = Utc::now();
        let mut draft = CouponDraft {
            name: CouponName::new("SUMMER").unwrap(), code: "SUM10".into(), discount_kind: DiscountKind::Percentage,
            discount_value: Decimal::new(120, 0), maximum_discount: Decimal::ZERO, minimum_amount: Decimal::ZERO,
            usage_limit: 1, starts_at: now, expires_at: now + Duration::days(1),
        };
        assert!(matches!(Coupon::create(draft.clone(), now), Err(CouponError::Invalid(_))));
        draft.discount_value = Decimal::new(10, 0);
        draft.expires_at = now - Duration::days(1);
        assert!(matches!(Coupon::create(draft.clone(), now), Err(CouponError::Invalid(_))));
        draft.expires_at = now + Duration::days(1);
        assert!(Coupon::create(draft, now).is_ok());
    }

    #[test]
    fn test_usage_release_floor() {
        let mut usage = CouponUsage::new(Uuid::now_v7(), "FEST");
        usage.release();
        assert_eq!(usage.times_used, 0);
        usage.record_use();
        assert_eq!(usage.times_used, 1);
    }
}
