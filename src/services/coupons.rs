//! Coupon administration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Coupon, CouponDraft, Order};
use crate::domain::value_objects::{CouponName, DiscountKind};
use crate::services::EventBus;
use crate::store::{Store, StoreTx};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default)]
pub struct CouponPatch {
    pub name: Option<CouponName>,
    pub code: Option<String>,
    pub discount_kind: Option<DiscountKind>,
    pub discount_value: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    pub minimum_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn Store>,
    events: EventBus,
}

async fn ensure_unique(tx: &mut dyn StoreTx, coupon: &Coupon) -> Result<()> {
    if tx.coupon_by_code(&coupon.code).await?.is_some_and(|c| c.id != coupon.id) {
        return Err(EcommerceError::Conflict("coupon code already exists".into()));
    }
    if tx.coupon_by_name(coupon.name.as_str()).await?.is_some_and(|c| c.id != coupon.id) {
        return Err(EcommerceError::Conflict("coupon name already exists".into()));
    }
    Ok(())
}

/// Give back one use of `code` to `user_id`.
pub(crate) async fn release_usage(tx: &mut dyn StoreTx, user_id: Uuid, code: &str) -> Result<()> {
    if let Some(mut usage) = tx.coupon_usage_for_update(user_id, code).await? {
        usage.release();
        tx.save_coupon_usage(&usage).await?;
    }
    Ok(())
}

impl CouponService {
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self { Self { store, events } }

    pub async fn create_coupon(&self, draft: CouponDraft) -> Result<Coupon> {
        let coupon = Coupon::create(draft, Utc::now())?;

        let mut tx = self.store.begin().await?;
        ensure_unique(&mut *tx, &coupon).await?;
        tx.save_coupon(&coupon).await?;
        tx.commit().await?;

        info!(coupon_id = %coupon.id, code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    /// Apply the present fields, then re-check the merged coupon.
    pub async fn edit_coupon(&self, id: Uuid, patch: CouponPatch) -> Result<Coupon> {
        let mut tx = self.store.begin().await?;
        let mut coupon = tx.coupon(id).await?.ok_or_else(|| EcommerceError::not_found("coupon"))?;

        if let Some(name) = patch.name { coupon.name = name; }
        if let Some(code) = patch.code { coupon.code = code.trim().to_string(); }
        if let Some(kind) = patch.discount_kind { coupon.discount_kind = kind; }
        if let Some(value) = patch.discount_value { coupon.discount_value = value; }
        if let Some(maximum) = patch.maximum_discount { coupon.maximum_discount = maximum; }
        if let Some(minimum) = patch.minimum_amount { coupon.minimum_amount = minimum; }
        if let Some(limit) = patch.usage_limit { coupon.usage_limit = limit; }
        if let Some(starts_at) = patch.starts_at { coupon.starts_at = starts_at; }
        if let Some(active) = patch.is_active { coupon.is_active = active; }
        if let Some(expires_at) = patch.expires_at {
            coupon.expires_at = expires_at;
            coupon.ensure_expiry_ahead(Utc::now())?;
        }
        coupon.validate()?;
        coupon.touch();

        ensure_unique(&mut *tx, &coupon).await?;
        tx.save_coupon(&coupon).await?;
        tx.commit().await?;
        Ok(coupon)
    }

    pub async fn delete_coupon(&self, id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_coupon(id).await? {
            return Err(EcommerceError::not_found("coupon"));
        }
        tx.commit().await?;

        info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }

    /// Strip the coupon from an unpaid order and charge the full price.
    pub async fn remove_from_order(&self, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx.order_for_update(order_id).await?.ok_or_else(|| EcommerceError::not_found("order"))?;
        let code = order.remove_coupon()?;
        release_usage(&mut *tx, order.user_id, &code).await?;
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(%order_id, %code, final_price = %order.final_price, "coupon removed from order");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::store::MemoryStore;

    fn draft(name: &str, code: &str) -> CouponDraft {
        let now = Utc::now();
        CouponDraft {
            name: CouponName::new(name).unwrap(),
            code: code.into(),
            discount_kind: DiscountKind::Percentage,
            discount_value: Decimal::new(20, 0),
            maximum_discount: Decimal::new(150, 0),
            minimum_amount: Decimal::new(300, 0),
            usage_limit: 2,
            starts_at: now - Duration::days(1),
            expires_at: now + Duration::days(30),
        }
    }

    fn service() -> CouponService { CouponService::new(Arc::new(MemoryStore::new()), EventBus::default()) }

    #[tokio::test]
    async fn test_duplicate_code_and_name() {
        let coupons = service();
        coupons.create_coupon(draft("SUMMER", "SUM20")).await.unwrap();

        let err = coupons.create_coupon(draft("WINTER", "SUM20")).await.unwrap_err();
        assert_eq!(err.to_string(), "coupon code already exists");
        let err = coupons.create_coupon(draft("SUMMER", "SUM21")).await.unwrap_err();
        assert_eq!(err.to_string(), "coupon name already exists");
    }

    #[tokio::test]
    async fn test_edit_checks_merged_coupon() {
        let coupons = service();
        let coupon = coupons.create_coupon(draft("SUMMER", "SUM20")).await.unwrap();

        let patch = CouponPatch { discount_value: Some(Decimal::new(120, 0)), ..Default::default() };
        let err = coupons.edit_coupon(coupon.id, patch).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)));

        let patch = CouponPatch { is_active: Some(false), usage_limit: Some(5), ..Default::default() };
        let edited = coupons.edit_coupon(coupon.id, patch).await.unwrap();
        assert!(!edited.is_active);
        assert_eq!(edited.usage_limit, 5);
    }

    #[tokio::test]
    async fn test_expired_coupon_stays_editable() {
        let store = Arc::new(MemoryStore::new());
        let coupons = CouponService::new(store.clone(), EventBus::default());
        let coupon = coupons.create_coupon(draft("SPRING", "SPR10")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut expired = tx.coupon(coupon.id).await.unwrap().unwrap();
        expired.starts_at = Utc::now() - Duration::days(10);
        expired.expires_at = Utc::now() - Duration::days(2);
        tx.save_coupon(&expired).await.unwrap();
        tx.commit().await.unwrap();

        let patch = CouponPatch { is_active: Some(false), ..Default::default() };
        let edited = coupons.edit_coupon(coupon.id, patch).await.unwrap();
        assert!(!edited.is_active);

        let patch = CouponPatch { expires_at: Some(Utc::now() - Duration::days(1)), ..Default::default() };
        let err = coupons.edit_coupon(coupon.id, patch).await.unwrap_err();
        assert_eq!(err.to_string(), "expiry date cannot be in the past");
    }

    #[tokio::test]
    async fn test_delete_missing_coupon() {
        let err = service().delete_coupon(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, EcommerceError::NotFound(_)));
    }
}
