use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::extract::ValidatedJson;
use crate::api::{ApiResult, AppState, CurrentAdmin};
use crate::domain::aggregates::{Coupon, CouponDraft, Order};
use crate::domain::value_objects::{CouponName, DiscountKind};
use crate::services::coupons::CouponPatch;
use crate::EcommerceError;

/// Coupon dates are whole days, starting at midnight UTC.
fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn coupon_name(name: String) -> Result<CouponName, EcommerceError> {
    Ok(CouponName::new(name)?)
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CreateCouponRequest {
    name: String,
    #[validate(length(min = 1, max = 50, message = "coupon code is required"))]
    code: String,
    discount_type: DiscountKind,
    discount_value: Decimal,
    #[serde(default)]
    maximum_discount: Decimal,
    #[serde(default)]
    minimum_amount: Decimal,
    #[validate(range(min = 1, message = "usage limit must be greater than 0"))]
    usage_limit: i32,
    start_date: NaiveDate,
    expiry_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct EditCouponRequest {
    name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    code: Option<String>,
    discount_type: Option<DiscountKind>,
    discount_value: Option<Decimal>,
    maximum_discount: Option<Decimal>,
    minimum_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "usage limit must be greater than 0"))]
    usage_limit: Option<i32>,
    start_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    is_active: Option<bool>,
}

pub(super) async fn create_coupon(
    _: CurrentAdmin,
    State(s): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCouponRequest>,
) -> ApiResult<(StatusCode, Json<Coupon>)> {
    let draft = CouponDraft {
        name: coupon_name(req.name)?,
        code: req.code,
        discount_kind: req.discount_type,
        discount_value: req.discount_value,
        maximum_discount: req.maximum_discount,
        minimum_amount: req.minimum_amount,
        usage_limit: req.usage_limit,
        starts_at: day_start(req.start_date),
        expires_at: day_start(req.expiry_date),
    };
    Ok((StatusCode::CREATED, Json(s.services.coupons.create_coupon(draft).await?)))
}

pub(super) async fn edit_coupon(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(coupon_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EditCouponRequest>,
) -> ApiResult<Json<Coupon>> {
    let patch = CouponPatch {
        name: req.name.map(coupon_name).transpose()?,
        code: req.code,
        discount_kind: req.discount_type,
        discount_value: req.discount_value,
        maximum_discount: req.maximum_discount,
        minimum_amount: req.minimum_amount,
        usage_limit: req.usage_limit,
        starts_at: req.start_date.map(day_start),
        expires_at: req.expiry_date.map(day_start),
        is_active: req.is_active,
    };
    Ok(Json(s.services.coupons.edit_coupon(coupon_id, patch).await?))
}

pub(super) async fn delete_coupon(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    s.services.coupons.delete_coupon(coupon_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn remove_from_order(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.coupons.remove_from_order(order_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_start() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(day_start(date), Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_lowercase_name_rejected() {
        assert!(matches!(coupon_name("summer".into()), Err(EcommerceError::Validation(_))));
    }
}
