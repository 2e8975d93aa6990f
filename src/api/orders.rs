use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::extract::ValidatedJson;
use crate::api::{ApiResult, AppState, CurrentAdmin, CurrentUser};
use crate::domain::aggregates::{Order, PaymentMethod};
use crate::services::orders::PlaceOrder;
use crate::services::Actor;
use crate::EcommerceError;

#[derive(Debug, Deserialize, Validate)]
pub(super) struct PlaceOrderRequest {
    address_id: Uuid,
    #[validate(length(max = 50))]
    coupon_code: Option<String>,
    /// `cash on delivery`, `online payment` or `wallet`, matched exactly.
    payment_method: String,
}

pub(super) async fn place_order(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    ValidatedJson(req): ValidatedJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let payment_method = req.payment_method.parse::<PaymentMethod>().map_err(EcommerceError::from)?;
    let request = PlaceOrder { address_id: req.address_id, coupon_code: req.coupon_code, payment_method };
    let order = s.services.orders.place_order(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub(super) async fn list_orders(CurrentUser(user_id): CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.services.orders.list_for_user(user_id).await?))
}

pub(super) async fn get_order(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.order(Actor::User(user_id), order_id).await?))
}

pub(super) async fn cancel_order(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.cancel_order(Actor::User(user_id), order_id).await?))
}

pub(super) async fn return_order(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.return_order(user_id, order_id).await?))
}

pub(super) async fn cancel_item(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path((order_id, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.cancel_item(user_id, order_id, product_id).await?))
}

pub(super) async fn confirm_payment(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.confirm_payment(user_id, order_id).await?))
}

pub(super) async fn fail_payment(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.fail_payment(user_id, order_id).await?))
}

pub(super) async fn admin_list_orders(_: CurrentAdmin, State(s): State<AppState>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.services.orders.list_all().await?))
}

pub(super) async fn admin_get_order(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.order(Actor::Admin, order_id).await?))
}

pub(super) async fn admin_cancel_order(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.cancel_order(Actor::Admin, order_id).await?))
}

pub(super) async fn ship_order(_: CurrentAdmin, State(s): State<AppState>, Path(order_id): Path<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.ship(order_id).await?))
}

pub(super) async fn deliver_order(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.deliver(order_id).await?))
}
