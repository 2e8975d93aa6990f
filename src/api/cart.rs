use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::{ApiResult, AppState, CurrentUser};
use crate::domain::aggregates::Cart;

pub(super) async fn list_cart(CurrentUser(user_id): CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.services.cart.list_cart(user_id).await?))
}

pub(super) async fn add_to_cart(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<Cart>> {
    Ok(Json(s.services.cart.add_to_cart(user_id, product_id).await?))
}

pub(super) async fn remove_from_cart(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<Cart>> {
    Ok(Json(s.services.cart.remove_from_cart(user_id, product_id).await?))
}
