//! Addresses, wishlist and wallet of the signed-in user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::extract::{double_option, ValidatedJson};
use crate::api::{ApiResult, AppState, CurrentUser};
use crate::domain::aggregates::{Address, AddressKind, WishlistEntry};
use crate::services::accounts::{AddressPatch, NewAddress};
use crate::services::wallet::WalletStatement;

#[derive(Debug, Deserialize, Validate)]
pub(super) struct AddressRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(equal = 10, message = "phone number must have 10 digits"))]
    phone_no: String,
    #[validate(length(min = 1, max = 200))]
    address_line1: String,
    #[validate(length(max = 200))]
    address_line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    city: String,
    #[validate(length(min = 1, max = 100))]
    state: String,
    #[validate(length(min = 1, max = 20))]
    postal_code: String,
    #[validate(length(min = 1, max = 100))]
    country: String,
    #[validate(length(max = 200))]
    landmark: Option<String>,
    #[serde(rename = "type")]
    kind: AddressKind,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct EditAddressRequest {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[validate(length(equal = 10, message = "phone number must have 10 digits"))]
    phone_no: Option<String>,
    #[validate(length(min = 1, max = 200))]
    address_line1: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    address_line2: Option<Option<String>>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    landmark: Option<Option<String>>,
    #[serde(rename = "type")]
    kind: Option<AddressKind>,
}

pub(super) async fn add_address(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    ValidatedJson(req): ValidatedJson<AddressRequest>,
) -> ApiResult<(StatusCode, Json<Address>)> {
    let new = NewAddress {
        name: req.name,
        phone_no: req.phone_no,
        address_line1: req.address_line1,
        address_line2: req.address_line2,
        city: req.city,
        state: req.state,
        postal_code: req.postal_code,
        country: req.country,
        landmark: req.landmark,
        kind: req.kind,
    };
    Ok((StatusCode::CREATED, Json(s.services.accounts.add_address(user_id, new).await?)))
}

pub(super) async fn edit_address(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(address_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EditAddressRequest>,
) -> ApiResult<Json<Address>> {
    let patch = AddressPatch {
        name: req.name,
        phone_no: req.phone_no,
        address_line1: req.address_line1,
        address_line2: req.address_line2,
        city: req.city,
        state: req.state,
        postal_code: req.postal_code,
        country: req.country,
        landmark: req.landmark,
        kind: req.kind,
    };
    Ok(Json(s.services.accounts.edit_address(user_id, address_id, patch).await?))
}

pub(super) async fn delete_address(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(address_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    s.services.accounts.delete_address(user_id, address_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_addresses(CurrentUser(user_id): CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Vec<Address>>> {
    Ok(Json(s.services.accounts.addresses(user_id).await?))
}

pub(super) async fn add_to_wishlist(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<WishlistEntry>)> {
    Ok((StatusCode::CREATED, Json(s.services.accounts.add_to_wishlist(user_id, product_id).await?)))
}

pub(super) async fn remove_from_wishlist(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    s.services.accounts.remove_from_wishlist(user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_wishlist(
    CurrentUser(user_id): CurrentUser,
    State(s): State<AppState>,
) -> ApiResult<Json<Vec<WishlistEntry>>> {
    Ok(Json(s.services.accounts.wishlist(user_id).await?))
}

pub(super) async fn get_wallet(CurrentUser(user_id): CurrentUser, State(s): State<AppState>) -> ApiResult<Json<WalletStatement>> {
    Ok(Json(s.services.wallet.get_wallet(user_id).await?))
}
