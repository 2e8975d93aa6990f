use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::extract::{double_option, ValidatedJson};
use crate::api::{ApiResult, AppState, CurrentAdmin, CurrentUser};
use crate::domain::aggregates::{Category, NewProduct, Product};
use crate::domain::value_objects::{DiscountKind, Offer, OfferError};
use crate::services::catalog::{CategoryPatch, ProductListing, ProductPatch};
use crate::EcommerceError;

/// Both halves of an offer, or neither.
fn offer_input(kind: Option<DiscountKind>, value: Option<Decimal>) -> Result<Option<Offer>, OfferError> {
    match (kind, value) {
        (None, None) => Ok(None),
        (Some(kind), Some(value)) => Offer::new(kind, value).map(Some),
        _ => Err(OfferError::Incomplete),
    }
}

/// Absent fields keep the offer, a `null` half clears it.
fn offer_patch(
    kind: Option<Option<DiscountKind>>,
    value: Option<Option<Decimal>>,
) -> Result<Option<Option<Offer>>, OfferError> {
    match (kind, value) {
        (None, None) => Ok(None),
        (Some(None), _) | (_, Some(None)) => Ok(Some(None)),
        (Some(Some(kind)), Some(Some(value))) => Offer::new(kind, value).map(|o| Some(Some(o))),
        _ => Err(OfferError::Incomplete),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "category name is required"))]
    name: String,
    offer_type: Option<DiscountKind>,
    offer_value: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct EditCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    offer_type: Option<Option<DiscountKind>>,
    #[serde(default, deserialize_with = "double_option")]
    offer_value: Option<Option<Decimal>>,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "product name is required"))]
    name: String,
    #[serde(default)]
    description: String,
    price: Decimal,
    #[validate(range(min = 0, message = "quantity cannot be negative"))]
    quantity: i32,
    category_id: Uuid,
    color: Option<String>,
    #[serde(default)]
    image_urls: Vec<String>,
    status: Option<String>,
    offer_type: Option<DiscountKind>,
    offer_value: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct EditProductRequest {
    #[validate(length(min = 1, max = 200))]
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    #[validate(range(min = 0, message = "quantity cannot be negative"))]
    quantity: Option<i32>,
    category_id: Option<Uuid>,
    #[serde(default, deserialize_with = "double_option")]
    color: Option<Option<String>>,
    image_urls: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    offer_type: Option<Option<DiscountKind>>,
    #[serde(default, deserialize_with = "double_option")]
    offer_value: Option<Option<Decimal>>,
}

pub(super) async fn list_products(_: CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Vec<ProductListing>>> {
    Ok(Json(s.services.catalog.list_products().await?))
}

pub(super) async fn get_product(
    _: CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<ProductListing>> {
    Ok(Json(s.services.catalog.product(product_id).await?))
}

pub(super) async fn list_categories(_: CurrentAdmin, State(s): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(s.services.catalog.categories().await?))
}

pub(super) async fn create_category(
    _: CurrentAdmin,
    State(s): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let offer = offer_input(req.offer_type, req.offer_value).map_err(EcommerceError::from)?;
    let category = s.services.catalog.create_category(&req.name, offer).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub(super) async fn edit_category(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(category_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EditCategoryRequest>,
) -> ApiResult<Json<Category>> {
    let patch = CategoryPatch {
        name: req.name,
        offer: offer_patch(req.offer_type, req.offer_value).map_err(EcommerceError::from)?,
    };
    Ok(Json(s.services.catalog.edit_category(category_id, patch).await?))
}

pub(super) async fn toggle_category_listing(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    Ok(Json(s.services.catalog.toggle_category_listing(category_id).await?))
}

pub(super) async fn all_products(_: CurrentAdmin, State(s): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(s.services.catalog.all_products().await?))
}

pub(super) async fn create_product(
    _: CurrentAdmin,
    State(s): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let offer = offer_input(req.offer_type, req.offer_value).map_err(EcommerceError::from)?;
    let product = s
        .services
        .catalog
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            price: req.price,
            quantity: req.quantity,
            category_id: req.category_id,
            color: req.color,
            image_urls: req.image_urls,
            status: req.status,
            offer,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub(super) async fn edit_product(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EditProductRequest>,
) -> ApiResult<Json<Product>> {
    let patch = ProductPatch {
        name: req.name,
        description: req.description,
        price: req.price,
        quantity: req.quantity,
        category_id: req.category_id,
        color: req.color,
        image_urls: req.image_urls,
        status: req.status,
        offer: offer_patch(req.offer_type, req.offer_value).map_err(EcommerceError::from)?,
    };
    Ok(Json(s.services.catalog.edit_product(product_id, patch).await?))
}

pub(super) async fn toggle_product_listing(
    _: CurrentAdmin,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.catalog.toggle_product_listing(product_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_needs_both_halves() {
        assert_eq!(offer_input(None, None), Ok(None));
        assert_eq!(offer_input(Some(DiscountKind::Fixed), None), Err(OfferError::Incomplete));
        assert_eq!(
            offer_input(Some(DiscountKind::Percentage), Some(Decimal::new(101, 0))),
            Err(OfferError::PercentageAbove100)
        );
    }

    #[test]
    fn test_offer_patch() {
        assert_eq!(offer_patch(None, None), Ok(None));
        assert_eq!(offer_patch(Some(None), None), Ok(Some(None)));
        assert_eq!(offer_patch(None, Some(Some(Decimal::TEN))), Err(OfferError::Incomplete));

        let set = offer_patch(Some(Some(DiscountKind::Fixed)), Some(Some(Decimal::TEN))).unwrap();
        assert_eq!(set.flatten().map(|o| o.value()), Some(Decimal::TEN));
    }
}
