//! HTTP API.
//!
//! Shopper routes live under `/api/v1` and need a user token; catalog,
//! coupon, order administration and reports live under `/api/v1/admin` and
//! need an admin token.

use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Services;

pub mod auth;
mod account;
mod cart;
mod catalog;
mod coupons;
pub mod error;
pub mod extract;
mod orders;
mod reports;

pub use auth::{Authenticator, CurrentAdmin, CurrentUser, PgSessionAuthenticator};
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(services: Services, auth: Arc<dyn Authenticator>) -> Self { Self { services, auth } }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "kars" }))
}

pub fn router(state: AppState) -> Router {
    let shopper = Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/:product_id", get(catalog::get_product))
        .route("/cart", get(cart::list_cart))
        .route("/cart/:product_id", post(cart::add_to_cart).delete(cart::remove_from_cart))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/:order_id", get(orders::get_order))
        .route("/orders/:order_id/cancel", post(orders::cancel_order))
        .route("/orders/:order_id/return", post(orders::return_order))
        .route("/orders/:order_id/items/:product_id/cancel", post(orders::cancel_item))
        .route("/orders/:order_id/payment/confirm", post(orders::confirm_payment))
        .route("/orders/:order_id/payment/fail", post(orders::fail_payment))
        .route("/addresses", get(account::list_addresses).post(account::add_address))
        .route("/addresses/:address_id", patch(account::edit_address).delete(account::delete_address))
        .route("/wishlist", get(account::list_wishlist))
        .route("/wishlist/:product_id", post(account::add_to_wishlist).delete(account::remove_from_wishlist))
        .route("/wallet", get(account::get_wallet));

    let admin = Router::new()
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/categories/:category_id", patch(catalog::edit_category))
        .route("/categories/:category_id/listing", post(catalog::toggle_category_listing))
        .route("/products", get(catalog::all_products).post(catalog::create_product))
        .route("/products/:product_id", patch(catalog::edit_product))
        .route("/products/:product_id/listing", post(catalog::toggle_product_listing))
        .route("/coupons", post(coupons::create_coupon))
        .route("/coupons/:coupon_id", patch(coupons::edit_coupon).delete(coupons::delete_coupon))
        .route("/orders", get(orders::admin_list_orders))
        .route("/orders/:order_id", get(orders::admin_get_order))
        .route("/orders/:order_id/cancel", post(orders::admin_cancel_order))
        .route("/orders/:order_id/ship", post(orders::ship_order))
        .route("/orders/:order_id/deliver", post(orders::deliver_order))
        .route("/orders/:order_id/coupon", delete(coupons::remove_from_order))
        .route("/reports/sales", get(reports::sales_report))
        .route("/reports/top-selling", get(reports::top_selling));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", shopper.nest("/admin", admin))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
