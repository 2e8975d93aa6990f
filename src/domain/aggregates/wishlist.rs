//! Wishlist entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::Product;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_description: String,
    pub product_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl WishlistEntry {
    /// Snapshot `product` at `price` for the user's wishlist.
    pub fn of(user_id: Uuid, product: &Product, price: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(), user_id, product_id: product.id, product_name: product.name.clone(),
            product_description: product.description.clone(), product_price: price, created_at: Utc::now(),
        }
    }
}
