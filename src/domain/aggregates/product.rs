//! Catalog Aggregates

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::Offer;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_listed: bool,
    pub offer: Option<Offer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, offer: Option<Offer>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), name: name.into(), is_listed: true, offer, created_at: now, updated_at: now }
    }

    pub fn toggle_listing(&mut self) { self.is_listed = !self.is_listed; self.touch(); }
    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: Uuid,
    pub color: Option<String>,
    pub image_urls: Vec<String>,
    pub status: Option<String>,
    pub offer: Option<Offer>,
    pub is_listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a product; the catalog service validates them.
#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: Uuid,
    pub color: Option<String>,
    pub image_urls: Vec<String>,
    pub status: Option<String>,
    pub offer: Option<Offer>,
}

impl Product {
    pub fn create(new: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: new.name, description: new.description, price: new.price,
            quantity: new.quantity, category_id: new.category_id, color: new.color,
            image_urls: new.image_urls, status: new.status, offer: new.offer, is_listed: true,
            created_at: now, updated_at: now,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.quantity > 0 }

    pub fn add_inventory(&mut self, qty: i32) {
        self.quantity = self.quantity.saturating_add(qty);
        self.touch();
    }

    pub fn remove_inventory(&mut self, qty: i32) -> Result<(), ProductError> {
        if qty > self.quantity {
            return Err(ProductError::InsufficientInventory { product: self.name.clone() });
        }
        self.quantity -= qty;
        self.touch();
        Ok(())
    }

    pub fn toggle_listing(&mut self) { self.is_listed = !self.is_listed; self.touch(); }
    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("Not enough stock for product {product}")]
    InsufficientInventory { product: String },
}
