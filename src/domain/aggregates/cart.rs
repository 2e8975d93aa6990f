//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::round_money;

/// Upper bound on the quantity of a single cart line.
pub const MAX_UNITS_PER_LINE: i32 = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_items: i32,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, total_items: 0, items: vec![], created_at: now, updated_at: now }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn subtotal(&self) -> Decimal {
        round_money(self.items.iter().map(|i| i.total_price).sum())
    }

    pub fn item(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Add one unit of `product` priced at `unit_price`.
    ///
    /// An existing line is incremented and re-priced; otherwise a new line is
    /// opened at quantity 1. A line never exceeds [`MAX_UNITS_PER_LINE`] or the
    /// product's current stock.
    pub fn add_product(&mut self, product: &Product, unit_price: Decimal) -> Result<&CartItem, CartError> {
        if !product.is_in_stock() {
            return Err(CartError::OutOfStock { product: product.name.clone() });
        }

        let index = match self.items.iter().position(|i| i.product_id == product.id) {
            Some(index) => {
                let line = &mut self.items[index];
                let quantity = line.quantity + 1;
                if quantity > MAX_UNITS_PER_LINE {
                    return Err(CartError::LimitExceeded(format!(
                        "cannot add more than {MAX_UNITS_PER_LINE} units of {}", product.name
                    )));
                }
                if quantity > product.quantity {
                    return Err(CartError::LimitExceeded(format!(
                        "only {} units of {} in stock", product.quantity, product.name
                    )));
                }
                line.quantity = quantity;
                line.product_name = product.name.clone();
                line.product_price = unit_price;
                line.total_price = round_money(unit_price * Decimal::from(quantity));
                index
            }
            None => {
                self.items.push(CartItem {
                    id: Uuid::now_v7(), cart_id: self.id, product_id: product.id,
                    product_name: product.name.clone(), product_price: unit_price,
                    quantity: 1, total_price: unit_price,
                });
                self.items.len() - 1
            }
        };

        self.recount();
        Ok(&self.items[index])
    }

    pub fn remove_product(&mut self, product_id: Uuid) -> Result<CartItem, CartError> {
        let index = self.items.iter().position(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        let removed = self.items.remove(index);
        self.recount();
        Ok(removed)
    }

    fn recount(&mut self) {
        self.total_items = i32::try_from(self.items.len()).unwrap_or(i32::MAX);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("{product} is out of stock")]
    OutOfStock { product: String },
    #[error("{0}")]
    LimitExceeded(String),
    #[error("product not found in cart")]
    ItemNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewProduct;

    fn product(stock: i32) -> Product {
        Product::create(NewProduct {
            name: "Canvas Tote".into(), price: Decimal::new(250, 0), quantity: stock,
            category_id: Uuid::now_v7(), ..Default::default()
        })
    }

    #[test]
    fn test_add_new_and_increment() {
        let p = product(10);
        let mut cart = Cart::for_user(Uuid::now_v7());
        cart.add_product(&p, Decimal::new(200, 0)).unwrap();
        let line = cart.add_product(&p, Decimal::new(225, 0)).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.total_price, Decimal::new(450, 0));
        assert_eq!(cart.total_items, 1);
        assert_eq!(cart.subtotal(), Decimal::new(450, 0));
    }

    #[test]
    fn test_sixth_unit_is_rejected() {
        let p = product(100);
        let mut cart = Cart::for_user(Uuid::now_v7());
        for _ in 0..MAX_UNITS_PER_LINE {
            cart.add_product(&p, p.price).unwrap();
        }
        let err = cart.add_product(&p, p.price).unwrap_err();
        assert!(matches!(err, CartError::LimitExceeded(_)));
        assert_eq!(cart.item(p.id).unwrap().quantity, MAX_UNITS_PER_LINE);
    }

    #[test]
    fn test_stock_caps_quantity() {
        let p = product(2);
        let mut cart = Cart::for_user(Uuid::now_v7());
        cart.add_product(&p, p.price).unwrap();
        cart.add_product(&p, p.price).unwrap();
        assert!(matches!(cart.add_product(&p, p.price), Err(CartError::LimitExceeded(_))));
    }

    #[test]
    fn test_out_of_stock() {
        let p = product(0);
        let mut cart = Cart::for_user(Uuid::now_v7());
        assert_eq!(cart.add_product(&p, p.price).unwrap_err(), CartError::OutOfStock { product: "Canvas Tote".into() });
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_items_tracks_lines() {
        let (a, b) = (product(5), product(5));
        let mut cart = Cart::for_user(Uuid::now_v7());
        cart.add_product(&a, a.price).unwrap();
        cart.add_product(&b, b.price).unwrap();
        cart.add_product(&a, a.price).unwrap();
        assert_eq!(cart.total_items, 2);
        cart.remove_product(a.id).unwrap();
        assert_eq!(cart.total_items, 1);
        assert_eq!(cart.remove_product(a.id), Err(CartError::ItemNotFound));
        assert_eq!(cart.total_items as usize, cart.items.len());
    }
}
