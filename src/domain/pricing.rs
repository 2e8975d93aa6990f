//! Pricing rules shared by the cart and the order workflow.
//!
//! ## Offer policy
//! A product can carry its own offer and inherit one from its category. The
//! offer that takes the larger *absolute amount* off the product's price wins;
//! on a tie the category offer is used. Comparing raw offer values is not
//! meaningful when one offer is a percentage and the other a fixed amount.
//!
//! If the winning offer would make the price zero or negative, the product is
//! sold at its undiscounted price.

use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::{round_money, Offer};

/// Orders with a subtotal strictly above this pay [`SHIPPING_FEE`].
pub const SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
/// Highest final price accepted for cash on delivery.
pub const CASH_ON_DELIVERY_LIMIT: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Which offer produced an effective price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferSource {
    None,
    Product,
    Category,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EffectivePrice {
    pub list_price: Decimal,
    pub price: Decimal,
    pub source: OfferSource,
}

pub fn effective_price(product: &Product, category: &Category) -> EffectivePrice {
    let list_price = product.price;
    let amount = |offer: Option<Offer>| offer.map(|o| o.discount_on(list_price)).unwrap_or(Decimal::ZERO);

    let product_cut = amount(product.offer);
    let category_cut = amount(category.offer);
    let (cut, source) = match (product_cut, category_cut) {
        (p, c) if p.is_zero() && c.is_zero() => (Decimal::ZERO, OfferSource::None),
        (p, c) if p > c => (p, OfferSource::Product),
        (_, c) => (c, OfferSource::Category),
    };

    let price = round_money(list_price - cut);
    if price <= Decimal::ZERO {
        return EffectivePrice { list_price, price: list_price, source: OfferSource::None };
    }
    EffectivePrice { list_price, price, source }
}

/// Money totals of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub final_price: Decimal,
}

impl OrderTotals {
    /// Totals for a new order; `discount` is clamped to the subtotal.
    pub fn compute(subtotal: Decimal, discount: Decimal) -> Self {
        let subtotal = round_money(subtotal);
        let discount = round_money(discount.min(subtotal).max(Decimal::ZERO));
        let shipping = shipping_for(subtotal);
        Self { subtotal, discount, shipping, final_price: subtotal + shipping - discount }
    }
}

pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal > SHIPPING_THRESHOLD { SHIPPING_FEE } else { Decimal::ZERO }
}
