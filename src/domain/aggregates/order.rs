//! Order Aggregate
//!
//! Status lifecycle: `pending -> placed -> shipped -> delivered`, with
//! `cancelled` reachable from `pending`/`placed` and `returned` only from
//! `delivered`. Payment moves `pending -> paid|failed`, and `paid -> returned`
//! on cancel or return.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, Coupon};
use crate::domain::events::DomainEvent;
use crate::domain::pricing::{OrderTotals, CASH_ON_DELIVERY_LIMIT};
use crate::domain::value_objects::round_money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "cash on delivery")]
    CashOnDelivery,
    #[serde(rename = "online payment")]
    OnlinePayment,
    #[serde(rename = "wallet")]
    Wallet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { Pending, Placed, Shipped, Delivered, Cancelled, Returned }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { Pending, Paid, Failed, Returned }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState { Ordered, Cancelled }

macro_rules! string_enum {
    ($ty:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $text),+ }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $ty {
            type Err = OrderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(OrderError::UnknownValue { field: $label, value: other.to_string() }),
                }
            }
        }
    };
}

string_enum!(PaymentMethod, "payment method" { CashOnDelivery => "cash on delivery", OnlinePayment => "online payment", Wallet => "wallet" });
string_enum!(OrderStatus, "order status" {
    Pending => "pending", Placed => "placed", Shipped => "shipped",
    Delivered => "delivered", Cancelled => "cancelled", Returned => "returned",
});
string_enum!(PaymentStatus, "payment status" { Pending => "pending", Paid => "paid", Failed => "failed", Returned => "returned" });
string_enum!(ItemState, "item state" { Ordered => "ordered", Cancelled => "cancelled" });

/// Postal address copied into the order at placement time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrderAddress {
    pub name: String,
    pub phone_no: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub landmark: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
    pub state: ItemState,
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub final_price: Decimal,
    pub address: OrderAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub coupon_code: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Stock and money to give back after a cancellation or return.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compensation {
    pub restock: Vec<(Uuid, i32)>,
    pub refund: Decimal,
    /// Coupon code whose usage should be released for the order's user.
    pub released_coupon: Option<String>,
}

impl Order {
    /// Turn the cart into an order. Stock, wallet and coupon usage are the
    /// caller's business; this only decides statuses and snapshots lines.
    pub fn place(
        user_id: Uuid,
        address: OrderAddress,
        cart: &Cart,
        totals: OrderTotals,
        payment_method: PaymentMethod,
        coupon_code: Option<String>,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::EmptyCart); }

        let (status, payment_status) = match payment_method {
            PaymentMethod::CashOnDelivery if totals.final_price > CASH_ON_DELIVERY_LIMIT => {
                return Err(OrderError::CashOnDeliveryLimit);
            }
            PaymentMethod::CashOnDelivery => (OrderStatus::Placed, PaymentStatus::Pending),
            PaymentMethod::OnlinePayment => (OrderStatus::Pending, PaymentStatus::Pending),
            PaymentMethod::Wallet => (OrderStatus::Placed, PaymentStatus::Paid),
        };

        let id = Uuid::now_v7();
        let now = Utc::now();
        let items = cart.items.iter().map(|line| OrderItem {
            id: Uuid::now_v7(), order_id: id, product_id: line.product_id,
            product_name: line.product_name.clone(), product_price: line.product_price,
            quantity: line.quantity, total_price: line.total_price, state: ItemState::Ordered,
        }).collect();

        let mut order = Self {
            id, user_id, subtotal: totals.subtotal, discount: totals.discount, shipping: totals.shipping,
            final_price: totals.final_price, address, payment_method, payment_status, status,
            coupon_code, items, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::OrderPlaced {
            order_id: id, user_id, final_price: order.final_price, payment_method,
        });
        Ok(order)
    }

    /// Rebuild an order loaded from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid, user_id: Uuid, totals: OrderTotals, address: OrderAddress,
        payment_method: PaymentMethod, payment_status: PaymentStatus, status: OrderStatus,
        coupon_code: Option<String>, items: Vec<OrderItem>,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, user_id, subtotal: totals.subtotal, discount: totals.discount, shipping: totals.shipping,
            final_price: totals.final_price, address, payment_method, payment_status, status,
            coupon_code, items, created_at, updated_at, events: vec![],
        }
    }

    pub fn is_paid(&self) -> bool { self.payment_status == PaymentStatus::Paid }

    pub fn cancel(&mut self) -> Result<Compensation, OrderError> {
        self.ensure_cancellable()?;

        let restock = self.items.iter_mut()
            .filter(|i| i.state == ItemState::Ordered)
            .map(|i| { i.state = ItemState::Cancelled; (i.product_id, i.quantity) })
            .collect();
        let refund = if self.is_paid() { self.final_price } else { Decimal::ZERO };

        self.status = OrderStatus::Cancelled;
        self.payment_status = PaymentStatus::Returned;
        self.touch();
        self.raise_event(DomainEvent::OrderCancelled { order_id: self.id, refunded: refund });
        Ok(Compensation { restock, refund, released_coupon: None })
    }

    pub fn return_order(&mut self) -> Result<Compensation, OrderError> {
        match self.status {
            OrderStatus::Cancelled => return Err(OrderError::AlreadyCancelled),
            OrderStatus::Returned => return Err(OrderError::AlreadyReturned),
            OrderStatus::Shipped => return Err(OrderError::NotReturnable),
            OrderStatus::Pending | OrderStatus::Placed => return Err(OrderError::MustCancel),
            OrderStatus::Delivered => {}
        }

        let refund = if self.is_paid() { self.final_price } else { Decimal::ZERO };
        self.status = OrderStatus::Returned;
        self.payment_status = PaymentStatus::Returned;
        self.touch();
        self.raise_event(DomainEvent::OrderReturned { order_id: self.id, refunded: refund });
        Ok(Compensation { restock: vec![], refund, released_coupon: None })
    }

    /// Cancel the line for `product_id`.
    ///
    /// The subtotal drops by the line total and shipping is waived. An applied
    /// coupon is re-evaluated against the new subtotal: below its minimum (or
    /// when the coupon no longer exists) it is stripped and its usage
    /// released, otherwise its discount is recomputed. A paid order is
    /// refunded the difference in final price. Cancelling the last open line
    /// cancels the order.
    pub fn cancel_item(&mut self, product_id: Uuid, coupon: Option<&Coupon>) -> Result<Compensation, OrderError> {
        self.ensure_cancellable()?;

        let line = self.items.iter_mut()
            .filter(|i| i.product_id == product_id)
            .min_by_key(|i| i.state == ItemState::Cancelled)
            .ok_or(OrderError::ItemNotFound)?;
        if line.state == ItemState::Cancelled { return Err(OrderError::ItemAlreadyCancelled); }
        line.state = ItemState::Cancelled;
        let (line_total, quantity) = (line.total_price, line.quantity);

        let previous_final = self.final_price;
        let subtotal = round_money((self.subtotal - line_total).max(Decimal::ZERO));

        let mut released_coupon = None;
        let discount = match (self.coupon_code.take(), coupon) {
            (Some(code), Some(c)) if c.code == code && subtotal >= c.minimum_amount => {
                self.coupon_code = Some(code);
                c.discount_for(subtotal)
            }
            (Some(code), _) => { released_coupon = Some(code); Decimal::ZERO }
            (None, _) => Decimal::ZERO,
        };

        self.subtotal = subtotal;
        self.discount = discount;
        self.shipping = Decimal::ZERO;
        self.final_price = subtotal - discount;

        let refund = if self.is_paid() {
            (previous_final - self.final_price).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        if self.items.iter().all(|i| i.state == ItemState::Cancelled) {
            self.status = OrderStatus::Cancelled;
            self.payment_status = PaymentStatus::Returned;
        }
        self.touch();
        self.raise_event(DomainEvent::OrderItemCancelled { order_id: self.id, product_id, refunded: refund });
        Ok(Compensation { restock: vec![(product_id, quantity)], refund, released_coupon })
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Placed => {}
            OrderStatus::Cancelled => return Err(OrderError::AlreadyCancelled),
            OrderStatus::Shipped => return Err(OrderError::AlreadyShipped),
            from => return Err(OrderError::InvalidTransition { from, to: OrderStatus::Shipped }),
        }
        self.status = OrderStatus::Shipped;
        self.touch();
        self.raise_event(DomainEvent::OrderShipped { order_id: self.id });
        Ok(())
    }

    /// A cash-on-delivery order is paid when it is delivered.
    pub fn deliver(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Shipped {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Delivered });
        }
        self.status = OrderStatus::Delivered;
        if self.payment_method == PaymentMethod::CashOnDelivery && self.payment_status == PaymentStatus::Pending {
            self.payment_status = PaymentStatus::Paid;
        }
        self.touch();
        self.raise_event(DomainEvent::OrderDelivered { order_id: self.id });
        Ok(())
    }

    pub fn confirm_payment(&mut self) -> Result<(), OrderError> {
        self.ensure_awaiting_online_payment()?;
        self.status = OrderStatus::Placed;
        self.payment_status = PaymentStatus::Paid;
        self.touch();
        self.raise_event(DomainEvent::PaymentConfirmed { order_id: self.id });
        Ok(())
    }

    pub fn fail_payment(&mut self) -> Result<(), OrderError> {
        self.ensure_awaiting_online_payment()?;
        self.payment_status = PaymentStatus::Failed;
        self.touch();
        self.raise_event(DomainEvent::PaymentFailed { order_id: self.id });
        Ok(())
    }

    /// Drop the applied coupon and charge the full price again.
    /// Returns the code whose usage should be released.
    pub fn remove_coupon(&mut self) -> Result<String, OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Placed) || self.is_paid() {
            return Err(OrderError::CouponLocked);
        }
        let code = self.coupon_code.take().ok_or(OrderError::NoCoupon)?;
        self.final_price += self.discount;
        self.discount = Decimal::ZERO;
        self.touch();
        self.raise_event(DomainEvent::CouponRemoved { order_id: self.id, coupon_code: code.clone() });
        Ok(code)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn ensure_cancellable(&self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Placed => Ok(()),
            OrderStatus::Cancelled => Err(OrderError::AlreadyCancelled),
            OrderStatus::Shipped => Err(OrderError::AlreadyShipped),
            from => Err(OrderError::InvalidTransition { from, to: OrderStatus::Cancelled }),
        }
    }

    fn ensure_awaiting_online_payment(&self) -> Result<(), OrderError> {
        if self.payment_method != PaymentMethod::OnlinePayment { return Err(OrderError::NotOnlinePayment); }
        if self.status != OrderStatus::Pending || !matches!(self.payment_status, PaymentStatus::Pending | PaymentStatus::Failed) {
            return Err(OrderError::PaymentNotPending);
        }
        Ok(())
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("cash on delivery is not allowed for orders with a final price greater than 1000")]
    CashOnDeliveryLimit,
    #[error("order already cancelled")]
    AlreadyCancelled,
    #[error("order already shipped")]
    AlreadyShipped,
    #[error("order already returned")]
    AlreadyReturned,
    #[error("order not returnable")]
    NotReturnable,
    #[error("order is not delivered yet, cancel it instead")]
    MustCancel,
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order item not found")]
    ItemNotFound,
    #[error("order item already cancelled")]
    ItemAlreadyCancelled,
    #[error("order was not placed with online payment")]
    NotOnlinePayment,
    #[error("order is not awaiting payment")]
    PaymentNotPending,
    #[error("order has no coupon applied")]
    NoCoupon,
    #[error("coupon can only be removed from unpaid pending or placed orders")]
    CouponLocked,
    #[error("invalid {field}: '{value}'")]
    UnknownValue { field: &'static str, value: String },
}
