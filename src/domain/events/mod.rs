//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::{EntryKind, PaymentMethod};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, final_price: Decimal, payment_method: PaymentMethod },
    OrderCancelled { order_id: Uuid, refunded: Decimal },
    OrderReturned { order_id: Uuid, refunded: Decimal },
    OrderItemCancelled { order_id: Uuid, product_id: Uuid, refunded: Decimal },
    OrderShipped { order_id: Uuid },
    OrderDelivered { order_id: Uuid },
    PaymentConfirmed { order_id: Uuid },
    PaymentFailed { order_id: Uuid },
    CouponRemoved { order_id: Uuid, coupon_code: String },
    WalletChanged { user_id: Uuid, kind: EntryKind, amount: Decimal, balance: Decimal },
}

impl DomainEvent {
    /// Dotted name used as the suffix of the publish subject.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order.placed",
            Self::OrderCancelled { .. } => "order.cancelled",
            Self::OrderReturned { .. } => "order.returned",
            Self::OrderItemCancelled { .. } => "order.item_cancelled",
            Self::OrderShipped { .. } => "order.shipped",
            Self::OrderDelivered { .. } => "order.delivered",
            Self::PaymentConfirmed { .. } => "payment.confirmed",
            Self::PaymentFailed { .. } => "payment.failed",
            Self::CouponRemoved { .. } => "order.coupon_removed",
            Self::WalletChanged { kind: EntryKind::Credit, .. } => "wallet.credited",
            Self::WalletChanged { kind: EntryKind::Debit, .. } => "wallet.debited",
        }
    }
}
