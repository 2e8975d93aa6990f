//! Order workflow.
//!
//! Placing an order, cancelling it (whole or one line) and returning it each
//! touch the cart, product stock, coupon usage and the wallet. All of it
//! happens in one unit of work: stock and wallet rows are locked while the
//! workflow runs and nothing is written unless every step succeeds.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Compensation, CouponUsage, Order, PaymentMethod};
use crate::domain::events::DomainEvent;
use crate::domain::pricing::OrderTotals;
use crate::services::coupons::release_usage;
use crate::services::{wallet, EventBus};
use crate::store::{Store, StoreTx};
use crate::{EcommerceError, Result};

/// Who is acting on an order. Users only see their own orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    Admin,
}

impl Actor {
    fn may_access(&self, order: &Order) -> bool {
        match self {
            Self::User(user_id) => order.user_id == *user_id,
            Self::Admin => true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub address_id: Uuid,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    events: EventBus,
}

async fn locked_order(tx: &mut dyn StoreTx, actor: Actor, order_id: Uuid) -> Result<Order> {
    tx.order_for_update(order_id)
        .await?
        .filter(|o| actor.may_access(o))
        .ok_or_else(|| EcommerceError::not_found("order"))
}

/// Put stock back, refund the wallet and release the coupon as the
/// compensation asks. Returns the wallet's events.
async fn compensate(tx: &mut dyn StoreTx, order: &Order, comp: Compensation, reason: &str) -> Result<Vec<DomainEvent>> {
    for (product_id, quantity) in comp.restock {
        match tx.product_for_update(product_id).await? {
            Some(mut product) => {
                product.add_inventory(quantity);
                tx.save_product(&product).await?;
            }
            None => warn!(order_id = %order.id, %product_id, "cannot restock missing product"),
        }
    }

    if let Some(code) = comp.released_coupon {
        release_usage(tx, order.user_id, &code).await?;
    }

    if comp.refund > Decimal::ZERO {
        let mut refunded = wallet::credit(tx, order.user_id, comp.refund, reason).await?;
        info!(order_id = %order.id, user_id = %order.user_id, refund = %comp.refund, "refunded to wallet");
        return Ok(refunded.take_events());
    }
    Ok(vec![])
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self { Self { store, events } }

    /// Turn the user's cart into an order.
    pub async fn place_order(&self, user_id: Uuid, request: PlaceOrder) -> Result<Order> {
        let mut tx = self.store.begin().await?;

        let address = tx
            .address(request.address_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| EcommerceError::not_found("address"))?;
        let cart = tx.cart_for_update(user_id).await?.ok_or_else(|| EcommerceError::not_found("cart"))?;
        let subtotal = cart.subtotal();

        let coupon_code = request.coupon_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let mut usage: Option<CouponUsage> = None;
        let mut discount = Decimal::ZERO;
        if let Some(code) = &coupon_code {
            let coupon = tx.coupon_by_code(code).await?.ok_or_else(|| EcommerceError::not_found("coupon"))?;
            let mut used = match tx.coupon_usage_for_update(user_id, code).await? {
                Some(used) => used,
                None => CouponUsage::new(user_id, code.as_str()),
            };
            coupon.check_redeemable(Utc::now(), used.times_used, subtotal)?;
            discount = coupon.discount_for(subtotal);
            used.record_use();
            usage = Some(used);
        }

        let totals = OrderTotals::compute(subtotal, discount);
        let mut order = Order::place(user_id, address.snapshot(), &cart, totals, request.payment_method, coupon_code)?;
        // A fully discounted order has nothing to debit.
        let wallet_events = if order.payment_method == PaymentMethod::Wallet && order.final_price > Decimal::ZERO {
            let reason = format!("payment for order {}", order.id);
            wallet::debit(&mut *tx, user_id, order.final_price, &reason).await?.take_events()
        } else {
            vec![]
        };

        for item in &order.items {
            let mut product = tx
                .product_for_update(item.product_id)
                .await?
                .ok_or_else(|| EcommerceError::not_found("product"))?;
            product.remove_inventory(item.quantity)?;
            tx.save_product(&product).await?;
        }

        tx.save_order(&order).await?;
        tx.delete_cart(cart.id).await?;
        if let Some(usage) = &usage {
            tx.save_coupon_usage(usage).await?;
        }
        tx.commit().await?;

        info!(
            order_id = %order.id, %user_id, final_price = %order.final_price,
            payment_method = ?order.payment_method, "order placed"
        );
        self.publish(&mut order, wallet_events).await;
        Ok(order)
    }

    pub async fn cancel_order(&self, actor: Actor, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = locked_order(&mut *tx, actor, order_id).await?;
        let comp = order.cancel()?;
        let wallet_events = compensate(&mut *tx, &order, comp, &format!("refund for cancelled order {order_id}")).await?;
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(%order_id, ?actor, "order cancelled");
        self.publish(&mut order, wallet_events).await;
        Ok(order)
    }

    /// Return a delivered order; the amount paid goes to the wallet.
    pub async fn return_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = locked_order(&mut *tx, Actor::User(user_id), order_id).await?;
        let comp = order.return_order()?;
        let wallet_events = compensate(&mut *tx, &order, comp, &format!("refund for returned order {order_id}")).await?;
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(%order_id, %user_id, "order returned");
        self.publish(&mut order, wallet_events).await;
        Ok(order)
    }

    /// Cancel a single line of an order.
    pub async fn cancel_item(&self, user_id: Uuid, order_id: Uuid, product_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = locked_order(&mut *tx, Actor::User(user_id), order_id).await?;
        let coupon = match &order.coupon_code {
            Some(code) => tx.coupon_by_code(code).await?,
            None => None,
        };
        let comp = order.cancel_item(product_id, coupon.as_ref())?;
        let reason = format!("refund for cancelled item of order {order_id}");
        let wallet_events = compensate(&mut *tx, &order, comp, &reason).await?;
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(%order_id, %product_id, final_price = %order.final_price, "order item cancelled");
        self.publish(&mut order, wallet_events).await;
        Ok(order)
    }

    pub async fn ship(&self, order_id: Uuid) -> Result<Order> {
        self.transition(Actor::Admin, order_id, Order::ship).await
    }

    pub async fn deliver(&self, order_id: Uuid) -> Result<Order> {
        self.transition(Actor::Admin, order_id, Order::deliver).await
    }

    /// Record a captured online payment. Stock was reserved at placement.
    pub async fn confirm_payment(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.transition(Actor::User(user_id), order_id, Order::confirm_payment).await
    }

    pub async fn fail_payment(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.transition(Actor::User(user_id), order_id, Order::fail_payment).await
    }

    pub async fn order(&self, actor: Actor, order_id: Uuid) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        tx.order(order_id)
            .await?
            .filter(|o| actor.may_access(o))
            .ok_or_else(|| EcommerceError::not_found("order"))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.orders_for_user(user_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.all_orders().await?)
    }

    async fn transition<F, E>(&self, actor: Actor, order_id: Uuid, step: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), E>,
        EcommerceError: From<E>,
    {
        let mut tx = self.store.begin().await?;
        let mut order = locked_order(&mut *tx, actor, order_id).await?;
        step(&mut order)?;
        tx.save_order(&order).await?;
        tx.commit().await?;

        info!(%order_id, status = %order.status, payment_status = %order.payment_status, "order updated");
        self.publish(&mut order, vec![]).await;
        Ok(order)
    }

    async fn publish(&self, order: &mut Order, extra: Vec<DomainEvent>) {
        let mut events = order.take_events();
        events.extend(extra);
        self.events.publish_all(events).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{
        Address, AddressKind, Cart, Category, ItemState, NewProduct, OrderStatus, PaymentStatus, Product, User,
    };
    use crate::store::MemoryStore;

    fn dec(v: i64) -> Decimal { Decimal::new(v, 0) }

    struct Shop {
        store: Arc<MemoryStore>,
        orders: OrderService,
        user: User,
        address: Address,
    }

    async fn shop() -> Shop {
        let store = Arc::new(MemoryStore::new());
        let user = User::register("ravi", "ravi@example.com");
        store.insert_user(user.clone()).await;
        let now = Utc::now();
        let address = Address {
            id: Uuid::now_v7(), user_id: user.id, name: "Ravi".into(), phone_no: "9876543210".into(),
            address_line1: "12 Hill Road".into(), address_line2: None, city: "Kochi".into(),
            state: "Kerala".into(), postal_code: "682001".into(), country: "India".into(), landmark: None,
            kind: AddressKind::Shipping, created_at: now, updated_at: now,
        };
        let mut tx = store.begin().await.unwrap();
        tx.save_address(&address).await.unwrap();
        tx.commit().await.unwrap();

        let orders = OrderService::new(store.clone(), EventBus::default());
        Shop { store, orders, user, address }
    }

    impl Shop {
        /// Stock a product at `price` and put `units` of it in the cart.
        async fn cart_line(&self, name: &str, price: i64, stock: i32, units: i32) -> Product {
            let category = Category::create(format!("{name} category"), None);
            let product = Product::create(NewProduct {
                name: name.into(), price: dec(price), quantity: stock, category_id: category.id,
                ..Default::default()
            });
            let mut tx = self.store.begin().await.unwrap();
            tx.save_category(&category).await.unwrap();
            tx.save_product(&product).await.unwrap();
            let mut cart = tx.cart_for_update(self.user.id).await.unwrap().unwrap_or_else(|| Cart::for_user(self.user.id));
            for _ in 0..units {
                cart.add_product(&product, product.price).unwrap();
            }
            tx.save_cart(&cart).await.unwrap();
            tx.commit().await.unwrap();
            product
        }

        async fn stock(&self, product_id: Uuid) -> i32 {
            let mut tx = self.store.begin().await.unwrap();
            tx.product(product_id).await.unwrap().unwrap().quantity
        }

        fn request(&self, method: PaymentMethod) -> PlaceOrder {
            PlaceOrder { address_id: self.address.id, coupon_code: None, payment_method: method }
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock_and_clears_cart() {
        let shop = shop().await;
        let product = shop.cart_line("Teapot", 300, 5, 2).await;

        let order = shop.orders.place_order(shop.user.id, shop.request(PaymentMethod::CashOnDelivery)).await.unwrap();
        assert_eq!(order.subtotal, dec(600));
        assert_eq!(order.shipping, dec(30));
        assert_eq!(order.final_price, dec(630));
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.address.city, "Kochi");
        assert_eq!(shop.stock(product.id).await, 3);

        let mut tx = shop.store.begin().await.unwrap();
        assert!(tx.cart_for_update(shop.user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_rolls_back_when_stock_ran_out() {
        let shop = shop().await;
        let first = shop.cart_line("Teapot", 100, 5, 1).await;
        let second = shop.cart_line("Cups", 50, 2, 2).await;

        let mut tx = shop.store.begin().await.unwrap();
        let mut cups = tx.product(second.id).await.unwrap().unwrap();
        cups.remove_inventory(1).unwrap();
        tx.save_product(&cups).await.unwrap();
        tx.commit().await.unwrap();

        let err = shop.orders.place_order(shop.user.id, shop.request(PaymentMethod::CashOnDelivery)).await.unwrap_err();
        assert!(matches!(err, EcommerceError::OutOfStock(_)));
        assert_eq!(shop.stock(first.id).await, 5);
        assert!(shop.orders.list_for_user(shop.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_address_of_another_user_is_not_found() {
        let shop = shop().await;
        shop.cart_line("Teapot", 100, 5, 1).await;
        let err = shop.orders.place_order(Uuid::now_v7(), shop.request(PaymentMethod::CashOnDelivery)).await.unwrap_err();
        assert_eq!(err.to_string(), "address not found");
    }

    #[tokio::test]
    async fn test_cancel_paid_order_refunds_wallet_once() {
        let shop = shop().await;
        let product = shop.cart_line("Teapot", 200, 5, 1).await;
        let mut tx = shop.store.begin().await.unwrap();
        wallet::credit(&mut *tx, shop.user.id, dec(500), "top up").await.unwrap();
        tx.commit().await.unwrap();

        let order = shop.orders.place_order(shop.user.id, shop.request(PaymentMethod::Wallet)).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);

        let cancelled = shop.orders.cancel_order(Actor::User(shop.user.id), order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Returned);
        assert!(cancelled.items.iter().all(|i| i.state == ItemState::Cancelled));
        assert_eq!(shop.stock(product.id).await, 5);

        let err = shop.orders.cancel_order(Actor::Admin, order.id).await.unwrap_err();
        assert_eq!(err.to_string(), "order already cancelled");

        let mut tx = shop.store.begin().await.unwrap();
        assert_eq!(tx.wallet_for_update(shop.user.id).await.unwrap().unwrap().balance, dec(500));
    }

    #[tokio::test]
    async fn test_other_users_cannot_touch_order() {
        let shop = shop().await;
        shop.cart_line("Teapot", 200, 5, 1).await;
        let order = shop.orders.place_order(shop.user.id, shop.request(PaymentMethod::CashOnDelivery)).await.unwrap();

        let err = shop.orders.cancel_order(Actor::User(Uuid::now_v7()), order.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_return_requires_delivery() {
        let shop = shop().await;
        shop.cart_line("Teapot", 200, 5, 1).await;
        let order = shop.orders.place_order(shop.user.id, shop.request(PaymentMethod::CashOnDelivery)).await.unwrap();

        let err = shop.orders.return_order(shop.user.id, order.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidTransition(_)));

        shop.orders.ship(order.id).await.unwrap();
        let delivered = shop.orders.deliver(order.id).await.unwrap();
        assert_eq!(delivered.payment_status, PaymentStatus::Paid);

        let returned = shop.orders.return_order(shop.user.id, order.id).await.unwrap();
        assert_eq!(returned.status, OrderStatus::Returned);
        let mut tx = shop.store.begin().await.unwrap();
        assert_eq!(tx.wallet_for_update(shop.user.id).await.unwrap().unwrap().balance, dec(200));
    }

    #[tokio::test]
    async fn test_online_payment_confirmation() {
        let shop = shop().await;
        let product = shop.cart_line("Teapot", 200, 5, 1).await;
        let order = shop.orders.place_order(shop.user.id, shop.request(PaymentMethod::OnlinePayment)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let failed = shop.orders.fail_payment(shop.user.id, order.id).await.unwrap();
        assert_eq!(failed.payment_status, PaymentStatus::Failed);

        let paid = shop.orders.confirm_payment(shop.user.id, order.id).await.unwrap();
        assert_eq!((paid.status, paid.payment_status), (OrderStatus::Placed, PaymentStatus::Paid));
        assert_eq!(shop.stock(product.id).await, 4);

        let err = shop.orders.confirm_payment(shop.user.id, order.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidTransition(_)));
    }
}
