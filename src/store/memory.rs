//! In-memory store.
//!
//! Units of work are serialised on one mutex. Each works on a private copy of
//! the tables which replaces the shared copy on commit, so an uncommitted unit
//! of work leaves nothing behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, Category, Coupon, CouponUsage, ItemState, Order, OrderItem, Product, User, Wallet,
    WalletEntry, WishlistEntry,
};
use crate::store::{
    AccountRepository, CartRepository, CatalogRepository, CouponRepository, OrderRepository, SalesRepository,
    Store, StoreError, StoreResult, StoreTx, WalletRepository,
};

#[derive(Clone, Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    coupons: HashMap<Uuid, Coupon>,
    coupon_usages: HashMap<(Uuid, String), CouponUsage>,
    wallets: HashMap<Uuid, Wallet>,
    wallet_entries: Vec<WalletEntry>,
    addresses: HashMap<Uuid, Address>,
    wishlist: Vec<WishlistEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Users are provisioned by the external auth service.
    pub async fn insert_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    pub async fn set_user_blocked(&self, user_id: Uuid, blocked: bool) {
        if let Some(user) = self.tables.lock().await.users.get_mut(&user_id) {
            user.is_blocked = blocked;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn same_name(a: &str, b: &str) -> bool { a.trim().eq_ignore_ascii_case(b.trim()) }

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for MemoryTx {
    async fn category(&mut self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.work.categories.get(&id).cloned())
    }

    async fn category_by_name(&mut self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self.work.categories.values().find(|c| same_name(&c.name, name)).cloned())
    }

    async fn categories(&mut self) -> StoreResult<Vec<Category>> {
        let mut rows: Vec<_> = self.work.categories.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn save_category(&mut self, category: &Category) -> StoreResult<()> {
        if self.work.categories.values().any(|c| c.id != category.id && same_name(&c.name, &category.name)) {
            return Err(StoreError::UniqueViolation("category".into()));
        }
        self.work.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn product_for_update(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        self.product(id).await
    }

    async fn product_by_name(&mut self, name: &str) -> StoreResult<Option<Product>> {
        Ok(self.work.products.values().find(|p| same_name(&p.name, name)).cloned())
    }

    async fn products(&mut self) -> StoreResult<Vec<Product>> {
        let mut rows: Vec<_> = self.work.products.values().cloned().collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(rows)
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        if self.work.products.values().any(|p| p.id != product.id && same_name(&p.name, &product.name)) {
            return Err(StoreError::UniqueViolation("product".into()));
        }
        self.work.products.insert(product.id, product.clone());
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryTx {
    async fn cart_for_update(&mut self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        Ok(self.work.carts.get(&user_id).cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()> {
        self.work.carts.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn delete_cart(&mut self, cart_id: Uuid) -> StoreResult<()> {
        self.work.carts.retain(|_, c| c.id != cart_id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryTx {
    async fn order(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn order_for_update(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
        self.order(id).await
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        let mut stored = order.clone();
        stored.take_events();
        self.work.orders.insert(order.id, stored);
        Ok(())
    }

    async fn orders_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let mut rows: Vec<_> = self.work.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        newest_first(&mut rows, |o| (o.created_at, o.id));
        Ok(rows)
    }

    async fn all_orders(&mut self) -> StoreResult<Vec<Order>> {
        let mut rows: Vec<_> = self.work.orders.values().cloned().collect();
        newest_first(&mut rows, |o| (o.created_at, o.id));
        Ok(rows)
    }
}

#[async_trait]
impl CouponRepository for MemoryTx {
    async fn coupon(&mut self, id: Uuid) -> StoreResult<Option<Coupon>> {
        Ok(self.work.coupons.get(&id).cloned())
    }

    async fn coupon_by_code(&mut self, code: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.work.coupons.values().find(|c| c.code == code).cloned())
    }

    async fn coupon_by_name(&mut self, name: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.work.coupons.values().find(|c| c.name.as_str() == name).cloned())
    }

    async fn save_coupon(&mut self, coupon: &Coupon) -> StoreResult<()> {
        let others = || self.work.coupons.values().filter(|c| c.id != coupon.id);
        if others().any(|c| c.code == coupon.code) {
            return Err(StoreError::UniqueViolation("coupon code".into()));
        }
        if others().any(|c| c.name == coupon.name) {
            return Err(StoreError::UniqueViolation("coupon name".into()));
        }
        self.work.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn delete_coupon(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.work.coupons.remove(&id).is_some())
    }

    async fn coupon_usage_for_update(&mut self, user_id: Uuid, code: &str) -> StoreResult<Option<CouponUsage>> {
        Ok(self.work.coupon_usages.get(&(user_id, code.to_string())).cloned())
    }

    async fn save_coupon_usage(&mut self, usage: &CouponUsage) -> StoreResult<()> {
        self.work.coupon_usages.insert((usage.user_id, usage.coupon_code.clone()), usage.clone());
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for MemoryTx {
    async fn wallet_for_update(&mut self, user_id: Uuid) -> StoreResult<Option<Wallet>> {
        Ok(self.work.wallets.get(&user_id).cloned())
    }

    async fn save_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        let mut stored = wallet.clone();
        stored.take_events();
        self.work.wallets.insert(wallet.user_id, stored);
        Ok(())
    }

    async fn append_wallet_entry(&mut self, entry: &WalletEntry) -> StoreResult<()> {
        self.work.wallet_entries.push(entry.clone());
        Ok(())
    }

    async fn wallet_history(&mut self, wallet_id: Uuid) -> StoreResult<Vec<WalletEntry>> {
        let mut rows: Vec<_> = self.work.wallet_entries.iter().filter(|e| e.wallet_id == wallet_id).cloned().collect();
        newest_first(&mut rows, |e| (e.created_at, e.id));
        Ok(rows)
    }
}

#[async_trait]
impl AccountRepository for MemoryTx {
    async fn user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn address(&mut self, id: Uuid) -> StoreResult<Option<Address>> {
        Ok(self.work.addresses.get(&id).cloned())
    }

    async fn addresses(&mut self, user_id: Uuid) -> StoreResult<Vec<Address>> {
        let mut rows: Vec<_> = self.work.addresses.values().filter(|a| a.user_id == user_id).cloned().collect();
        newest_first(&mut rows, |a| (a.created_at, a.id));
        Ok(rows)
    }

    async fn save_address(&mut self, address: &Address) -> StoreResult<()> {
        self.work.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn delete_address(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.work.addresses.remove(&id).is_some())
    }

    async fn wishlist(&mut self, user_id: Uuid) -> StoreResult<Vec<WishlistEntry>> {
        let mut rows: Vec<_> = self.work.wishlist.iter().filter(|w| w.user_id == user_id).cloned().collect();
        newest_first(&mut rows, |w| (w.created_at, w.id));
        Ok(rows)
    }

    async fn wishlist_entry(&mut self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<WishlistEntry>> {
        Ok(self.work.wishlist.iter().find(|w| w.user_id == user_id && w.product_id == product_id).cloned())
    }

    async fn insert_wishlist_entry(&mut self, entry: &WishlistEntry) -> StoreResult<()> {
        if self.work.wishlist.iter().any(|w| w.user_id == entry.user_id && w.product_id == entry.product_id) {
            return Err(StoreError::UniqueViolation("wishlist entry".into()));
        }
        self.work.wishlist.push(entry.clone());
        Ok(())
    }

    async fn delete_wishlist_entry(&mut self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let before = self.work.wishlist.len();
        self.work.wishlist.retain(|w| !(w.user_id == user_id && w.product_id == product_id));
        Ok(self.work.wishlist.len() != before)
    }
}

#[async_trait]
impl SalesRepository for MemoryTx {
    async fn orders_between(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let mut rows: Vec<_> = self.work.orders.values()
            .filter(|o| o.created_at >= from && o.created_at < to)
            .cloned()
            .collect();
        newest_first(&mut rows, |o| (o.created_at, o.id));
        Ok(rows)
    }

    async fn sold_items(&mut self) -> StoreResult<Vec<OrderItem>> {
        Ok(self.work.orders.values()
            .flat_map(|o| o.items.iter())
            .filter(|i| i.state == ItemState::Ordered)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewProduct;
    use rust_decimal::Decimal;

    async fn seed_product(store: &MemoryStore) -> Product {
        let product = Product::create(NewProduct {
            name: "Desk Lamp".into(), price: Decimal::new(40, 0), quantity: 3,
            category_id: Uuid::now_v7(), ..Default::default()
        });
        let mut tx = store.begin().await.unwrap();
        tx.save_product(&product).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let store = MemoryStore::new();
        let product = seed_product(&store).await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.product(product.id).await.unwrap(), Some(product));
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryStore::new();
        let mut product = seed_product(&store).await;
        {
            let mut tx = store.begin().await.unwrap();
            product.remove_inventory(3).unwrap();
            tx.save_product(&product).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.product(product.id).await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_duplicate_product_name() {
        let store = MemoryStore::new();
        let first = seed_product(&store).await;
        let dup = Product::create(NewProduct { name: "desk lamp".into(), category_id: first.category_id, ..Default::default() });
        let mut tx = store.begin().await.unwrap();
        assert!(matches!(tx.save_product(&dup).await, Err(StoreError::UniqueViolation(_))));
    }
}
