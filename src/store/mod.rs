//! Persistence boundary.
//!
//! A [`Store`] hands out units of work ([`StoreTx`]). Everything read or
//! written through one unit of work is committed together by
//! [`StoreTx::commit`]; dropping it without committing rolls it back.
//! Methods named `*_for_update` lock the row until the unit of work ends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, Category, Coupon, CouponUsage, Order, OrderItem, Product, User, Wallet, WalletEntry,
    WishlistEntry,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A unique constraint rejected the write; carries what was duplicated.
    #[error("{0} already exists")]
    UniqueViolation(String),

    /// A stored value could not be turned back into a domain value.
    #[error("corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

impl StoreError {
    pub fn corrupt(table: &'static str, detail: impl ToString) -> Self {
        Self::Corrupt { table, detail: detail.to_string() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait CatalogRepository: Send {
    async fn category(&mut self, id: Uuid) -> StoreResult<Option<Category>>;
    /// Case-insensitive lookup.
    async fn category_by_name(&mut self, name: &str) -> StoreResult<Option<Category>>;
    async fn categories(&mut self) -> StoreResult<Vec<Category>>;
    async fn save_category(&mut self, category: &Category) -> StoreResult<()>;

    async fn product(&mut self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn product_for_update(&mut self, id: Uuid) -> StoreResult<Option<Product>>;
    /// Case-insensitive lookup.
    async fn product_by_name(&mut self, name: &str) -> StoreResult<Option<Product>>;
    async fn products(&mut self) -> StoreResult<Vec<Product>>;
    async fn save_product(&mut self, product: &Product) -> StoreResult<()>;
}

#[async_trait]
pub trait CartRepository: Send {
    async fn cart_for_update(&mut self, user_id: Uuid) -> StoreResult<Option<Cart>>;
    /// Insert or replace the cart and its full set of lines.
    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()>;
    async fn delete_cart(&mut self, cart_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send {
    async fn order(&mut self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn order_for_update(&mut self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Insert or update the order row and its items.
    async fn save_order(&mut self, order: &Order) -> StoreResult<()>;
    /// Newest first.
    async fn orders_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn all_orders(&mut self) -> StoreResult<Vec<Order>>;
}

#[async_trait]
pub trait CouponRepository: Send {
    async fn coupon(&mut self, id: Uuid) -> StoreResult<Option<Coupon>>;
    async fn coupon_by_code(&mut self, code: &str) -> StoreResult<Option<Coupon>>;
    async fn coupon_by_name(&mut self, name: &str) -> StoreResult<Option<Coupon>>;
    async fn save_coupon(&mut self, coupon: &Coupon) -> StoreResult<()>;
    /// Returns whether a row was removed.
    async fn delete_coupon(&mut self, id: Uuid) -> StoreResult<bool>;

    async fn coupon_usage_for_update(&mut self, user_id: Uuid, code: &str) -> StoreResult<Option<CouponUsage>>;
    async fn save_coupon_usage(&mut self, usage: &CouponUsage) -> StoreResult<()>;
}

#[async_trait]
pub trait WalletRepository: Send {
    async fn wallet_for_update(&mut self, user_id: Uuid) -> StoreResult<Option<Wallet>>;
    async fn save_wallet(&mut self, wallet: &Wallet) -> StoreResult<()>;
    async fn append_wallet_entry(&mut self, entry: &WalletEntry) -> StoreResult<()>;
    /// Newest first.
    async fn wallet_history(&mut self, wallet_id: Uuid) -> StoreResult<Vec<WalletEntry>>;
}

#[async_trait]
pub trait AccountRepository: Send {
    async fn user(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    async fn address(&mut self, id: Uuid) -> StoreResult<Option<Address>>;
    async fn addresses(&mut self, user_id: Uuid) -> StoreResult<Vec<Address>>;
    async fn save_address(&mut self, address: &Address) -> StoreResult<()>;
    async fn delete_address(&mut self, id: Uuid) -> StoreResult<bool>;

    async fn wishlist(&mut self, user_id: Uuid) -> StoreResult<Vec<WishlistEntry>>;
    async fn wishlist_entry(&mut self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<WishlistEntry>>;
    async fn insert_wishlist_entry(&mut self, entry: &WishlistEntry) -> StoreResult<()>;
    async fn delete_wishlist_entry(&mut self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait SalesRepository: Send {
    /// Orders created in `[from, to)`.
    async fn orders_between(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Order>>;
    /// Every order item that has not been cancelled.
    async fn sold_items(&mut self) -> StoreResult<Vec<OrderItem>>;
}

/// One unit of work over every repository.
#[async_trait]
pub trait StoreTx:
    CatalogRepository + CartRepository + OrderRepository + CouponRepository + WalletRepository + AccountRepository
    + SalesRepository + Send
{
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
