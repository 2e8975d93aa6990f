//! Aggregates module
pub mod address;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
pub mod user;
pub mod wallet;
pub mod wishlist;

pub use address::{Address, AddressError, AddressKind};
pub use cart::{Cart, CartError, CartItem, MAX_UNITS_PER_LINE};
pub use coupon::{Coupon, CouponDraft, CouponError, CouponUsage};
pub use order::{
    Compensation, ItemState, Order, OrderAddress, OrderError, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use product::{Category, NewProduct, Product, ProductError};
pub use user::User;
pub use wallet::{EntryKind, Wallet, WalletEntry, WalletError};
pub use wishlist::WishlistEntry;
