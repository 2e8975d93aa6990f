//! Kars E-commerce Backend
//!
//! JSON REST service for a small storefront.
//!
//! ## Features
//! - Catalog with product and category offers
//! - Per-user cart with quantity and stock caps
//! - Coupons with activation window, minimum amount and per-user usage limit
//! - Order placement, cancellation, per-item cancellation and returns
//! - Wallet ledger used for payment and refunds
//! - Sales and top-selling reports
//!
//! Every multi-step workflow runs inside one store transaction and is rolled
//! back as a whole on the first failure.

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod services;
pub mod store;

use domain::aggregates::{AddressError, CartError, CouponError, OrderError, ProductError, WalletError};
use domain::value_objects::{CouponNameError, OfferError};
use store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    OutOfStock(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    CouponRejected(String),

    #[error(transparent)]
    Store(StoreError),
}

impl EcommerceError {
    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{what} not found")) }
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

impl From<StoreError> for EcommerceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(what) => Self::Conflict(format!("{what} already exists")),
            other => Self::Store(other),
        }
    }
}

impl From<CartError> for EcommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::OutOfStock { .. } => Self::OutOfStock(e.to_string()),
            CartError::LimitExceeded(msg) => Self::LimitExceeded(msg),
            CartError::ItemNotFound => Self::NotFound(e.to_string()),
        }
    }
}

impl From<OrderError> for EcommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::ItemNotFound => Self::NotFound(e.to_string()),
            OrderError::EmptyCart | OrderError::CashOnDeliveryLimit | OrderError::UnknownValue { .. } => {
                Self::Validation(e.to_string())
            }
            _ => Self::InvalidTransition(e.to_string()),
        }
    }
}

impl From<CouponError> for EcommerceError {
    fn from(e: CouponError) -> Self {
        match e {
            CouponError::Invalid(msg) => Self::Validation(msg),
            other => Self::CouponRejected(other.to_string()),
        }
    }
}

impl From<WalletError> for EcommerceError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::InsufficientFunds { .. } => Self::InsufficientFunds(e.to_string()),
            WalletError::NonPositiveAmount => Self::Validation(e.to_string()),
        }
    }
}

impl From<ProductError> for EcommerceError {
    fn from(e: ProductError) -> Self { Self::OutOfStock(e.to_string()) }
}

impl From<OfferError> for EcommerceError {
    fn from(e: OfferError) -> Self { Self::Validation(e.to_string()) }
}

impl From<CouponNameError> for EcommerceError {
    fn from(e: CouponNameError) -> Self { Self::Validation(e.to_string()) }
}

impl From<AddressError> for EcommerceError {
    fn from(e: AddressError) -> Self { Self::Validation(e.to_string()) }
}
