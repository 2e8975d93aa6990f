//! Application services.
//!
//! Each workflow opens one unit of work on the [`Store`], runs every step
//! inside it and commits only once all steps succeeded. Domain events raised
//! along the way are handed to the [`EventBus`] after the commit.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::events::DomainEvent;
use crate::store::Store;

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod reports;
pub mod wallet;

pub use accounts::AccountService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use coupons::CouponService;
pub use orders::{Actor, OrderService};
pub use reports::ReportService;
pub use wallet::WalletService;

const SUBJECT_PREFIX: &str = "kars.events";

/// Logs committed domain events and forwards them to NATS when connected.
#[derive(Clone, Debug, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }

    async fn publish(&self, event: &DomainEvent) {
        info!(kind = event.kind(), ?event, "domain event");

        let Some(nats) = &self.nats else { return };
        let subject = format!("{SUBJECT_PREFIX}.{}", event.kind());
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, kind = event.kind(), "failed to encode event");
                return;
            }
        };
        if let Err(e) = nats.publish(subject, payload.into()).await {
            warn!(error = %e, kind = event.kind(), "failed to publish event");
        }
    }
}

/// Every service, sharing one store and one event bus.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub coupons: CouponService,
    pub orders: OrderService,
    pub wallet: WalletService,
    pub accounts: AccountService,
    pub reports: ReportService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            cart: CartService::new(store.clone()),
            coupons: CouponService::new(store.clone(), events.clone()),
            orders: OrderService::new(store.clone(), events),
            wallet: WalletService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            reports: ReportService::new(store),
        }
    }
}
