//! PostgreSQL store.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::value_objects::Offer;
use crate::store::{Store, StoreError, StoreResult, StoreTx};

mod accounts;
mod carts;
mod catalog;
mod coupons;
mod orders;
mod sales;
mod wallets;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        Ok(Box::new(PgTx { tx: self.pool.begin().await? }))
    }
}

/// A unit of work backed by one database transaction. `sqlx` rolls the
/// transaction back when it is dropped uncommitted.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Map a unique-constraint failure on a write to [`StoreError::UniqueViolation`].
fn write_error(what: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation(what.to_string()),
        _ => StoreError::Database(e),
    }
}

fn offer_columns(offer: Option<Offer>) -> (Option<&'static str>, Decimal) {
    match offer {
        Some(o) => (Some(o.kind().as_str()), o.value()),
        None => (None, Decimal::ZERO),
    }
}

fn offer_from_columns(table: &'static str, kind: Option<&str>, value: Decimal) -> StoreResult<Option<Offer>> {
    Offer::from_columns(kind, value).map_err(|e| StoreError::corrupt(table, e))
}
