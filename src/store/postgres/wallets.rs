use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::PgTx;
use crate::domain::aggregates::{EntryKind, Wallet, WalletEntry};
use crate::store::{StoreError, StoreResult, WalletRepository};

#[derive(FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: Uuid,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct WalletEntryRow {
    id: Uuid,
    wallet_id: Uuid,
    entry_type: String,
    amount: Decimal,
    reason: String,
    created_at: DateTime<Utc>,
}

impl WalletEntryRow {
    fn into_domain(self) -> StoreResult<WalletEntry> {
        let kind = EntryKind::parse(&self.entry_type)
            .ok_or_else(|| StoreError::corrupt("wallet_history", format!("unknown entry type {:?}", self.entry_type)))?;
        Ok(WalletEntry {
            id: self.id, wallet_id: self.wallet_id, kind, amount: self.amount, reason: self.reason,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl WalletRepository for PgTx {
    async fn wallet_for_update(&mut self, user_id: Uuid) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| Wallet::restore(r.id, r.user_id, r.balance, r.created_at, r.updated_at)))
    }

    async fn save_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wallets (id, user_id, balance, created_at, updated_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET balance = EXCLUDED.balance, updated_at = EXCLUDED.updated_at",
        )
        .bind(wallet.id)
        .bind(wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn append_wallet_entry(&mut self, entry: &WalletEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wallet_history (id, wallet_id, entry_type, amount, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.wallet_id)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn wallet_history(&mut self, wallet_id: Uuid) -> StoreResult<Vec<WalletEntry>> {
        sqlx::query_as::<_, WalletEntryRow>(
            "SELECT id, wallet_id, entry_type, amount, reason, created_at FROM wallet_history \
             WHERE wallet_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(wallet_id)
        .fetch_all(&mut *self.tx)
        .await?
        .into_iter()
        .map(WalletEntryRow::into_domain)
        .collect()
    }
}
