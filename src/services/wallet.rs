//! Wallet ledger.
//!
//! [`credit`] and [`debit`] run inside a caller's unit of work so a refund or
//! a wallet payment commits together with the order change that caused it.
//! Both update the stored balance and append one history entry.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Wallet, WalletEntry};
use crate::store::{Store, StoreTx};
use crate::{EcommerceError, Result};

/// Credit `amount` to the user's wallet, opening the wallet on first use.
pub async fn credit(tx: &mut dyn StoreTx, user_id: Uuid, amount: Decimal, reason: &str) -> Result<Wallet> {
    let mut wallet = match tx.wallet_for_update(user_id).await? {
        Some(wallet) => wallet,
        None => Wallet::open(user_id),
    };
    let entry = wallet.credit(amount, reason)?;
    tx.save_wallet(&wallet).await?;
    tx.append_wallet_entry(&entry).await?;
    Ok(wallet)
}

/// Debit `amount` from the user's wallet. Fails without touching the balance
/// when the wallet is missing or holds less than `amount`.
pub async fn debit(tx: &mut dyn StoreTx, user_id: Uuid, amount: Decimal, reason: &str) -> Result<Wallet> {
    let mut wallet = tx
        .wallet_for_update(user_id)
        .await?
        .ok_or_else(|| EcommerceError::not_found("user wallet"))?;
    let entry = wallet.debit(amount, reason)?;
    tx.save_wallet(&wallet).await?;
    tx.append_wallet_entry(&entry).await?;
    Ok(wallet)
}

#[derive(Clone, Debug, Serialize)]
pub struct WalletStatement {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub history: Vec<WalletEntry>,
}

#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn Store>,
}

impl WalletService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// Balance and history, newest entry first.
    pub async fn get_wallet(&self, user_id: Uuid) -> Result<WalletStatement> {
        let mut tx = self.store.begin().await?;
        let wallet = tx
            .wallet_for_update(user_id)
            .await?
            .ok_or_else(|| EcommerceError::not_found("wallet"))?;
        let history = tx.wallet_history(wallet.id).await?;
        Ok(WalletStatement { wallet, history })
    }
}
