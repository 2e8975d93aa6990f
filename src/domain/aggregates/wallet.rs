//! Wallet Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::round_money;

/// Stored-value balance of one user. The balance is kept on the wallet row;
/// every mutation also yields a [`WalletEntry`] for the history table.
#[derive(Clone, Debug, Serialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalletEntry {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn open(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, balance: Decimal::ZERO, created_at: now, updated_at: now, events: vec![] }
    }

    /// Rebuild a wallet loaded from storage.
    pub fn restore(id: Uuid, user_id: Uuid, balance: Decimal, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { id, user_id, balance, created_at, updated_at, events: vec![] }
    }

    pub fn credit(&mut self, amount: Decimal, reason: impl Into<String>) -> Result<WalletEntry, WalletError> {
        let amount = Self::checked(amount)?;
        self.balance = round_money(self.balance + amount);
        Ok(self.record(EntryKind::Credit, amount, reason.into()))
    }

    pub fn debit(&mut self, amount: Decimal, reason: impl Into<String>) -> Result<WalletEntry, WalletError> {
        let amount = Self::checked(amount)?;
        if self.balance < amount {
            return Err(WalletError::InsufficientFunds { balance: self.balance, requested: amount });
        }
        self.balance = round_money(self.balance - amount);
        Ok(self.record(EntryKind::Debit, amount, reason.into()))
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn checked(amount: Decimal) -> Result<Decimal, WalletError> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO { return Err(WalletError::NonPositiveAmount); }
        Ok(amount)
    }

    fn record(&mut self, kind: EntryKind, amount: Decimal, reason: String) -> WalletEntry {
        let now = Utc::now();
        self.updated_at = now;
        self.events.push(DomainEvent::WalletChanged { user_id: self.user_id, kind, amount, balance: self.balance });
        WalletEntry { id: Uuid::now_v7(), wallet_id: self.id, kind, amount, reason, created_at: now }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("not enough balance: available {balance}, required {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("wallet amount must be greater than 0")]
    NonPositiveAmount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let mut wallet = Wallet::open(Uuid::now_v7());
        let entry = wallet.credit(Decimal::new(50000, 2), "refund").unwrap();
        assert_eq!(entry.kind, EntryKind::Credit);
        wallet.debit(Decimal::new(12050, 2), "order payment").unwrap();
        assert_eq!(wallet.balance, Decimal::new(37950, 2));
        assert_eq!(wallet.take_events().len(), 2);
    }

    #[test]
    fn test_debit_beyond_balance_leaves_balance() {
        let mut wallet = Wallet::open(Uuid::now_v7());
        wallet.credit(Decimal::new(100, 0), "refund").unwrap();
        let err = wallet.debit(Decimal::new(10001, 2), "order payment").unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        assert_eq!(wallet.balance, Decimal::new(100, 0));
    }

    #[test]
    fn test_rejects_zero_amount() {
        let mut wallet = Wallet::open(Uuid::now_v7());
        assert_eq!(wallet.credit(Decimal::ZERO, "noop"), Err(WalletError::NonPositiveAmount));
    }
}
