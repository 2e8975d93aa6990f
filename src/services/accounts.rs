//! Addresses and wishlist, both scoped to the signed-in user.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Address, AddressKind, WishlistEntry};
use crate::domain::pricing::effective_price;
use crate::services::catalog::listed_product;
use crate::store::{Store, StoreTx};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug)]
pub struct NewAddress {
    pub name: String,
    pub phone_no: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub landmark: Option<String>,
    pub kind: AddressKind,
}

/// `None` keeps a field; `Some(None)` clears an optional one.
#[derive(Clone, Debug, Default)]
pub struct AddressPatch {
    pub name: Option<String>,
    pub phone_no: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<Option<String>>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub landmark: Option<Option<String>>,
    pub kind: Option<AddressKind>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

async fn own_address(tx: &mut dyn StoreTx, user_id: Uuid, address_id: Uuid) -> Result<Address> {
    tx.address(address_id)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| EcommerceError::not_found("address"))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn add_address(&self, user_id: Uuid, new: NewAddress) -> Result<Address> {
        let now = Utc::now();
        let address = Address {
            id: Uuid::now_v7(),
            user_id,
            name: new.name.trim().to_string(),
            phone_no: new.phone_no.trim().to_string(),
            address_line1: new.address_line1.trim().to_string(),
            address_line2: trimmed(new.address_line2),
            city: new.city.trim().to_string(),
            state: new.state.trim().to_string(),
            postal_code: new.postal_code.trim().to_string(),
            country: new.country.trim().to_string(),
            landmark: trimmed(new.landmark),
            kind: new.kind,
            created_at: now,
            updated_at: now,
        };
        address.validate()?;

        let mut tx = self.store.begin().await?;
        tx.user(user_id).await?.ok_or_else(|| EcommerceError::not_found("user"))?;
        tx.save_address(&address).await?;
        tx.commit().await?;

        info!(%user_id, address_id = %address.id, "address added");
        Ok(address)
    }

    pub async fn edit_address(&self, user_id: Uuid, address_id: Uuid, patch: AddressPatch) -> Result<Address> {
        let mut tx = self.store.begin().await?;
        let mut address = own_address(&mut *tx, user_id, address_id).await?;

        if let Some(name) = patch.name { address.name = name.trim().to_string(); }
        if let Some(phone_no) = patch.phone_no { address.phone_no = phone_no.trim().to_string(); }
        if let Some(line1) = patch.address_line1 { address.address_line1 = line1.trim().to_string(); }
        if let Some(line2) = patch.address_line2 { address.address_line2 = trimmed(line2); }
        if let Some(city) = patch.city { address.city = city.trim().to_string(); }
        if let Some(state) = patch.state { address.state = state.trim().to_string(); }
        if let Some(postal_code) = patch.postal_code { address.postal_code = postal_code.trim().to_string(); }
        if let Some(country) = patch.country { address.country = country.trim().to_string(); }
        if let Some(landmark) = patch.landmark { address.landmark = trimmed(landmark); }
        if let Some(kind) = patch.kind { address.kind = kind; }
        address.validate()?;
        address.touch();

        tx.save_address(&address).await?;
        tx.commit().await?;
        Ok(address)
    }

    pub async fn delete_address(&self, user_id: Uuid, address_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        own_address(&mut *tx, user_id, address_id).await?;
        tx.delete_address(address_id).await?;
        tx.commit().await?;

        info!(%user_id, %address_id, "address deleted");
        Ok(())
    }

    pub async fn addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.addresses(user_id).await?)
    }

    /// Snapshot a listed product at its effective price.
    pub async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistEntry> {
        let mut tx = self.store.begin().await?;
        tx.user(user_id).await?.ok_or_else(|| EcommerceError::not_found("user"))?;
        if tx.wishlist_entry(user_id, product_id).await?.is_some() {
            return Err(EcommerceError::Conflict("product already in wishlist".into()));
        }
        let (product, category) = listed_product(&mut *tx, product_id).await?;
        let entry = WishlistEntry::of(user_id, &product, effective_price(&product, &category).price);
        tx.insert_wishlist_entry(&entry).await?;
        tx.commit().await?;

        info!(%user_id, %product_id, "product added to wishlist");
        Ok(entry)
    }

    pub async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_wishlist_entry(user_id, product_id).await? {
            return Err(EcommerceError::not_found("wishlist entry"));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn wishlist(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.wishlist(user_id).await?)
    }
}
