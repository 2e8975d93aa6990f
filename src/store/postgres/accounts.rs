//! Users, addresses and wishlists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::{write_error, PgTx};
use crate::domain::aggregates::{Address, AddressKind, User, WishlistEntry};
use crate::store::{AccountRepository, StoreError, StoreResult};

const ADDRESS_COLUMNS: &str = "id, user_id, name, phone_no, address_line1, address_line2, city, state, \
     postal_code, country, landmark, address_type, created_at, updated_at";
const WISHLIST_COLUMNS: &str =
    "id, user_id, product_id, product_name, product_description, product_price, created_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    user_name: String,
    email: String,
    phone_no: Option<String>,
    is_blocked: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    phone_no: String,
    address_line1: String,
    address_line2: Option<String>,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    landmark: Option<String>,
    address_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AddressRow {
    fn into_domain(self) -> StoreResult<Address> {
        let kind = AddressKind::parse(&self.address_type)
            .ok_or_else(|| StoreError::corrupt("addresses", format!("unknown address type {:?}", self.address_type)))?;
        Ok(Address {
            id: self.id, user_id: self.user_id, name: self.name, phone_no: self.phone_no,
            address_line1: self.address_line1, address_line2: self.address_line2, city: self.city,
            state: self.state, postal_code: self.postal_code, country: self.country, landmark: self.landmark,
            kind, created_at: self.created_at, updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct WishlistRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_description: String,
    product_price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(row: WishlistRow) -> Self {
        Self {
            id: row.id, user_id: row.user_id, product_id: row.product_id, product_name: row.product_name,
            product_description: row.product_description, product_price: row.product_price,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AccountRepository for PgTx {
    async fn user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, user_name, email, phone_no, is_blocked, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| User {
            id: r.id, user_name: r.user_name, email: r.email, phone_no: r.phone_no, is_blocked: r.is_blocked,
            created_at: r.created_at,
        }))
    }

    async fn address(&mut self, id: Uuid) -> StoreResult<Option<Address>> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1");
        sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(AddressRow::into_domain)
            .transpose()
    }

    async fn addresses(&mut self, user_id: Uuid) -> StoreResult<Vec<Address>> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, AddressRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(AddressRow::into_domain)
            .collect()
    }

    async fn save_address(&mut self, address: &Address) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO addresses (id, user_id, name, phone_no, address_line1, address_line2, city, state, \
             postal_code, country, landmark, address_type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, phone_no = EXCLUDED.phone_no, \
             address_line1 = EXCLUDED.address_line1, address_line2 = EXCLUDED.address_line2, \
             city = EXCLUDED.city, state = EXCLUDED.state, postal_code = EXCLUDED.postal_code, \
             country = EXCLUDED.country, landmark = EXCLUDED.landmark, address_type = EXCLUDED.address_type, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.name)
        .bind(&address.phone_no)
        .bind(&address.address_line1)
        .bind(&address.address_line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&address.landmark)
        .bind(address.kind.as_str())
        .bind(address.created_at)
        .bind(address.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_address(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1").bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn wishlist(&mut self, user_id: Uuid) -> StoreResult<Vec<WishlistEntry>> {
        let sql = format!("SELECT {WISHLIST_COLUMNS} FROM wishlist WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, WishlistRow>(&sql).bind(user_id).fetch_all(&mut *self.tx).await?;
        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }

    async fn wishlist_entry(&mut self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<WishlistEntry>> {
        let sql = format!("SELECT {WISHLIST_COLUMNS} FROM wishlist WHERE user_id = $1 AND product_id = $2");
        let row = sqlx::query_as::<_, WishlistRow>(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(WishlistEntry::from))
    }

    async fn insert_wishlist_entry(&mut self, entry: &WishlistEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wishlist (id, user_id, product_id, product_name, product_description, product_price, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.product_id)
        .bind(&entry.product_name)
        .bind(&entry.product_description)
        .bind(entry.product_price)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error("wishlist entry"))?;
        Ok(())
    }

    async fn delete_wishlist_entry(&mut self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
