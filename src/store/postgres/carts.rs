//! Carts and cart lines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::PgTx;
use crate::domain::aggregates::{Cart, CartItem};
use crate::store::{CartRepository, StoreResult};

#[derive(FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    total_items: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
    total_price: Decimal,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id, cart_id: row.cart_id, product_id: row.product_id, product_name: row.product_name,
            product_price: row.product_price, quantity: row.quantity, total_price: row.total_price,
        }
    }
}

#[async_trait]
impl CartRepository for PgTx {
    async fn cart_for_update(&mut self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        let Some(row) = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, total_items, created_at, updated_at FROM carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, CartItemRow>(
            "SELECT id, cart_id, product_id, product_name, product_price, quantity, total_price \
             FROM cart_items WHERE cart_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(Cart {
            id: row.id, user_id: row.user_id, total_items: row.total_items,
            items: items.into_iter().map(CartItem::from).collect(),
            created_at: row.created_at, updated_at: row.updated_at,
        }))
    }

    async fn save_cart(&mut self, cart: &Cart) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, total_items, created_at, updated_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET total_items = EXCLUDED.total_items, updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(cart.total_items)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await?;

        let kept: Vec<Uuid> = cart.items.iter().map(|i| i.id).collect();
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND NOT (id = ANY($2))")
            .bind(cart.id)
            .bind(&kept)
            .execute(&mut *self.tx)
            .await?;

        for item in &cart.items {
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, product_id, product_name, product_price, quantity, total_price) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (id) DO UPDATE SET product_name = EXCLUDED.product_name, \
                 product_price = EXCLUDED.product_price, quantity = EXCLUDED.quantity, \
                 total_price = EXCLUDED.total_price",
            )
            .bind(item.id)
            .bind(item.cart_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.product_price)
            .bind(item.quantity)
            .bind(item.total_price)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn delete_cart(&mut self, cart_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM carts WHERE id = $1").bind(cart_id).execute(&mut *self.tx).await?;
        Ok(())
    }
}
