//! Orders and order items.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use uuid::Uuid;

use super::PgTx;
use crate::domain::aggregates::{Order, OrderAddress, OrderItem};
use crate::domain::pricing::OrderTotals;
use crate::store::{OrderRepository, StoreError, StoreResult};

pub(super) const ORDER_COLUMNS: &str = "id, user_id, subtotal, discount, shipping, final_price, \
     address_name, address_phone_no, address_line1, address_line2, address_city, address_state, \
     address_postal_code, address_country, address_landmark, payment_method, payment_status, order_status, \
     coupon_code, created_at, updated_at";

#[derive(FromRow)]
pub(super) struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    subtotal: Decimal,
    discount: Decimal,
    shipping: Decimal,
    final_price: Decimal,
    address_name: String,
    address_phone_no: String,
    address_line1: String,
    address_line2: Option<String>,
    address_city: String,
    address_state: String,
    address_postal_code: String,
    address_country: String,
    address_landmark: Option<String>,
    payment_method: String,
    payment_status: String,
    order_status: String,
    coupon_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub(super) struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
    total_price: Decimal,
    state: String,
}

impl OrderItemRow {
    pub(super) fn into_domain(self) -> StoreResult<OrderItem> {
        Ok(OrderItem {
            id: self.id, order_id: self.order_id, product_id: self.product_id, product_name: self.product_name,
            product_price: self.product_price, quantity: self.quantity, total_price: self.total_price,
            state: self.state.parse().map_err(|e| StoreError::corrupt("order_items", e))?,
        })
    }
}

impl OrderRow {
    fn into_domain(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        let corrupt = |e| StoreError::corrupt("orders", e);
        let totals = OrderTotals {
            subtotal: self.subtotal, discount: self.discount, shipping: self.shipping, final_price: self.final_price,
        };
        let address = OrderAddress {
            name: self.address_name, phone_no: self.address_phone_no, address_line1: self.address_line1,
            address_line2: self.address_line2, city: self.address_city, state: self.address_state,
            postal_code: self.address_postal_code, country: self.address_country, landmark: self.address_landmark,
        };
        Ok(Order::restore(
            self.id, self.user_id, totals, address,
            self.payment_method.parse().map_err(corrupt)?,
            self.payment_status.parse().map_err(corrupt)?,
            self.order_status.parse().map_err(corrupt)?,
            self.coupon_code, items, self.created_at, self.updated_at,
        ))
    }
}

/// Load the items of `rows` and assemble the orders, keeping row order.
pub(super) async fn attach_items(conn: &mut PgConnection, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, product_name, product_price, quantity, total_price, state \
         FROM order_items WHERE order_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in item_rows {
        let item = row.into_domain()?;
        by_order.entry(item.order_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_domain(items)
        })
        .collect()
}

impl PgTx {
    async fn fetch_order(&mut self, sql: &str, id: Uuid) -> StoreResult<Option<Order>> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(sql).bind(id).fetch_optional(&mut *self.tx).await? else {
            return Ok(None);
        };
        Ok(attach_items(&mut self.tx, vec![row]).await?.pop())
    }
}

#[async_trait]
impl OrderRepository for PgTx {
    async fn order(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        self.fetch_order(&sql, id).await
    }

    async fn order_for_update(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        self.fetch_order(&sql, id).await
    }

    async fn save_order(&mut self, order: &Order) -> StoreResult<()> {
        let a = &order.address;
        sqlx::query(
            "INSERT INTO orders (id, user_id, subtotal, discount, shipping, final_price, address_name, \
             address_phone_no, address_line1, address_line2, address_city, address_state, address_postal_code, \
             address_country, address_landmark, payment_method, payment_status, order_status, coupon_code, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21) \
             ON CONFLICT (id) DO UPDATE SET subtotal = EXCLUDED.subtotal, discount = EXCLUDED.discount, \
             shipping = EXCLUDED.shipping, final_price = EXCLUDED.final_price, \
             payment_status = EXCLUDED.payment_status, order_status = EXCLUDED.order_status, \
             coupon_code = EXCLUDED.coupon_code, updated_at = EXCLUDED.updated_at",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.shipping)
        .bind(order.final_price)
        .bind(&a.name)
        .bind(&a.phone_no)
        .bind(&a.address_line1)
        .bind(&a.address_line2)
        .bind(&a.city)
        .bind(&a.state)
        .bind(&a.postal_code)
        .bind(&a.country)
        .bind(&a.landmark)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(&order.coupon_code)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, product_price, quantity, \
                 total_price, state) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (id) DO UPDATE SET state = EXCLUDED.state",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.product_price)
            .bind(item.quantity)
            .bind(item.total_price)
            .bind(item.state.as_str())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn orders_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql).bind(user_id).fetch_all(&mut *self.tx).await?;
        attach_items(&mut self.tx, rows).await
    }

    async fn all_orders(&mut self) -> StoreResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql).fetch_all(&mut *self.tx).await?;
        attach_items(&mut self.tx, rows).await
    }
}
