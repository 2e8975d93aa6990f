use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::orders::{attach_items, OrderItemRow, OrderRow, ORDER_COLUMNS};
use super::PgTx;
use crate::domain::aggregates::{Order, OrderItem};
use crate::store::{SalesRepository, StoreResult};

#[async_trait]
impl SalesRepository for PgTx {
    async fn orders_between(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE created_at >= $1 AND created_at < $2 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql).bind(from).bind(to).fetch_all(&mut *self.tx).await?;
        attach_items(&mut self.tx, rows).await
    }

    async fn sold_items(&mut self) -> StoreResult<Vec<OrderItem>> {
        sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, product_name, product_price, quantity, total_price, state \
             FROM order_items WHERE state = 'ordered'",
        )
        .fetch_all(&mut *self.tx)
        .await?
        .into_iter()
        .map(OrderItemRow::into_domain)
        .collect()
    }
}
