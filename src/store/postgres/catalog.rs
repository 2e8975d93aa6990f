//! Categories and products.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::{offer_columns, offer_from_columns, write_error, PgTx};
use crate::domain::aggregates::{Category, Product};
use crate::store::{CatalogRepository, StoreResult};

const CATEGORY_COLUMNS: &str = "id, name, is_listed, offer_type, offer_value, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, price, quantity, category_id, color, image_urls, status, \
     offer_type, offer_value, is_listed, created_at, updated_at";

#[derive(FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    is_listed: bool,
    offer_type: Option<String>,
    offer_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_domain(self) -> StoreResult<Category> {
        Ok(Category {
            id: self.id, name: self.name, is_listed: self.is_listed,
            offer: offer_from_columns("categories", self.offer_type.as_deref(), self.offer_value)?,
            created_at: self.created_at, updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    quantity: i32,
    category_id: Uuid,
    color: Option<String>,
    image_urls: Vec<String>,
    status: Option<String>,
    offer_type: Option<String>,
    offer_value: Decimal,
    is_listed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_domain(self) -> StoreResult<Product> {
        Ok(Product {
            id: self.id, name: self.name, description: self.description, price: self.price,
            quantity: self.quantity, category_id: self.category_id, color: self.color,
            image_urls: self.image_urls, status: self.status,
            offer: offer_from_columns("products", self.offer_type.as_deref(), self.offer_value)?,
            is_listed: self.is_listed, created_at: self.created_at, updated_at: self.updated_at,
        })
    }
}

impl PgTx {
    async fn fetch_category(&mut self, sql: &str, arg: &str) -> StoreResult<Option<Category>> {
        sqlx::query_as::<_, CategoryRow>(sql)
            .bind(arg)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(CategoryRow::into_domain)
            .transpose()
    }

    async fn fetch_product(&mut self, sql: &str, id: Uuid) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(ProductRow::into_domain)
            .transpose()
    }
}

#[async_trait]
impl CatalogRepository for PgTx {
    async fn category(&mut self, id: Uuid) -> StoreResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(CategoryRow::into_domain)
            .transpose()
    }

    async fn category_by_name(&mut self, name: &str) -> StoreResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE LOWER(name) = LOWER(TRIM($1))");
        self.fetch_category(&sql, name).await
    }

    async fn categories(&mut self) -> StoreResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name");
        sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(CategoryRow::into_domain)
            .collect()
    }

    async fn save_category(&mut self, category: &Category) -> StoreResult<()> {
        let (offer_type, offer_value) = offer_columns(category.offer);
        sqlx::query(
            "INSERT INTO categories (id, name, is_listed, offer_type, offer_value, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, is_listed = EXCLUDED.is_listed, \
             offer_type = EXCLUDED.offer_type, offer_value = EXCLUDED.offer_value, updated_at = EXCLUDED.updated_at",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(category.is_listed)
        .bind(offer_type)
        .bind(offer_value)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error("category"))?;
        Ok(())
    }

    async fn product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        self.fetch_product(&sql, id).await
    }

    async fn product_for_update(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        self.fetch_product(&sql, id).await
    }

    async fn product_by_name(&mut self, name: &str) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE LOWER(name) = LOWER(TRIM($1))");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(ProductRow::into_domain)
            .transpose()
    }

    async fn products(&mut self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(ProductRow::into_domain)
            .collect()
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        let (offer_type, offer_value) = offer_columns(product.offer);
        sqlx::query(
            "INSERT INTO products (id, name, description, price, quantity, category_id, color, image_urls, status, \
             offer_type, offer_value, is_listed, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description, \
             price = EXCLUDED.price, quantity = EXCLUDED.quantity, category_id = EXCLUDED.category_id, \
             color = EXCLUDED.color, image_urls = EXCLUDED.image_urls, status = EXCLUDED.status, \
             offer_type = EXCLUDED.offer_type, offer_value = EXCLUDED.offer_value, \
             is_listed = EXCLUDED.is_listed, updated_at = EXCLUDED.updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.category_id)
        .bind(&product.color)
        .bind(&product.image_urls)
        .bind(&product.status)
        .bind(offer_type)
        .bind(offer_value)
        .bind(product.is_listed)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error("product"))?;
        Ok(())
    }
}
