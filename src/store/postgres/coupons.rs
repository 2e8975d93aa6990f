use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::{write_error, PgTx};
use crate::domain::aggregates::{Coupon, CouponUsage};
use crate::domain::value_objects::CouponName;
use crate::store::{CouponRepository, StoreError, StoreResult};

const COUPON_COLUMNS: &str = "id, name, code, discount_type, discount_value, maximum_discount, minimum_amount, \
     usage_limit, starts_at, expires_at, is_active, created_at, updated_at";

#[derive(FromRow)]
struct CouponRow {
    id: Uuid,
    name: String,
    code: String,
    discount_type: String,
    discount_value: Decimal,
    maximum_discount: Decimal,
    minimum_amount: Decimal,
    usage_limit: i32,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CouponRow {
    fn into_domain(self) -> StoreResult<Coupon> {
        Ok(Coupon {
            id: self.id,
            name: CouponName::new(self.name).map_err(|e| StoreError::corrupt("coupons", e))?,
            code: self.code,
            discount_kind: self.discount_type.parse().map_err(|e| StoreError::corrupt("coupons", e))?,
            discount_value: self.discount_value,
            maximum_discount: self.maximum_discount,
            minimum_amount: self.minimum_amount,
            usage_limit: self.usage_limit,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CouponUsageRow {
    id: Uuid,
    user_id: Uuid,
    coupon_code: String,
    times_used: i32,
}

impl PgTx {
    async fn fetch_coupon(&mut self, sql: &str, arg: &str) -> StoreResult<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>(sql)
            .bind(arg)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(CouponRow::into_domain)
            .transpose()
    }
}

#[async_trait]
impl CouponRepository for PgTx {
    async fn coupon(&mut self, id: Uuid) -> StoreResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1");
        sqlx::query_as::<_, CouponRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(CouponRow::into_domain)
            .transpose()
    }

    async fn coupon_by_code(&mut self, code: &str) -> StoreResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1");
        self.fetch_coupon(&sql, code).await
    }

    async fn coupon_by_name(&mut self, name: &str) -> StoreResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE name = $1");
        self.fetch_coupon(&sql, name).await
    }

    async fn save_coupon(&mut self, coupon: &Coupon) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO coupons (id, name, code, discount_type, discount_value, maximum_discount, minimum_amount, \
             usage_limit, starts_at, expires_at, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, code = EXCLUDED.code, \
             discount_type = EXCLUDED.discount_type, discount_value = EXCLUDED.discount_value, \
             maximum_discount = EXCLUDED.maximum_discount, minimum_amount = EXCLUDED.minimum_amount, \
             usage_limit = EXCLUDED.usage_limit, starts_at = EXCLUDED.starts_at, expires_at = EXCLUDED.expires_at, \
             is_active = EXCLUDED.is_active, updated_at = EXCLUDED.updated_at",
        )
        .bind(coupon.id)
        .bind(coupon.name.as_str())
        .bind(&coupon.code)
        .bind(coupon.discount_kind.as_str())
        .bind(coupon.discount_value)
        .bind(coupon.maximum_discount)
        .bind(coupon.minimum_amount)
        .bind(coupon.usage_limit)
        .bind(coupon.starts_at)
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error("coupon"))?;
        Ok(())
    }

    async fn delete_coupon(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn coupon_usage_for_update(&mut self, user_id: Uuid, code: &str) -> StoreResult<Option<CouponUsage>> {
        let row = sqlx::query_as::<_, CouponUsageRow>(
            "SELECT id, user_id, coupon_code, times_used FROM coupon_usages \
             WHERE user_id = $1 AND coupon_code = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| CouponUsage { id: r.id, user_id: r.user_id, coupon_code: r.coupon_code, times_used: r.times_used }))
    }

    async fn save_coupon_usage(&mut self, usage: &CouponUsage) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO coupon_usages (id, user_id, coupon_code, times_used) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET times_used = EXCLUDED.times_used",
        )
        .bind(usage.id)
        .bind(usage.user_id)
        .bind(&usage.coupon_code)
        .bind(usage.times_used)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error("coupon usage"))?;
        Ok(())
    }
}
