//! Sales figures for the admin dashboard.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::store::Store;
use crate::{EcommerceError, Result};

pub const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Yearly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Yearly => "yearly",
        }
    }

    /// `[from, to)` window in UTC containing `now`. Weeks start on Monday.
    pub fn window(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let (start, end) = match self {
            Self::Daily => (today, today.succ_opt()?),
            Self::Weekly => {
                let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (monday, monday + Duration::days(7))
            }
            Self::Yearly => (
                chrono::NaiveDate::from_yo_opt(today.year(), 1)?,
                chrono::NaiveDate::from_yo_opt(today.year() + 1, 1)?,
            ),
        };
        Some((start.and_time(NaiveTime::MIN).and_utc(), end.and_time(NaiveTime::MIN).and_utc()))
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ReportPeriod {
    type Err = EcommerceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EcommerceError::validation(format!(
                "invalid report period '{other}', expected daily, weekly or yearly"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrderCounts {
    pub total: usize,
    pub pending: usize,
    pub placed: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
    pub returned: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SalesAmounts {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub final_price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct SalesReport {
    pub period: ReportPeriod,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub orders: OrderCounts,
    pub amounts: SalesAmounts,
    pub total_sales: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub units_sold: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedCategory {
    pub category_id: Uuid,
    pub category_name: String,
    pub units_sold: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TopSelling {
    pub products: Vec<RankedProduct>,
    pub categories: Vec<RankedCategory>,
}

fn summarize(orders: &[Order]) -> (OrderCounts, SalesAmounts) {
    let mut counts = OrderCounts { total: orders.len(), ..Default::default() };
    let mut amounts = SalesAmounts::default();
    for order in orders {
        let slot = match order.status {
            OrderStatus::Pending => &mut counts.pending,
            OrderStatus::Placed => &mut counts.placed,
            OrderStatus::Shipped => &mut counts.shipped,
            OrderStatus::Delivered => &mut counts.delivered,
            OrderStatus::Cancelled => &mut counts.cancelled,
            OrderStatus::Returned => &mut counts.returned,
        };
        *slot += 1;
        amounts.subtotal += order.subtotal;
        amounts.discount += order.discount;
        amounts.shipping += order.shipping;
        amounts.final_price += order.final_price;
    }
    (counts, amounts)
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn Store>,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn sales_report(&self, period: ReportPeriod) -> Result<SalesReport> {
        self.sales_report_at(period, Utc::now()).await
    }

    pub async fn sales_report_at(&self, period: ReportPeriod, now: DateTime<Utc>) -> Result<SalesReport> {
        let (from, to) = period
            .window(now)
            .ok_or_else(|| EcommerceError::validation(format!("no {period} window around {now}")))?;

        let mut tx = self.store.begin().await?;
        let orders = tx.orders_between(from, to).await?;
        let (orders, amounts) = summarize(&orders);
        let total_sales = amounts.final_price;
        Ok(SalesReport { period, from, to, orders, amounts, total_sales })
    }

    /// Products and categories ranked by units sold in open order lines.
    pub async fn top_selling(&self, limit: usize) -> Result<TopSelling> {
        let mut tx = self.store.begin().await?;

        let mut by_product: HashMap<Uuid, RankedProduct> = HashMap::new();
        for item in tx.sold_items().await? {
            by_product
                .entry(item.product_id)
                .or_insert_with(|| RankedProduct {
                    product_id: item.product_id, product_name: item.product_name.clone(), units_sold: 0,
                })
                .units_sold += i64::from(item.quantity);
        }

        let mut by_category: HashMap<Uuid, RankedCategory> = HashMap::new();
        for ranked in by_product.values() {
            let Some(product) = tx.product(ranked.product_id).await? else { continue };
            let Some(category) = tx.category(product.category_id).await? else { continue };
            by_category
                .entry(category.id)
                .or_insert_with(|| RankedCategory { category_id: category.id, category_name: category.name, units_sold: 0 })
                .units_sold += ranked.units_sold;
        }

        let mut products: Vec<_> = by_product.into_values().collect();
        products.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then_with(|| a.product_name.cmp(&b.product_name)));
        products.truncate(limit);

        let mut categories: Vec<_> = by_category.into_values().collect();
        categories.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then_with(|| a.category_name.cmp(&b.category_name)));
        categories.truncate(limit);

        Ok(TopSelling { products, categories })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, Category, NewProduct, OrderAddress, PaymentMethod, Product};
    use crate::domain::pricing::OrderTotals;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap() }

    #[test]
    fn test_windows() {
        // A Thursday.
        let now = at(2024, 3, 14, 15);
        assert_eq!(ReportPeriod::Daily.window(now), Some((at(2024, 3, 14, 0), at(2024, 3, 15, 0))));
        assert_eq!(ReportPeriod::Weekly.window(now), Some((at(2024, 3, 11, 0), at(2024, 3, 18, 0))));
        assert_eq!(ReportPeriod::Yearly.window(now), Some((at(2024, 1, 1, 0), at(2025, 1, 1, 0))));
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("weekly".parse::<ReportPeriod>().unwrap(), ReportPeriod::Weekly);
        assert!(matches!("monthly".parse::<ReportPeriod>(), Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_report_and_ranking() {
        let store = Arc::new(MemoryStore::new());
        let category = Category::create("Books", None);
        let novel = Product::create(NewProduct {
            name: "Novel".into(), price: Decimal::new(250, 0), quantity: 20, category_id: category.id,
            ..Default::default()
        });
        let atlas = Product::create(NewProduct {
            name: "Atlas".into(), price: Decimal::new(700, 0), quantity: 20, category_id: category.id,
            ..Default::default()
        });

        let mut cart = Cart::for_user(Uuid::now_v7());
        for _ in 0..3 {
            cart.add_product(&novel, novel.price).unwrap();
        }
        cart.add_product(&atlas, atlas.price).unwrap();
        let totals = OrderTotals::compute(cart.subtotal(), Decimal::ZERO);
        let kept = Order::place(cart.user_id, OrderAddress::default(), &cart, totals, PaymentMethod::Wallet, None).unwrap();
        let mut cancelled = Order::place(cart.user_id, OrderAddress::default(), &cart, totals, PaymentMethod::Wallet, None).unwrap();
        cancelled.cancel().unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.save_category(&category).await.unwrap();
        tx.save_product(&novel).await.unwrap();
        tx.save_product(&atlas).await.unwrap();
        tx.save_order(&kept).await.unwrap();
        tx.save_order(&cancelled).await.unwrap();
        tx.commit().await.unwrap();

        let reports = ReportService::new(store);
        let report = reports.sales_report(ReportPeriod::Daily).await.unwrap();
        assert_eq!(report.orders.total, 2);
        assert_eq!((report.orders.placed, report.orders.cancelled), (1, 1));
        // 1450 + 30 shipping, twice.
        assert_eq!(report.total_sales, Decimal::new(2960, 0));

        let top = reports.top_selling(DEFAULT_TOP_LIMIT).await.unwrap();
        assert_eq!(top.products[0].product_name, "Novel");
        assert_eq!(top.products[0].units_sold, 3);
        assert_eq!(top.products[1].units_sold, 1);
        assert_eq!(top.categories[0].units_sold, 4);

        let top = reports.top_selling(1).await.unwrap();
        assert_eq!(top.products.len(), 1);
    }
}
