//! # Reporting Repository
//!
//! Read-only aggregates for the dashboard.
//!
//! ## Figures
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total_stock_units   SUM(products.stock)                               │
//! │  total_revenue_cents SUM(sales.total_cents), all time, pre-tax         │
//! │  sales_today         sales since local 00:00 of `now`                  │
//! │  sales_last_7_days   sales since now - 7 days (rolling)                │
//! │  top_products        SUM(quantity) per snapshot name, top 5            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Top products group by the name on the sale line, so products removed
//! from the catalog still count.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use sqlx::SqlitePool;

use crate::error::DbResult;
use factura_core::{DashboardSummary, TopProduct};

const TOP_PRODUCTS_LIMIT: i64 = 5;

/// Time boundaries for one dashboard computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub day_start: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
}

impl ReportWindow {
    /// "Today" starts at midnight in `offset`, the store's timezone.
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local_midnight = now
            .with_timezone(&offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let utc_offset = Duration::seconds(i64::from(offset.local_minus_utc()));

        ReportWindow {
            day_start: (local_midnight - utc_offset).and_utc(),
            week_start: now - Duration::days(7),
        }
    }

    pub fn now(offset: FixedOffset) -> Self {
        Self::at(Utc::now(), offset)
    }
}

#[derive(Debug, Clone)]
pub struct ReportingRepository {
    pool: SqlitePool,
}

impl ReportingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportingRepository { pool }
    }

    /// Computes the dashboard. Empty stores produce zeros.
    pub async fn dashboard(&self, window: ReportWindow) -> DbResult<DashboardSummary> {
        let total_stock_units: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(stock), 0) FROM products")
                .fetch_one(&self.pool)
                .await?;

        let total_revenue_cents: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_cents), 0) FROM sales")
                .fetch_one(&self.pool)
                .await?;

        let sales_today = self.count_sales_since(window.day_start).await?;
        let sales_last_7_days = self.count_sales_since(window.week_start).await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT product_name_snapshot AS name, SUM(quantity) AS quantity_sold
            FROM sale_lines
            GROUP BY product_name_snapshot
            ORDER BY quantity_sold DESC, name
            LIMIT ?1
            "#,
        )
        .bind(TOP_PRODUCTS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardSummary {
            total_stock_units,
            total_revenue_cents,
            sales_today,
            sales_last_7_days,
            top_products,
        })
    }

    async fn count_sales_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE created_at >= ?1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use factura_core::{CustomerDraft, LineRequest, NewProduct};

    fn draft() -> CustomerDraft {
        CustomerDraft {
            name: "Cliente".to_string(),
            email: "cliente@example.com".to_string(),
            national_id: None,
        }
    }

    async fn backdate(db: &Database, sale_id: i64, at: DateTime<Utc>) {
        sqlx::query("UPDATE sales SET created_at = ?2 WHERE id = ?1")
            .bind(sale_id)
            .bind(at)
            .execute(db.pool())
            .await
            .unwrap();
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_window_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        let window = ReportWindow::at(now, utc());

        assert_eq!(window.day_start, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(window.week_start, Utc.with_ymd_and_hms(2026, 3, 3, 15, 30, 0).unwrap());
    }

    #[test]
    fn test_day_starts_at_local_midnight() {
        // 01:30 UTC on the 10th is 22:30 on the 9th three hours west
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 1, 30, 0).unwrap();
        let west = ReportWindow::at(now, FixedOffset::west_opt(3 * 3600).unwrap());
        assert_eq!(west.day_start, Utc.with_ymd_and_hms(2026, 3, 9, 3, 0, 0).unwrap());

        // 22:00 UTC on the 10th is already the 11th five and a half hours east
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap();
        let east = ReportWindow::at(now, FixedOffset::east_opt(5 * 3600 + 1800).unwrap());
        assert_eq!(east.day_start, Utc.with_ymd_and_hms(2026, 3, 10, 18, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_sales_today_follows_local_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mate = db
            .products()
            .insert(&NewProduct { name: "Mate".into(), price_cents: 1000, stock: 10 })
            .await
            .unwrap();
        let late = db.sales().register(&draft(), &[LineRequest::new(mate.id, 1)]).await.unwrap();

        // 23:00 local on the 9th, already the 10th in UTC
        let west = FixedOffset::west_opt(3 * 3600).unwrap();
        backdate(&db, late.sale.id, Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap()).await;
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

        let local = db.reports().dashboard(ReportWindow::at(now, west)).await.unwrap();
        let by_utc = db.reports().dashboard(ReportWindow::at(now, utc())).await.unwrap();
        assert_eq!(local.sales_today, 0);
        assert_eq!(by_utc.sales_today, 1);
    }

    #[tokio::test]
    async fn test_empty_dashboard_is_zeroed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let summary = db.reports().dashboard(ReportWindow::now(utc())).await.unwrap();

        assert_eq!(summary, DashboardSummary::default());
    }

    #[tokio::test]
    async fn test_dashboard_figures() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let products = db.products();
        let mate = products
            .insert(&NewProduct { name: "Mate".into(), price_cents: 1000, stock: 10 })
            .await
            .unwrap();
        let bombilla = products
            .insert(&NewProduct { name: "Bombilla".into(), price_cents: 300, stock: 10 })
            .await
            .unwrap();

        let sales = db.sales();
        let today = sales
            .register(&draft(), &[LineRequest::new(mate.id, 2), LineRequest::new(bombilla.id, 1)])
            .await
            .unwrap();
        let three_days_ago = sales
            .register(&draft(), &[LineRequest::new(bombilla.id, 4)])
            .await
            .unwrap();
        let last_month = sales
            .register(&draft(), &[LineRequest::new(mate.id, 1)])
            .await
            .unwrap();

        let now = Utc::now();
        backdate(&db, three_days_ago.sale.id, now - Duration::days(3)).await;
        backdate(&db, last_month.sale.id, now - Duration::days(30)).await;

        // deleted products keep counting under their snapshot name
        products.delete(bombilla.id).await.unwrap();

        let summary = db.reports().dashboard(ReportWindow::at(now, utc())).await.unwrap();

        assert_eq!(summary.total_stock_units, 7);
        assert_eq!(
            summary.total_revenue_cents,
            today.sale.total_cents + three_days_ago.sale.total_cents + last_month.sale.total_cents
        );
        assert_eq!(summary.total_revenue_cents, 2300 + 1200 + 1000);
        assert_eq!(summary.sales_last_7_days, 2);
        assert!(summary.sales_today >= 1);
        assert_eq!(
            summary.top_products,
            vec![
                TopProduct { name: "Bombilla".into(), quantity_sold: 5 },
                TopProduct { name: "Mate".into(), quantity_sold: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_top_products_limited_to_five() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut lines = Vec::new();
        for i in 0..7 {
            let p = db
                .products()
                .insert(&NewProduct { name: format!("P{}", i), price_cents: 100, stock: 50 })
                .await
                .unwrap();
            lines.push(LineRequest::new(p.id, i + 1));
        }
        db.sales().register(&draft(), &lines).await.unwrap();

        let summary = db.reports().dashboard(ReportWindow::now(utc())).await.unwrap();
        assert_eq!(summary.top_products.len(), 5);
        assert_eq!(summary.top_products[0].name, "P6");
        assert_eq!(summary.top_products[0].quantity_sold, 7);
    }
}
