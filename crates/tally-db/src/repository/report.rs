//! # Report Repository
//!
//! Read-only aggregates over committed data. Every query runs on its own
//! pooled connection and sees the last committed state; no report takes a
//! row lock, so reads never wait on an in-flight adjustment.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{DbError, DbResult};
use tally_core::{
    CategoryBreakdown, InventorySummary, Page, Paginated, ProductTransaction, QuantityHistoryEntry,
    ReasonSummary,
};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        ReportRepository { pool }
    }

    /// Whole-catalogue figures over live products.
    pub async fn inventory_summary(&self) -> DbResult<InventorySummary> {
        let summary = sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT
                COUNT(*)                                                   AS total_products,
                COUNT(*) FILTER (WHERE is_active)                          AS active_products,
                COALESCE(SUM(quantity), 0)::BIGINT                         AS total_units,
                COALESCE(SUM(quantity * price_cents), 0)::BIGINT           AS total_value_cents,
                COUNT(*) FILTER (WHERE quantity < low_stock_threshold)     AS low_stock_count,
                COUNT(*) FILTER (WHERE quantity = 0)                       AS out_of_stock_count
            FROM products
            WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Per-category figures, including empty categories.
    pub async fn category_breakdown(&self) -> DbResult<Vec<CategoryBreakdown>> {
        let rows = sqlx::query_as::<_, CategoryBreakdown>(
            r#"
            SELECT
                c.id                                         AS category_id,
                c.name                                       AS category_name,
                COUNT(p.id)                                  AS product_count,
                COALESCE(SUM(p.quantity), 0)::BIGINT                 AS total_units,
                COALESCE(SUM(p.quantity * p.price_cents), 0)::BIGINT AS total_value_cents
            FROM categories c
            LEFT JOIN products p
                   ON p.category_id = c.id AND p.deleted_at IS NULL
            GROUP BY c.id, c.name
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Ledger movement per reason code in `[from, to)`.
    pub async fn transaction_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ReasonSummary>> {
        let rows = sqlx::query_as::<_, ReasonSummary>(
            r#"
            SELECT
                reason_code,
                COUNT(*)                                                                       AS entries,
                SUM(quantity_change)::BIGINT                                                   AS net_change,
                COALESCE(SUM(quantity_change) FILTER (WHERE quantity_change > 0), 0)::BIGINT   AS units_in,
                COALESCE(-SUM(quantity_change) FILTER (WHERE quantity_change < 0), 0)::BIGINT  AS units_out
            FROM product_transactions
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY reason_code
            ORDER BY reason_code::TEXT ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Ledger rows for one product, newest first.
    ///
    /// Works for soft-deleted products too; their history stays readable.
    pub async fn product_transactions(
        &self,
        product_id: i64,
        page: Page,
    ) -> DbResult<Paginated<ProductTransaction>> {
        self.ensure_product(product_id).await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_transactions WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ProductTransaction>(
            r#"
            SELECT id, product_id, quantity_change, reason_code, reason_description,
                   previous_quantity, new_quantity, created_by, created_at
            FROM product_transactions
            WHERE product_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(product_id)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(rows, page, total))
    }

    /// History rows for one product, newest first.
    pub async fn quantity_history(
        &self,
        product_id: i64,
        page: Page,
    ) -> DbResult<Paginated<QuantityHistoryEntry>> {
        self.ensure_product(product_id).await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quantity_history WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, QuantityHistoryEntry>(
            r#"
            SELECT id, product_id, user_id, quantity_change, reason,
                   previous_quantity, new_quantity, created_at
            FROM quantity_history
            WHERE product_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(product_id)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(rows, page, total))
    }

    async fn ensure_product(&self, product_id: i64) -> DbResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(())
        } else {
            Err(DbError::not_found("Product", product_id))
        }
    }
}
