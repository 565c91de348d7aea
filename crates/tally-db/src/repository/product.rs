//! # Product Repository
//!
//! Catalogue operations for products.
//!
//! ## Key Operations
//! - Create / partial update / soft delete
//! - Filtered, paginated listing
//! - Low-stock lookup
//!
//! Quantity is never written here. New rows start at zero and every later
//! change goes through [`QuantityLedger`](super::ledger::QuantityLedger).
//!
//! ## List Query Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SELECT <columns> FROM products p LEFT JOIN categories c ...            │
//! │  WHERE 1 = 1                                                            │
//! │    [AND p.deleted_at IS NULL]          unless include_deleted           │
//! │    [AND p.category_id = $n]                                             │
//! │    [AND (p.name ILIKE $n OR p.description ILIKE $n)]                    │
//! │    [AND p.is_active = $n]                                               │
//! │    [AND p.price_cents >= $n] [AND p.price_cents <= $n]                  │
//! │    [AND <stock status predicate>]                                       │
//! │  ORDER BY p.created_at DESC, p.id DESC                                  │
//! │  LIMIT $n OFFSET $n                                                     │
//! │                                                                         │
//! │  The same WHERE clause feeds SELECT COUNT(*) for the page total.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::like_pattern;
use crate::error::{DbError, DbResult};
use tally_core::validation::Validate;
use tally_core::{
    CoreError, NewProduct, Page, Paginated, Product, ProductFilter, StockStatus, UpdateProduct,
    DEFAULT_LOW_STOCK_THRESHOLD,
};

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    p.id,
    p.name,
    p.sku,
    p.category_id,
    c.name AS category_name,
    p.quantity,
    p.price_cents,
    p.low_stock_threshold,
    p.description,
    p.is_active,
    p.deleted_at,
    p.created_at,
    p.updated_at
"#;

pub(crate) const PRODUCT_FROM: &str =
    "FROM products p LEFT JOIN categories c ON c.id = p.category_id";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.create(new_product).await?;
/// let page = repo.find_all(&ProductFilter::default(), Page::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: PgPool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product with quantity 0.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product, category name joined
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::Domain(InvalidCategory))` - Category doesn't exist
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let name = input.name.trim().to_string();
        let sku = non_blank(input.sku);
        let description = non_blank(input.description);
        let threshold = input
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);

        debug!(name = %name, sku = ?sku, category_id = input.category_id, "Inserting product");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                name, sku, category_id, quantity, price_cents,
                low_stock_threshold, description, is_active,
                created_at, updated_at
            ) VALUES ($1, $2, $3, 0, $4, $5, $6, $7, $8, $8)
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(&sku)
        .bind(input.category_id)
        .bind(input.price_cents)
        .bind(threshold)
        .bind(&description)
        .bind(input.is_active.unwrap_or(true))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, sku.as_deref(), input.category_id))?;

        self.find_by_id(id, false).await
    }

    /// Gets a product by its ID.
    ///
    /// Soft-deleted products are `NotFound` unless `include_deleted` is set.
    pub async fn find_by_id(&self, id: i64, include_deleted: bool) -> DbResult<Product> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} WHERE p.id = $1 AND ($2 OR p.deleted_at IS NULL)"
        );

        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists products matching every set filter, newest first.
    pub async fn find_all(&self, filter: &ProductFilter, page: Page) -> DbResult<Paginated<Product>> {
        filter.validate()?;

        debug!(?filter, page = page.page, limit = page.limit, "Listing products");

        let mut count_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) {PRODUCT_FROM} WHERE 1 = 1"
        ));
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} WHERE 1 = 1"
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = items.len(), total, "Products listed");
        Ok(Paginated::new(items, page, total))
    }

    /// Applies a partial update in one statement.
    ///
    /// Absent fields keep their value; an empty `sku` or `description` clears
    /// it. Quantity is not a column this statement can reach.
    pub async fn update(&self, id: i64, input: UpdateProduct) -> DbResult<Product> {
        input.validate()?;

        if input.is_empty() {
            return self.find_by_id(id, false).await;
        }

        debug!(id, "Updating product");

        let name = input.name.as_deref().map(str::trim);
        let sku = input.sku.as_deref().map(str::trim);

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                sku = CASE WHEN $3 IS NULL THEN sku WHEN $3 = '' THEN NULL ELSE $3 END,
                category_id = COALESCE($4, category_id),
                price_cents = COALESCE($5, price_cents),
                low_stock_threshold = COALESCE($6, low_stock_threshold),
                description = CASE WHEN $7 IS NULL THEN description WHEN $7 = '' THEN NULL ELSE $7 END,
                is_active = COALESCE($8, is_active),
                updated_at = $9
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(sku)
        .bind(input.category_id)
        .bind(input.price_cents)
        .bind(input.low_stock_threshold)
        .bind(input.description.as_deref())
        .bind(input.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, sku, input.category_id.unwrap_or_default()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.find_by_id(id, false).await
    }

    /// Soft-deletes a product by stamping `deleted_at`.
    ///
    /// ## Why Soft Delete?
    /// Ledger and history rows keep referencing the product. Deleting an
    /// already-deleted product is `NotFound`.
    pub async fn soft_delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting product");

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE products SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Live products below their threshold, emptiest first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM}
            WHERE p.deleted_at IS NULL AND p.quantity < p.low_stock_threshold
            ORDER BY p.quantity ASC, p.name ASC
            LIMIT $1
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts live products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Appends the WHERE predicates for `filter`.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if !filter.include_deleted {
        query.push(" AND p.deleted_at IS NULL");
    }

    if let Some(category_id) = filter.category_id {
        query.push(" AND p.category_id = ").push_bind(category_id);
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.description ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(is_active) = filter.is_active {
        query.push(" AND p.is_active = ").push_bind(is_active);
    }

    if let Some(min) = filter.min_price_cents {
        query.push(" AND p.price_cents >= ").push_bind(min);
    }

    if let Some(max) = filter.max_price_cents {
        query.push(" AND p.price_cents <= ").push_bind(max);
    }

    match filter.stock_status {
        Some(StockStatus::InStock) => {
            query.push(" AND p.quantity > 0");
        }
        Some(StockStatus::OutOfStock) => {
            query.push(" AND p.quantity = 0");
        }
        Some(StockStatus::LowStock) => {
            query.push(" AND p.quantity < p.low_stock_threshold");
        }
        None => {}
    }
}

/// Maps a failed product write: SKU collision or unknown category.
fn write_error(err: sqlx::Error, sku: Option<&str>, category_id: i64) -> DbError {
    match DbError::from(err) {
        DbError::ForeignKeyViolation { .. } => CoreError::InvalidCategory(category_id).into(),
        other => other.with_value(sku.unwrap_or_default()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
