//! # Category Repository
//!
//! Categories and the live-product counts shown next to them.
//!
//! ## Guarded Delete
//! ```text
//! BEGIN
//!   SELECT 1 FROM categories WHERE id = $1 FOR UPDATE
//!        └── no row → NotFound
//!   COUNT live products in the category
//!        └── > 0 → CategoryInUse (rollback)
//!   DELETE FROM categories WHERE id = $1
//!        └── soft-deleted products get category_id = NULL
//! COMMIT
//! ```
//! A product insert or re-categorisation has to take a key-share lock on the
//! category row for its foreign key check, so none can slip in between the
//! count and the delete.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use tally_core::validation::Validate;
use tally_core::{Category, CategorySummary, CoreError, NewCategory, UpdateCategory};

const SUMMARY_SELECT: &str = r#"
    SELECT
        c.id,
        c.name,
        c.description,
        c.created_at,
        c.updated_at,
        (SELECT COUNT(*) FROM products p
          WHERE p.category_id = c.id AND p.deleted_at IS NULL) AS product_count
    FROM categories c
"#;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a category. Duplicate names are `UniqueViolation { field: "name" }`.
    pub async fn create(&self, input: NewCategory) -> DbResult<Category> {
        input.validate()?;

        let name = input.name.trim().to_string();
        let description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let now = Utc::now();

        debug!(name = %name, "Inserting category");

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&name)
        .bind(&description)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&name))?;

        Ok(category)
    }

    /// Gets a category with its live product count.
    pub async fn find_by_id(&self, id: i64) -> DbResult<CategorySummary> {
        let sql = format!("{SUMMARY_SELECT} WHERE c.id = $1");

        sqlx::query_as::<_, CategorySummary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// All categories in name order, each with its live product count.
    pub async fn find_all(&self) -> DbResult<Vec<CategorySummary>> {
        let sql = format!("{SUMMARY_SELECT} ORDER BY c.name ASC");

        let categories = sqlx::query_as::<_, CategorySummary>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }

    /// Partial update; an empty description clears it.
    pub async fn update(&self, id: i64, input: UpdateCategory) -> DbResult<CategorySummary> {
        input.validate()?;

        let name = input.name.as_deref().map(str::trim);
        let description = input.description.as_deref().map(str::trim);

        debug!(id, "Updating category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 IS NULL THEN description WHEN $3 = '' THEN NULL ELSE $3 END,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(name.unwrap_or_default()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        self.find_by_id(id).await
    }

    /// Deletes a category that no live product references.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(CategoryInUse))` - live products still point here
    /// * `Err(DbError::NotFound)` - no such category
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(DbError::not_found("Category", id));
        }

        let live_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE category_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if live_products > 0 {
            debug!(id, live_products, "Category still in use");
            return Err(CoreError::CategoryInUse {
                category_id: id,
                live_products,
            }
            .into());
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tally_core::NewProduct;

    fn category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            description: Some("Things".to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let Some(db) = testing::database().await else {
            return;
        };
        db.categories().create(category("Tools")).await.unwrap();

        let err = db.categories().create(category("Tools")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn test_counts_only_live_products() {
        let Some(db) = testing::database().await else {
            return;
        };
        let tools = db.categories().create(category("Tools")).await.unwrap();

        for sku in ["T-1", "T-2"] {
            db.products()
                .create(NewProduct {
                    name: format!("Tool {sku}"),
                    sku: Some(sku.to_string()),
                    category_id: tools.id,
                    price_cents: 500,
                    low_stock_threshold: None,
                    description: None,
                    is_active: None,
                })
                .await
                .unwrap();
        }
        let first = db.products().find_all(&Default::default(), Default::default()).await.unwrap();
        db.products().soft_delete(first.items[0].id).await.unwrap();

        let summary = db.categories().find_by_id(tools.id).await.unwrap();
        assert_eq!(summary.product_count, 1);
        assert_eq!(db.categories().find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let Some(db) = testing::database().await else {
            return;
        };
        let tools = db.categories().create(category("Tools")).await.unwrap();

        let updated = db
            .categories()
            .update(
                tools.id,
                UpdateCategory {
                    name: Some("Hand Tools".to_string()),
                    description: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category.name, "Hand Tools");
        assert_eq!(updated.category.description, None);

        assert!(matches!(
            db.categories().delete(4242).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
