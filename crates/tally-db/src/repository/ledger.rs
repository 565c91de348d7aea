//! # Quantity Ledger
//!
//! The only code path that changes `products.quantity`.
//!
//! ## One Adjustment, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AdjustQuantity ──validate()──► ValidatedAdjustment     (no store I/O)  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │  1. SELECT quantity FROM products                                       │
//! │       WHERE id = $1 AND deleted_at IS NULL FOR UPDATE                   │
//! │       └── row lock on this product only, reads the locked quantity      │
//! │       └── no row → NotFound                                             │
//! │  2. apply_change(current, delta)                                        │
//! │       └── negative → InsufficientStock (rollback, nothing written)      │
//! │  3. UPDATE products SET quantity = new, updated_at = now                │
//! │  4. INSERT product_transactions                                         │
//! │  5. INSERT quantity_history                                             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any `?` between BEGIN and COMMIT drops the transaction: rollback.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Step 1 locks exactly one row. A second adjustment of the same product
//! blocks on that lock (up to `lock_timeout`) and then reads the committed
//! quantity; there is no read-then-upgrade window, so no adjustment is ever
//! computed from a stale value. Adjustments of other products take other
//! row locks and run in parallel.
//!
//! The ledger does not retry. A `Busy` or `PoolExhausted` failure is
//! returned to the caller with nothing written.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use tally_core::ledger::apply_change;
use tally_core::{AdjustQuantity, AdjustmentOutcome, CoreError, ValidatedAdjustment};

/// Row lock taken before the quantity is read.
pub const LOCK_PRODUCT: &str =
    "SELECT quantity FROM products WHERE id = $1 AND deleted_at IS NULL FOR UPDATE";

/// Applies quantity adjustments and writes both audit rows atomically.
#[derive(Debug, Clone)]
pub struct QuantityLedger {
    pool: PgPool,
}

impl QuantityLedger {
    pub fn new(pool: PgPool) -> Self {
        QuantityLedger { pool }
    }

    /// Adjusts a product's quantity by a signed delta.
    ///
    /// ## Returns
    /// * `Ok(AdjustmentOutcome)` - committed; carries the new quantity
    /// * `Err(DbError::Domain(Validation))` - request rejected before any I/O
    /// * `Err(DbError::NotFound)` - product missing/soft-deleted, or actor unknown
    /// * `Err(DbError::Domain(InsufficientStock))` - result would be negative
    /// * `Err(DbError::Busy)` - row lock not granted within `lock_timeout`
    /// * `Err(DbError::PoolExhausted)` - no connection available, nothing written
    ///
    /// ## Example
    /// ```rust,ignore
    /// let outcome = db.ledger().adjust_quantity(AdjustQuantity {
    ///     product_id: 7,
    ///     quantity_change: -3,
    ///     reason_code: "sale".to_string(),
    ///     reason_description: None,
    ///     actor_id: user.id.clone(),
    /// }).await?;
    /// ```
    pub async fn adjust_quantity(&self, request: AdjustQuantity) -> DbResult<AdjustmentOutcome> {
        let adjustment = request.validate()?;

        match self.apply(&adjustment).await {
            Ok(outcome) => {
                info!(
                    product_id = outcome.product_id,
                    previous = outcome.previous_quantity,
                    new = outcome.new_quantity,
                    change = adjustment.quantity_change,
                    reason = %adjustment.reason_code,
                    actor = %adjustment.actor_id,
                    transaction_id = outcome.transaction_id,
                    "Quantity adjusted"
                );
                Ok(outcome)
            }
            Err(err @ DbError::Domain(CoreError::InsufficientStock { .. })) => {
                debug!(product_id = adjustment.product_id, error = %err, "Adjustment rejected");
                Err(err)
            }
            Err(err) => {
                warn!(product_id = adjustment.product_id, error = %err, "Adjustment failed");
                Err(err)
            }
        }
    }

    async fn apply(&self, adjustment: &ValidatedAdjustment) -> DbResult<AdjustmentOutcome> {
        let product_id = adjustment.product_id;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Internal(msg) => DbError::TransactionFailed(msg),
                other => other,
            })?;

        // 1. lock + read
        let current: Option<i64> = sqlx::query_scalar(LOCK_PRODUCT)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

        let current = current.ok_or_else(|| DbError::not_found("Product", product_id))?;

        // 2. rule
        let change = apply_change(product_id, current, adjustment.quantity_change)?;

        let now = Utc::now();

        // 3. write
        sqlx::query("UPDATE products SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(product_id)
            .bind(change.new_quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        // 4. ledger row
        let transaction_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO product_transactions (
                product_id, quantity_change, reason_code, reason_description,
                previous_quantity, new_quantity, created_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(product_id)
        .bind(change.quantity_change)
        .bind(adjustment.reason_code)
        .bind(adjustment.reason_description.as_deref())
        .bind(change.previous_quantity)
        .bind(change.new_quantity)
        .bind(&adjustment.actor_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| actor_error(e, &adjustment.actor_id))?;

        // 5. history row
        sqlx::query(
            r#"
            INSERT INTO quantity_history (
                product_id, user_id, quantity_change, reason,
                previous_quantity, new_quantity, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product_id)
        .bind(&adjustment.actor_id)
        .bind(change.quantity_change)
        .bind(adjustment.reason_code.as_str())
        .bind(change.previous_quantity)
        .bind(change.new_quantity)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| actor_error(e, &adjustment.actor_id))?;

        tx.commit()
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Internal(msg) => DbError::TransactionFailed(msg),
                other => other,
            })?;

        Ok(AdjustmentOutcome {
            product_id,
            previous_quantity: change.previous_quantity,
            new_quantity: change.new_quantity,
            transaction_id,
        })
    }
}

/// The audit inserts only reference the product (already locked) and the
/// actor, so a foreign key failure here means the actor does not exist.
fn actor_error(err: sqlx::Error, actor_id: &str) -> DbError {
    match DbError::from(err) {
        DbError::ForeignKeyViolation { .. } => DbError::not_found("User", actor_id),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, Database};
    use tally_core::{NewCategory, NewProduct, NewUser, Role};

    async fn setup() -> Option<(Database, i64, String)> {
        let db = testing::database().await?;
        let category = db
            .categories()
            .create(NewCategory {
                name: "Stock".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let product = db
            .products()
            .create(NewProduct {
                name: "Bolt".to_string(),
                sku: None,
                category_id: category.id,
                price_cents: 10,
                low_stock_threshold: Some(2),
                description: None,
                is_active: None,
            })
            .await
            .unwrap();
        let user = db
            .users()
            .create(NewUser {
                first_name: "Ops".to_string(),
                last_name: "Admin".to_string(),
                email: "ops@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        Some((db, product.id, user.id))
    }

    fn adjust(product_id: i64, delta: i64, code: &str, actor: &str) -> AdjustQuantity {
        AdjustQuantity {
            product_id,
            quantity_change: delta,
            reason_code: code.to_string(),
            reason_description: None,
            actor_id: actor.to_string(),
        }
    }

    #[tokio::test]
    async fn test_adjust_returns_committed_quantity() {
        let Some((db, product_id, actor)) = setup().await else {
            return;
        };

        let outcome = db
            .ledger()
            .adjust_quantity(adjust(product_id, 12, "purchase", &actor))
            .await
            .unwrap();

        assert_eq!(outcome.previous_quantity, 0);
        assert_eq!(outcome.new_quantity, 12);
        assert!(outcome.transaction_id > 0);
    }

    #[tokio::test]
    async fn test_unknown_actor_is_not_found_and_rolls_back() {
        let Some((db, product_id, _)) = setup().await else {
            return;
        };

        let err = db
            .ledger()
            .adjust_quantity(adjust(product_id, 5, "purchase", "ghost"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "User"));
        let product = db.products().find_by_id(product_id, false).await.unwrap();
        assert_eq!(product.quantity, 0);
    }

    #[tokio::test]
    async fn test_invalid_request_never_touches_store() {
        let Some((db, _, actor)) = setup().await else {
            return;
        };

        // product 9999 does not exist, but validation fails first
        let err = db
            .ledger()
            .adjust_quantity(adjust(9999, 0, "transfer", &actor))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::Validation(ref e)) if e.len() == 2));
    }
}
