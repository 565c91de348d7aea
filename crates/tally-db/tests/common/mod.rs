//! Shared fixtures for tally-db integration tests.

#![allow(dead_code)]

use tally_core::{
    AdjustQuantity, NewCategory, NewProduct, NewUser, Page, ProductTransaction,
    QuantityHistoryEntry, Role,
};
use tally_db::{Database, DbConfig};
use uuid::Uuid;

/// Names the Postgres database these tests write to. Unset means skip.
pub const TEST_DATABASE_URL_ENV: &str = "TALLY_TEST_DATABASE_URL";

pub struct Fixture {
    pub db: Database,
    pub actor: String,
    pub category_id: i64,
}

impl Fixture {
    /// A migrated store in a fresh schema, with one admin and one category.
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var(TEST_DATABASE_URL_ENV) else {
            eprintln!("{TEST_DATABASE_URL_ENV} not set; skipping database test");
            return None;
        };

        let config = DbConfig::new(url)
            .schema(format!("tally_test_{}", Uuid::new_v4().simple()))
            .max_connections(8);
        let db = Database::new(config).await.unwrap();
        Some(Self::seed(db).await)
    }

    async fn seed(db: Database) -> Self {
        let actor = db
            .users()
            .create(NewUser {
                first_name: "Stock".to_string(),
                last_name: "Keeper".to_string(),
                email: "keeper@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap()
            .id;

        let category_id = db
            .categories()
            .create(NewCategory {
                name: "General".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id;

        Fixture {
            db,
            actor,
            category_id,
        }
    }

    pub fn new_product(&self, sku: &str) -> NewProduct {
        NewProduct {
            name: format!("Product {sku}"),
            sku: Some(sku.to_string()),
            category_id: self.category_id,
            price_cents: 499,
            low_stock_threshold: Some(5),
            description: None,
            is_active: None,
        }
    }

    /// Creates a product and brings it to `quantity` with one purchase.
    pub async fn product_with_quantity(&self, sku: &str, quantity: i64) -> i64 {
        let product = self.db.products().create(self.new_product(sku)).await.unwrap();
        if quantity > 0 {
            self.db
                .ledger()
                .adjust_quantity(self.adjust(product.id, quantity, "purchase"))
                .await
                .unwrap();
        }
        product.id
    }

    pub fn adjust(&self, product_id: i64, delta: i64, code: &str) -> AdjustQuantity {
        AdjustQuantity {
            product_id,
            quantity_change: delta,
            reason_code: code.to_string(),
            reason_description: None,
            actor_id: self.actor.clone(),
        }
    }

    pub async fn quantity(&self, product_id: i64) -> i64 {
        self.db
            .products()
            .find_by_id(product_id, true)
            .await
            .unwrap()
            .quantity
    }

    /// Both audit trails for a product, oldest first.
    pub async fn audit(&self, product_id: i64) -> (Vec<ProductTransaction>, Vec<QuantityHistoryEntry>) {
        let page = Page::new(Some(1), Some(100)).unwrap();
        let reports = self.db.reports();

        let mut transactions = reports
            .product_transactions(product_id, page)
            .await
            .unwrap()
            .items;
        let mut history = reports.quantity_history(product_id, page).await.unwrap().items;

        transactions.reverse();
        history.reverse();
        (transactions, history)
    }
}

/// Asserts one history row per ledger row, matching field for field.
pub fn assert_paired(transactions: &[ProductTransaction], history: &[QuantityHistoryEntry]) {
    assert_eq!(transactions.len(), history.len(), "audit trails differ in length");

    for (t, h) in transactions.iter().zip(history) {
        assert_eq!(t.product_id, h.product_id);
        assert_eq!(t.quantity_change, h.quantity_change);
        assert_eq!(t.previous_quantity, h.previous_quantity);
        assert_eq!(t.new_quantity, h.new_quantity);
        assert_eq!(t.created_by, h.user_id);
        assert_eq!(t.reason_code.as_str(), h.reason);
    }
}
