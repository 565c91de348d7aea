//! # tally-db: Database Layer for Tally
//!
//! This crate provides database access for the Tally inventory service.
//! It uses PostgreSQL with sqlx for async operations and owns every
//! transaction boundary in the system, including the Quantity Ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (PATCH /api/products/:id/quantity)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ Product        │    │              │  │   │
//! │  │   │ PgPool        │◄───│ Category, User │    │ 001_initial  │  │   │
//! │  │   │ lock_timeout  │    │ RefreshToken   │    │              │  │   │
//! │  │   │ search_path   │    │ QuantityLedger │    │              │  │   │
//! │  │   │               │    │ Report         │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL (row locks per product)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("postgres://localhost/tally")).await?;
//!
//! let product = db.products().create(new_product).await?;
//! let outcome = db.ledger().adjust_quantity(adjustment).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::category::CategoryRepository;
pub use repository::ledger::QuantityLedger;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::token::RefreshTokenRepository;
pub use repository::user::UserRepository;
