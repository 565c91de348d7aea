//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.products().find_all(&filter, page)                          │
//! │       ▼                                                                 │
//! │  ProductRepository ── CategoryRepository ── UserRepository ...         │
//! │       │                                                                 │
//! │       │  SQL (one statement or one transaction per call)                │
//! │       ▼                                                                 │
//! │  PostgreSQL                                                             │
//! │                                                                         │
//! │  Rules:                                                                 │
//! │  • Only QuantityLedger writes products.quantity                        │
//! │  • Each call is its own unit of work; nothing spans two calls          │
//! │  • Reads never see soft-deleted products unless asked to               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue CRUD, filters, soft delete
//! - [`CategoryRepository`](category::CategoryRepository) - Categories with guarded delete
//! - [`UserRepository`](user::UserRepository) - Accounts
//! - [`RefreshTokenRepository`](token::RefreshTokenRepository) - Token persistence and rotation
//! - [`QuantityLedger`](ledger::QuantityLedger) - Atomic stock adjustments
//! - [`ReportRepository`](report::ReportRepository) - Aggregates and audit trails

pub mod category;
pub mod ledger;
pub mod product;
pub mod report;
pub mod token;
pub mod user;

/// Escapes `%`, `_` and `\` so user text matches literally inside `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
