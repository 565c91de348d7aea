//! # tally-core: Pure Domain Logic for Tally
//!
//! This crate holds every inventory rule that can be expressed without I/O:
//! entity types, reason codes, ledger arithmetic, money and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP API (apps/api, axum)                       │   │
//! │  │    validate ──► authorize ──► repository / ledger call          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ReasonCode │  │   rules   │  │   │
//! │  │   │  Category │  │           │  │ apply_... │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │      PostgreSQL queries, migrations, repositories, ledger tx    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, Category, User, audit rows) and inputs
//! - [`ledger`] - Reason codes and the quantity arithmetic behind every stock change
//! - [`money`] - Integer-cent Money for stock valuation (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules and the [`Validate`](validation::Validate) trait
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::ledger::apply_change;
//!
//! // 10 on hand, sell 3
//! let change = apply_change(1, 10, -3).unwrap();
//! assert_eq!(change.new_quantity, 7);
//!
//! // Selling 15 would go negative
//! assert!(apply_change(1, 10, -15).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use ledger::{AdjustQuantity, AdjustmentOutcome, QuantityChange, ReasonCode, ValidatedAdjustment};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Low-stock threshold applied when a product is created without one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Maximum length of the free-text reason attached to a quantity adjustment.
pub const MAX_REASON_DESCRIPTION_LEN: usize = 500;

/// Page size used by list endpoints when the caller does not pass one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Hard ceiling on page size.
///
/// ## Business Reason
/// Keeps a single list request from pulling the whole catalogue into memory.
pub const MAX_PAGE_SIZE: u32 = 100;
