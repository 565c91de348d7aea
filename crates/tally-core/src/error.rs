//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError         - Domain outcomes (stock, category, user rules) │
//! │  ├── ValidationError   - One field failed one rule                     │
//! │  └── ValidationErrors  - Every field failure found in one input        │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError           - Store failures, wraps CoreError               │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError          - Status + stable code + message                │
//! │                                                                         │
//! │  Flow: ValidationErrors → CoreError → DbError → ApiError → Client      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, field name, etc.)
//! 3. Errors are enum variants, never String
//! 4. Domain outcomes are expected results, never retried

use std::fmt;

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain outcomes that reject an operation.
///
/// None of these are faults: they describe a request the current state of the
/// inventory cannot honour, and callers surface them unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Applying the change would leave a negative quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// PATCH /products/7/quantity { quantityChange: -15, reasonCode: "sale" }
    ///      │
    ///      ▼
    /// Locked read: quantity = 10
    ///      │
    ///      ▼
    /// 10 + (-15) = -5 < 0
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 7, available: 10, requested: -15 }
    ///      │
    ///      ▼
    /// 400 INSUFFICIENT_STOCK, nothing written
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested change {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// A product points at a category that does not exist.
    #[error("Category {0} does not exist")]
    InvalidCategory(i64),

    /// The category still owns live products.
    #[error("Category {category_id} is used by {live_products} product(s)")]
    CategoryInUse {
        category_id: i64,
        live_products: i64,
    },

    /// The user is referenced by audit rows and cannot be removed.
    #[error("User {0} has recorded stock changes and cannot be deleted")]
    UserHasHistory(String),

    /// Input failed one or more field rules.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(ValidationErrors::from(err))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The field is not accepted in this request.
    #[error("{field} is not an accepted field")]
    Unknown { field: String },
}

impl ValidationError {
    /// Name of the offending field, as the client sent it.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustBeNonZero { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Unknown { field } => field,
        }
    }
}

// =============================================================================
// Validation Errors (collected)
// =============================================================================

/// Every field failure found while checking one input.
///
/// ## Usage
/// ```rust
/// use tally_core::validation::{validate_price_cents, validate_product_name};
/// use tally_core::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.check(validate_product_name(""));
/// errors.check(validate_price_cents(0));
///
/// assert_eq!(errors.len(), 2);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    /// Records a failure.
    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    /// Records the failure carried by `result`, if any.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push(err);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
