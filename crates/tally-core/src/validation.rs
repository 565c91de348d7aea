//! # Validation Module
//!
//! Field rules for every write input Tally accepts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (apps/api extractors)                         │
//! │  ├── Types must match (no string → number coercion)                     │
//! │  └── Unknown fields rejected (id, quantity, createdAt, ...)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Per-field rules, every failure collected                           │
//! │  └── Validate trait on input types                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (PostgreSQL)                                         │
//! │  ├── CHECK (quantity >= 0, price_cents > 0), reason_code enum type      │
//! │  ├── UNIQUE (sku, category name, email)                                 │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors are the camelCase names the client sent.
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_sku, validate_price_cents};
//!
//! validate_sku("COKE-330").unwrap();
//! assert!(validate_price_cents(0).is_err());
//! ```

use crate::error::{ValidationError, ValidationErrors};
use crate::types::{NewCategory, NewProduct, ProductFilter, UpdateCategory, UpdateProduct};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_SKU_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_SEARCH_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// Validate Trait
// =============================================================================

/// Input types that can check themselves before reaching the store.
pub trait Validate {
    /// Returns every field failure, or `Ok(())`.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// All-digit SKUs such as `"00123"` are valid and stay strings.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("00123").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    required_text("sku", sku, MAX_SKU_LEN)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates an optional free-text description.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

/// Validates a first or last name.
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    required_text(field, name, 100)
}

/// Validates an email address and returns it normalised to lower case.
///
/// ## Rules
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
/// - No whitespace, at most 254 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_email;
///
/// assert_eq!(validate_email(" Ada@Example.COM ").unwrap(), "ada@example.com");
/// assert!(validate_email("ada@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    required_text("email", email, MAX_EMAIL_LEN)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    match domain.find('.') {
        Some(dot) if dot > 0 && !domain.ends_with('.') => Ok(email.to_lowercase()),
        _ => Err(invalid()),
    }
}

/// Validates a plaintext password before hashing: 8 to 128 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: MAX_PASSWORD_LEN,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query, or `None` when it is blank.
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok((!query.is_empty()).then(|| query.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents.
///
/// ## Rules
/// - Must be strictly positive; products are never free
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_err());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "priceCents".to_string(),
        });
    }

    Ok(())
}

/// Validates a low-stock threshold: zero or more.
pub fn validate_low_stock_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 0 {
        return Err(ValidationError::OutOfRange {
            field: "lowStockThreshold".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a referenced row id.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Input Types
// =============================================================================

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(validate_product_name(&self.name));
        if let Some(sku) = &self.sku {
            errors.check(validate_sku(sku));
        }
        errors.check(validate_id("categoryId", self.category_id));
        errors.check(validate_price_cents(self.price_cents));
        if let Some(threshold) = self.low_stock_threshold {
            errors.check(validate_low_stock_threshold(threshold));
        }
        if let Some(description) = &self.description {
            errors.check(validate_description(description));
        }

        errors.into_result()
    }
}

impl Validate for UpdateProduct {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name {
            errors.check(validate_product_name(name));
        }
        // empty clears the SKU
        if let Some(sku) = self.sku.as_deref().filter(|s| !s.is_empty()) {
            errors.check(validate_sku(sku));
        }
        if let Some(category_id) = self.category_id {
            errors.check(validate_id("categoryId", category_id));
        }
        if let Some(price) = self.price_cents {
            errors.check(validate_price_cents(price));
        }
        if let Some(threshold) = self.low_stock_threshold {
            errors.check(validate_low_stock_threshold(threshold));
        }
        if let Some(description) = &self.description {
            errors.check(validate_description(description));
        }

        errors.into_result()
    }
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(validate_category_name(&self.name));
        if let Some(description) = &self.description {
            errors.check(validate_description(description));
        }

        errors.into_result()
    }
}

impl Validate for UpdateCategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name {
            errors.check(validate_category_name(name));
        }
        if let Some(description) = &self.description {
            errors.check(validate_description(description));
        }

        errors.into_result()
    }
}

impl Validate for ProductFilter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(search) = &self.search {
            errors.check(validate_search_query(search));
        }
        if let Some(category_id) = self.category_id {
            errors.check(validate_id("categoryId", category_id));
        }
        if let Some(min) = self.min_price_cents {
            if min < 0 {
                errors.push(ValidationError::OutOfRange {
                    field: "minPriceCents".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min_price_cents, self.max_price_cents) {
            if max < min {
                errors.push(ValidationError::OutOfRange {
                    field: "maxPriceCents".to_string(),
                    min,
                    max: i64::MAX,
                });
            }
        }

        errors.into_result()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
