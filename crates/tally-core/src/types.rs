//! # Domain Types
//!
//! Entities, write inputs, list filters and report rows used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│     Product     │──►│ProductTransaction│      │
//! │  │  ─────────────  │   │  ─────────────  │   │  (ledger row)    │      │
//! │  │  id (i64)       │   │  id (i64)       │   └─────────────────┘       │
//! │  │  name (unique)  │   │  sku (unique?)  │   ┌─────────────────┐       │
//! │  └─────────────────┘   │  quantity >= 0  │──►│ QuantityHistory │       │
//! │                        │  price_cents    │   │  (report row)   │       │
//! │                        │  deleted_at?    │   └─────────────────┘       │
//! │                        └─────────────────┘            │                │
//! │                        ┌─────────────────┐            │ created_by     │
//! │                        │      User       │◄───────────┘                │
//! │                        │  id (UUID)      │                             │
//! │                        │  role           │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Field Mapping
//! Column names are snake_case and match the Rust field names one to one
//! (`sqlx::FromRow`). JSON is camelCase via `serde(rename_all)`. Values are
//! never reinterpreted on the way through: an all-digit SKU stays a string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::ledger::ReasonCode;
use crate::money::Money;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Role
// =============================================================================

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full write access: catalogue, stock, users.
    Admin,
    /// Read-only access to catalogue, stock and reports.
    User,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".to_string(), "user".to_string()],
            }),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product grouping. Names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A category together with the number of live products that reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub category: Category,
    pub product_count: i64,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a category. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCategory {
    #[serde(default)]
    pub name: Option<String>,
    /// An empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `quantity` is never negative and is only changed by the quantity ledger.
/// `deleted_at` marks a soft-deleted product, hidden from every read that
/// does not ask for deleted rows explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    /// Always set on live products; nulled when a category is removed after
    /// its products were soft-deleted.
    pub category_id: Option<i64>,
    /// Joined from `categories` on read.
    pub category_name: Option<String>,
    pub quantity: i64,
    pub price_cents: i64,
    pub low_stock_threshold: i64,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Strictly below the threshold counts as low stock.
    pub fn is_low_stock(&self) -> bool {
        self.quantity < self.low_stock_threshold
    }

    pub fn stock_status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::OutOfStock
        } else if self.is_low_stock() {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Input for creating a product.
///
/// There is no quantity field: new products start at zero and receive stock
/// through a `purchase` adjustment.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub category_id: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update of a product. Quantity is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProduct {
    #[serde(default)]
    pub name: Option<String>,
    /// An empty string clears the SKU.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    /// An empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateProduct {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.category_id.is_none()
            && self.price_cents.is_none()
            && self.low_stock_threshold.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
    }
}

/// Stock level bucket used by list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// quantity > 0
    InStock,
    /// quantity = 0
    OutOfStock,
    /// quantity < low_stock_threshold
    LowStock,
}

impl FromStr for StockStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            "low_stock" => Ok(StockStatus::LowStock),
            _ => Err(ValidationError::NotAllowed {
                field: "stockStatus".to_string(),
                allowed: vec![
                    "in_stock".to_string(),
                    "out_of_stock".to_string(),
                    "low_stock".to_string(),
                ],
            }),
        }
    }
}

/// Product list predicates. Every set field narrows the result (AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub include_deleted: bool,
}

// =============================================================================
// Audit Rows
// =============================================================================

/// Ledger entry written for every committed quantity change. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductTransaction {
    pub id: i64,
    pub product_id: i64,
    pub quantity_change: i64,
    pub reason_code: ReasonCode,
    pub reason_description: Option<String>,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    /// Id of the user who made the change.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Reporting-side record of the same change. Write-once.
///
/// `reason` holds the reason code as plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuantityHistoryEntry {
    pub id: i64,
    pub product_id: i64,
    pub user_id: String,
    pub quantity_change: i64,
    pub reason: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users & Tokens
// =============================================================================

/// An account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// UUID v4.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Input for creating a user. The password is hashed before it gets here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update of a user.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

// =============================================================================
// Pagination
// =============================================================================

/// Offset/limit window, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Builds a page from optional query values.
    ///
    /// ## Rules
    /// - `page` defaults to 1 and must be at least 1
    /// - `limit` defaults to [`DEFAULT_PAGE_SIZE`] and must be 1..=[`MAX_PAGE_SIZE`]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            });
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: MAX_PAGE_SIZE as i64,
            });
        }

        Ok(Page { page, limit })
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for Page {
    fn default() -> Self {
        Page {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination metadata returned next to list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        let limit = page.limit.max(1) as i64;
        Paginated {
            items,
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Whole-catalogue stock figures over live products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_products: i64,
    pub active_products: i64,
    pub total_units: i64,
    pub total_value_cents: Money,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}

/// Stock figures for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category_id: i64,
    pub category_name: String,
    pub product_count: i64,
    pub total_units: i64,
    pub total_value_cents: Money,
}

/// Ledger movement totals for one reason code over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReasonSummary {
    pub reason_code: ReasonCode,
    pub entries: i64,
    pub net_change: i64,
    pub units_in: i64,
    pub units_out: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
