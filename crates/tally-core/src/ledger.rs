//! # Quantity Ledger Rules
//!
//! The pure half of every stock change: reason codes, request checks and the
//! arithmetic that decides whether a delta may be applied.
//!
//! ## Adjustment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  AdjustQuantity (raw request)                                           │
//! │       │                                                                 │
//! │       ▼ validate()                      (this module, no I/O)           │
//! │  ValidatedAdjustment { delta != 0, ReasonCode, description, actor }     │
//! │       │                                                                 │
//! │       ▼ QuantityLedger::adjust_quantity (tally-db, one transaction)     │
//! │  lock row ──► apply_change(current, delta) ──► write + 2 audit rows     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AdjustmentOutcome { product_id, previous, new, transaction_id }        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError, ValidationErrors};
use crate::MAX_REASON_DESCRIPTION_LEN;

// =============================================================================
// Reason Codes
// =============================================================================

/// Why a quantity changed.
///
/// Stored as the `reason_code` enum type in `product_transactions.reason_code`
/// and as free text in `quantity_history.reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "reason_code", rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ReasonCode {
    /// Units sold to a customer.
    Sale,
    /// Units received from a supplier.
    Purchase,
    /// Stock count correction.
    Adjustment,
    /// Units written off.
    Damage,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 4] = [
        ReasonCode::Sale,
        ReasonCode::Purchase,
        ReasonCode::Adjustment,
        ReasonCode::Damage,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Sale => "sale",
            ReasonCode::Purchase => "purchase",
            ReasonCode::Adjustment => "adjustment",
            ReasonCode::Damage => "damage",
        }
    }

    fn allowed() -> Vec<String> {
        Self::ALL.iter().map(|code| code.as_str().to_string()).collect()
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "reasonCode".to_string(),
                allowed: Self::allowed(),
            })
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A requested stock change as it arrives from a caller.
///
/// `reason_code` is still raw text here; [`AdjustQuantity::validate`] turns it
/// into a [`ReasonCode`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustQuantity {
    pub product_id: i64,
    pub quantity_change: i64,
    pub reason_code: String,
    pub reason_description: Option<String>,
    /// Id of the authenticated user making the change.
    pub actor_id: String,
}

/// An adjustment that passed every field rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAdjustment {
    pub product_id: i64,
    pub quantity_change: i64,
    pub reason_code: ReasonCode,
    pub reason_description: Option<String>,
    pub actor_id: String,
}

impl AdjustQuantity {
    /// Checks the request without touching the store.
    ///
    /// ## Rules
    /// - `quantity_change` must not be zero
    /// - `reason_code` must be one of [`ReasonCode::ALL`]
    /// - `reason_description` at most 500 characters (blank becomes `None`)
    /// - `actor_id` must be non-empty
    ///
    /// All failures are collected, not just the first.
    pub fn validate(self) -> CoreResult<ValidatedAdjustment> {
        let mut errors = ValidationErrors::new();

        if self.quantity_change == 0 {
            errors.push(ValidationError::MustBeNonZero {
                field: "quantityChange".to_string(),
            });
        }

        let reason_code = errors.check(self.reason_code.parse::<ReasonCode>());

        let reason_description = match self.reason_description {
            Some(text) if text.trim().is_empty() => None,
            Some(text) if text.chars().count() > MAX_REASON_DESCRIPTION_LEN => {
                errors.push(ValidationError::TooLong {
                    field: "reasonDescription".to_string(),
                    max: MAX_REASON_DESCRIPTION_LEN,
                });
                None
            }
            other => other,
        };

        if self.actor_id.trim().is_empty() {
            errors.push(ValidationError::Required {
                field: "actorId".to_string(),
            });
        }

        errors.into_result()?;

        match reason_code {
            Some(reason_code) => Ok(ValidatedAdjustment {
                product_id: self.product_id,
                quantity_change: self.quantity_change,
                reason_code,
                reason_description,
                actor_id: self.actor_id,
            }),
            // unreachable: a failed parse was recorded above
            None => Err(CoreError::from(ValidationError::Required {
                field: "reasonCode".to_string(),
            })),
        }
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Quantities before and after one applied delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityChange {
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub quantity_change: i64,
}

/// Applies `delta` to the locked `current` quantity.
///
/// ## Errors
/// - [`CoreError::InsufficientStock`] when the result would be negative
/// - [`CoreError::Validation`] when the sum overflows
///
/// ## Example
/// ```rust
/// use tally_core::ledger::apply_change;
/// use tally_core::CoreError;
///
/// assert_eq!(apply_change(1, 20, -5).unwrap().new_quantity, 15);
/// assert!(matches!(
///     apply_change(1, 10, -15),
///     Err(CoreError::InsufficientStock { available: 10, requested: -15, .. })
/// ));
/// ```
pub fn apply_change(product_id: i64, current: i64, delta: i64) -> CoreResult<QuantityChange> {
    let new_quantity = current.checked_add(delta).ok_or(ValidationError::OutOfRange {
        field: "quantityChange".to_string(),
        min: i64::MIN,
        max: i64::MAX - current.max(0),
    })?;

    if new_quantity < 0 {
        return Err(CoreError::InsufficientStock {
            product_id,
            available: current,
            requested: delta,
        });
    }

    Ok(QuantityChange {
        previous_quantity: current,
        new_quantity,
        quantity_change: delta,
    })
}

// =============================================================================
// Outcome
// =============================================================================

/// What a committed adjustment reports back.
///
/// Callers that need the full product re-read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentOutcome {
    pub product_id: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    /// Id of the `product_transactions` row.
    pub transaction_id: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(delta: i64, code: &str) -> AdjustQuantity {
        AdjustQuantity {
            product_id: 1,
            quantity_change: delta,
            reason_code: code.to_string(),
            reason_description: None,
            actor_id: "user-1".to_string(),
        }
    }

    #[test]
    fn test_reason_code_parsing() {
        for code in ReasonCode::ALL {
            assert_eq!(code.as_str().parse::<ReasonCode>().unwrap(), code);
        }
        assert!("return".parse::<ReasonCode>().is_err());
        assert!("transfer".parse::<ReasonCode>().is_err());
        assert!("SALE".parse::<ReasonCode>().is_err());
    }

    #[test]
    fn test_validate_accepts_good_request() {
        let valid = request(-3, "sale").validate().unwrap();
        assert_eq!(valid.reason_code, ReasonCode::Sale);
        assert_eq!(valid.quantity_change, -3);
    }

    #[test]
    fn test_reason_code_must_match_exactly() {
        for code in [" sale", "sale ", " purchase "] {
            assert!(matches!(
                request(1, code).validate(),
                Err(CoreError::Validation(ref errors)) if errors.iter().any(|e| e.field() == "reasonCode")
            ));
        }
    }

    #[test]
    fn test_validate_collects_every_failure() {
        let mut bad = request(0, "return");
        bad.reason_description = Some("x".repeat(MAX_REASON_DESCRIPTION_LEN + 1));
        bad.actor_id = String::new();

        match bad.validate() {
            Err(CoreError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
                assert_eq!(
                    fields,
                    vec!["quantityChange", "reasonCode", "reasonDescription", "actorId"]
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_description_limit_is_inclusive() {
        let mut ok = request(1, "purchase");
        ok.reason_description = Some("x".repeat(MAX_REASON_DESCRIPTION_LEN));
        assert!(ok.validate().is_ok());

        let mut blank = request(1, "purchase");
        blank.reason_description = Some("   ".to_string());
        assert_eq!(blank.validate().unwrap().reason_description, None);
    }

    #[test]
    fn test_apply_change_to_exactly_zero() {
        let change = apply_change(4, 5, -5).unwrap();
        assert_eq!(change.previous_quantity, 5);
        assert_eq!(change.new_quantity, 0);
    }

    #[test]
    fn test_apply_change_overflow_is_validation_error() {
        assert!(matches!(
            apply_change(1, i64::MAX, 1),
            Err(CoreError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_result_never_negative(current in 0i64..10_000, delta in -20_000i64..20_000) {
            match apply_change(1, current, delta) {
                Ok(change) => {
                    prop_assert!(change.new_quantity >= 0);
                    prop_assert_eq!(change.new_quantity, current + delta);
                }
                Err(CoreError::InsufficientStock { available, requested, .. }) => {
                    prop_assert!(current + delta < 0);
                    prop_assert_eq!(available, current);
                    prop_assert_eq!(requested, delta);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
