//! Role policy.
//!
//! Every protected handler starts with one `authorize` call naming what it
//! is about to do. The mapping from role to capability lives only here.
//!
//! ```text
//! ┌──────────────────┬───────┬──────┐
//! │ Capability       │ admin │ user │
//! ├──────────────────┼───────┼──────┤
//! │ ReadInventory    │   ✓   │  ✓   │
//! │ ViewReports      │   ✓   │  ✓   │
//! │ ManageInventory  │   ✓   │      │
//! │ AdjustStock      │   ✓   │      │
//! │ ManageUsers      │   ✓   │      │
//! └──────────────────┴───────┴──────┘
//! ```

use tally_core::Role;

use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// List and read products, categories and their audit trails
    ReadInventory,
    /// Create, update and delete products and categories
    ManageInventory,
    /// Post quantity adjustments through the ledger
    AdjustStock,
    ManageUsers,
    ViewReports,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadInventory => "read_inventory",
            Capability::ManageInventory => "manage_inventory",
            Capability::AdjustStock => "adjust_stock",
            Capability::ManageUsers => "manage_users",
            Capability::ViewReports => "view_reports",
        }
    }
}

pub fn allows(role: Role, capability: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::User => matches!(
            capability,
            Capability::ReadInventory | Capability::ViewReports
        ),
    }
}

/// `Ok(())` when the caller's role grants `capability`, otherwise 403.
pub fn authorize(user: &AuthUser, capability: Capability) -> Result<(), ApiError> {
    if allows(user.role, capability) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.id,
            role = %user.role,
            capability = capability.as_str(),
            "Capability denied"
        );
        Err(ApiError::forbidden(format!(
            "Role '{}' may not {}",
            user.role,
            capability.as_str().replace('_', " ")
        )))
    }
}
