//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── CoreError        - The taxonomy every ledger speaks               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db errors                                                  │
//! │  └── DbError          - Database failures, converted into CoreError    │
//! │                                                                         │
//! │  storefront-checkout errors                                            │
//! │  └── CheckoutError    - Rejected / Aborted / CartNotUpdated            │
//! │                                                                         │
//! │  storefront-api errors                                                 │
//! │  └── ApiError         - What the request layer sees (serialized)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → ApiError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! Every [`CoreError`] classifies into one [`ErrorKind`]:
//!
//! | Kind              | Meaning                                   | Mutation?  |
//! |-------------------|-------------------------------------------|------------|
//! | `InvalidArgument` | bad quantity, malformed id, limits        | never      |
//! | `NotFound`        | cart / product / ticket absent            | never      |
//! | `Conflict`        | duplicate ticket code                     | never      |
//! | `Unavailable`     | storage failure or timeout                | transient  |

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before any mutation because the input was malformed.
    InvalidArgument,
    /// The referenced entity does not exist.
    NotFound,
    /// A uniqueness rule was violated (duplicate ticket code).
    Conflict,
    /// Storage is failing or timed out; retrying may succeed.
    Unavailable,
}

// =============================================================================
// Core Error
// =============================================================================

/// Errors shared by every ledger implementation and the checkout engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input validation failed (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Entity cannot be found.
    ///
    /// ## When This Occurs
    /// - Cart id doesn't exist (or belongs to another user at the API layer)
    /// - Product id doesn't exist in the catalog
    /// - Ticket code lookup misses
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness rule was violated.
    ///
    /// ## When This Occurs
    /// - A freshly generated ticket code already exists in the ledger
    #[error("{entity} '{id}' already exists")]
    Conflict { entity: String, id: String },

    /// Cart has exceeded maximum allowed distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity (after merging) exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Storage backend failed or did not answer in time.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error for a given entity type and ID.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an Unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        CoreError::Unavailable(reason.into())
    }

    /// Classifies this error into the taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_)
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. } => ErrorKind::InvalidArgument,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict { .. } => ErrorKind::Conflict,
            CoreError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Returns true for errors that guarantee nothing was mutated.
    pub fn is_rejection(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Unavailable)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any storage call runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
