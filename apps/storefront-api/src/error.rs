//! # API Error Type
//!
//! Unified error type returned by the [`Storefront`](crate::Storefront)
//! facade.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow                                           │
//! │                                                                         │
//! │  DbError ──────────┐                                                    │
//! │                    ▼                                                    │
//! │  CoreError ────► ApiError { code, message, partial }                   │
//! │                    ▲                                                    │
//! │  CheckoutError ────┘  + applied decrements / issued ticket             │
//! │                                                                         │
//! │  Storage details are logged here and replaced by a generic message.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! This is what the request layer receives when a call fails:
//! ```json
//! {
//!   "code": "PURCHASE_ABORTED",
//!   "message": "Purchase aborted during ticket issue",
//!   "partial": true,
//!   "applied": [{ "productId": "…", "quantity": 2 }]
//! }
//! ```
//! `partial` is false whenever nothing persisted.

use serde::Serialize;
use storefront_checkout::{AppliedDecrement, CheckoutError};
use storefront_core::{CoreError, Ticket};
use storefront_db::DbError;

/// API error returned from facade calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// True when some effect of the call persisted despite the error.
    pub partial: bool,

    /// Stock decrements that stand after an aborted purchase.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<AppliedDecrement>,

    /// Ticket that was issued although the call failed afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Cart, product or ticket not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Cart limits exceeded (422)
    CartError,

    /// Duplicate ticket code after the retry (409)
    Conflict,

    /// Storage failed or timed out, nothing persisted (503)
    Unavailable,

    /// Storage failed mid-purchase, no ticket was written
    PurchaseAborted,

    /// Ticket issued, cart still holds the purchased lines
    CartNotUpdated,
}

impl ApiError {
    /// Creates a new API error with nothing persisted.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            partial: false,
            applied: Vec::new(),
            ticket: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a transient storage error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unavailable, message)
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            CoreError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            CoreError::Conflict { entity, id } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", entity, id),
            ),
            CoreError::CartTooLarge { max } => ApiError::new(
                ErrorCode::CartError,
                format!("Cart cannot have more than {} items", max),
            ),
            CoreError::QuantityTooLarge { requested, max } => ApiError::new(
                ErrorCode::CartError,
                format!("Quantity {} exceeds maximum allowed ({})", requested, max),
            ),
            CoreError::Unavailable(reason) => {
                // Log the actual error but return a generic message
                tracing::error!(%reason, "Storage unavailable");
                ApiError::unavailable("Storage is temporarily unavailable")
            }
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::from(CoreError::from(err))
    }
}

/// Converts checkout failures, keeping what persisted.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let partial = err.partially_happened();
        match err {
            CheckoutError::Rejected(e) => ApiError::from(e),
            CheckoutError::Aborted {
                stage,
                applied,
                compensated,
                source,
            } => {
                tracing::error!(
                    %stage,
                    applied = applied.len(),
                    compensated,
                    error = %source,
                    "Purchase aborted"
                );
                let mut message = format!("Purchase aborted during {}", stage);
                if !applied.is_empty() {
                    if compensated {
                        message.push_str("; reserved stock was restored");
                    } else {
                        message.push_str("; reserved stock was not restored");
                    }
                }
                ApiError {
                    code: ErrorCode::PurchaseAborted,
                    message,
                    partial,
                    applied,
                    ticket: None,
                }
            }
            CheckoutError::CartNotUpdated { outcome, source } => {
                tracing::error!(
                    cart_id = %outcome.cart_id,
                    error = %source,
                    "Cart not updated after purchase"
                );
                ApiError {
                    code: ErrorCode::CartNotUpdated,
                    message: format!(
                        "Purchase completed but cart {} still lists the purchased items",
                        outcome.cart_id
                    ),
                    partial,
                    applied: Vec::new(),
                    ticket: outcome.ticket,
                }
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_checkout::AbortStage;
    use storefront_core::ValidationError;

    #[test]
    fn test_core_error_codes() {
        let err = ApiError::from(CoreError::not_found("Cart", "c1"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Cart not found: c1");
        assert!(!err.partial);

        let err = ApiError::from(CoreError::Validation(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = ApiError::from(CoreError::CartTooLarge { max: 100 });
        assert_eq!(err.code, ErrorCode::CartError);

        let err = ApiError::from(CoreError::conflict("Ticket", "T-1"));
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_unavailable_hides_details() {
        let err = ApiError::from(CoreError::unavailable("disk I/O error at /var/db"));
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(!err.message.contains("/var/db"));
    }

    #[test]
    fn test_db_error_goes_through_core_taxonomy() {
        let err = ApiError::from(DbError::not_found("Product", "p1"));
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = ApiError::from(DbError::PoolExhausted);
        assert_eq!(err.code, ErrorCode::Unavailable);
    }

    #[test]
    fn test_abort_reports_applied_decrements() {
        let err = ApiError::from(CheckoutError::Aborted {
            stage: AbortStage::IssueTicket,
            applied: vec![AppliedDecrement {
                product_id: "p1".to_string(),
                quantity: 2,
            }],
            compensated: false,
            source: CoreError::unavailable("ticket ledger down"),
        });

        assert_eq!(err.code, ErrorCode::PurchaseAborted);
        assert!(err.partial);
        assert_eq!(err.applied.len(), 1);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "PURCHASE_ABORTED");
        assert_eq!(json["partial"], true);
        assert_eq!(json["applied"][0]["productId"], "p1");
        assert!(json.get("ticket").is_none());
    }

    #[test]
    fn test_compensated_abort_is_not_partial() {
        let err = ApiError::from(CheckoutError::Aborted {
            stage: AbortStage::IssueTicket,
            applied: vec![AppliedDecrement {
                product_id: "p1".to_string(),
                quantity: 1,
            }],
            compensated: true,
            source: CoreError::unavailable("ticket ledger down"),
        });

        assert!(!err.partial);
        assert!(err.message.contains("restored"));
    }

    #[test]
    fn test_rejection_serializes_without_extras() {
        let err = ApiError::from(CheckoutError::Rejected(CoreError::not_found("Cart", "c1")));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["partial"], false);
        assert!(json.get("applied").is_none());
    }
}
