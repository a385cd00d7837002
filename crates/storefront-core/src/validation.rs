//! # Validation Module
//!
//! Input validation run before any storage call.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: storefront-api facade                                        │
//! │  └── THIS MODULE: ids, quantities, catalog fields                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart merge rules (types::Cart / CartRepository)              │
//! │  └── per-line and per-cart limits                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── PRIMARY KEY / FOREIGN KEY constraints                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything rejected here is an `InvalidArgument`: nothing was mutated.

use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::Product;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted user identity.
const MAX_USER_ID_LEN: usize = 128;

/// Longest accepted product name.
const MAX_PRODUCT_NAME_LEN: usize = 200;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an entity id (cart, product): must be a UUID.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_entity_id;
///
/// assert!(validate_entity_id("cart_id", "67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
/// assert!(validate_entity_id("cart_id", "not-a-uuid").is_err());
/// assert!(validate_entity_id("cart_id", "").is_err());
/// ```
pub fn validate_entity_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Uuid::parse_str(id).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Validates an opaque user identity handed over by the auth layer.
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    let user_id = user_id.trim();

    if user_id.is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }

    if user_id.len() > MAX_USER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "user_id".to_string(),
            max: MAX_USER_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a ticket code: non-empty, ASCII alphanumerics and hyphens.
pub fn validate_ticket_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, digits, and hyphens".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-3).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog unit price (cents): zero is allowed, negatives are
/// not, and the price may not exceed [`MAX_PRICE_CENTS`].
pub fn validate_price_cents(price_cents: i64) -> ValidationResult<()> {
    if price_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price_cents".to_string(),
        });
    }

    if price_cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price_cents".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock count.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates every catalog field of a product before it is stored.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_entity_id("product_id", &product.id)?;
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock(product.stock)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        assert!(validate_entity_id("product_id", &Uuid::new_v4().to_string()).is_ok());
        assert!(matches!(
            validate_entity_id("product_id", "   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_entity_id("product_id", "abc"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_user_id() {
        assert!(validate_user_id("user-42").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"u".repeat(129)).is_err());
    }

    #[test]
    fn test_ticket_code() {
        assert!(validate_ticket_code("20261019-ABCDEF0123").is_ok());
        assert!(validate_ticket_code("").is_err());
        assert!(validate_ticket_code("abc; DROP TABLE").is_err());
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(MAX_ITEM_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_catalog_fields() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents(MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_product_name("Widget").is_ok());
        assert!(validate_product_name("  ").is_err());
    }

    #[test]
    fn test_validate_product() {
        assert!(validate_product(&Product::new("Widget", 999, 3)).is_ok());
        assert!(validate_product(&Product::new(" ", 999, 3)).is_err());
        assert!(validate_product(&Product::new("Widget", -1, 3)).is_err());
        assert!(validate_product(&Product::new("Widget", i64::MAX / 2, 3)).is_err());
        assert!(validate_product(&Product::new("Widget", 999, -3)).is_err());
    }
}
