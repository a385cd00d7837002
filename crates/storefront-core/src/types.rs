//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │     Ticket      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  id (UUID)      │   │  code (unique)  │       │
//! │  │  name           │   │  user_id        │──►│  purchaser_id   │       │
//! │  │  price_cents    │   │  items: Vec<    │   │  amount_cents   │       │
//! │  │  stock          │   │   CartLineItem> │   │  purchased_at   │       │
//! │  │  available      │   └─────────────────┘   │  items: Vec<    │       │
//! │  └─────────────────┘                         │   TicketItem>   │       │
//! │                                              └─────────────────┘       │
//! │                                                                         │
//! │  Checkout results: PurchaseOutcome { ticket?, unfulfilled[] }          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A [`TicketItem`] freezes the product name and unit price observed at
//! decrement time, so a ticket stays auditable after the catalog changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::checkout::Fulfilment;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Product
// =============================================================================

/// A catalog product as seen by the Inventory Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price in cents. Never negative.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Catalog availability flag. Unavailable products are never sold.
    pub available: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Bumped on every stock mutation.
    pub version: i64,
}

impl Product {
    /// Creates a new available product with a generated id.
    pub fn new(name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            price_cents,
            stock,
            available: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether a decrement of `quantity` would currently succeed.
    ///
    /// Informational only: checkout never trusts this and always goes
    /// through the ledger's atomic decrement.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.available && self.stock >= quantity
    }
}

/// Result of an atomic conditional decrement.
///
/// `product` is the snapshot observed by the same atomic statement: after
/// the decrement when `applied`, untouched otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub applied: bool,
    pub remaining_stock: i64,
    pub product: Product,
}

// =============================================================================
// Cart
// =============================================================================

/// A (product, quantity) pair inside a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineItem {
    pub product_id: String,
    /// Requested quantity, always >= 1.
    pub quantity: i64,
}

impl CartLineItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLineItem {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A user's shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product increases quantity)
/// - Quantity is always >= 1
/// - At most [`MAX_CART_ITEMS`] lines, each at most [`MAX_ITEM_QUANTITY`]
/// - Items keep insertion order; checkout walks them in this order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub id: String,
    /// Owning user identity (opaque, from the auth collaborator).
    pub user_id: String,
    pub items: Vec<CartLineItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a product to the cart or increases quantity if already present.
    ///
    /// Quantity validation (positive) is the caller's job; this enforces the
    /// merge rule and the size limits.
    pub fn add_item(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            let merged = item.quantity + quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = merged;
            self.updated_at = Utc::now();
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(CartLineItem::new(product_id, quantity));
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Overwrites the cart contents (used after a purchase attempt).
    pub fn replace_items(&mut self, items: Vec<CartLineItem>) {
        self.items = items;
        self.updated_at = Utc::now();
    }

    /// Returns the line for `product_id`, if any.
    pub fn line(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A cart line joined with the product it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineView {
    pub product_id: String,
    pub quantity: i64,
    /// `None` when the product no longer exists in the catalog.
    pub product: Option<Product>,
}

impl CartLineView {
    /// Display line total at the current catalog price.
    pub fn line_total(&self) -> Option<Money> {
        self.product
            .as_ref()
            .and_then(|p| p.price().checked_multiply_quantity(self.quantity))
    }
}

/// Read-through view of a cart for display.
///
/// Prices here are informational; the ticket amount is computed from the
/// snapshots taken during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartView {
    pub cart_id: String,
    pub user_id: String,
    pub lines: Vec<CartLineView>,
    /// Sum of resolved line totals, in cents.
    pub subtotal_cents: i64,
}

impl CartView {
    /// Builds a view from a cart and one resolved snapshot per line.
    ///
    /// `snapshots` must be in the same order as `cart.items`; missing
    /// trailing snapshots are treated as unresolved.
    pub fn assemble(cart: &Cart, snapshots: Vec<Option<Product>>) -> Self {
        let mut snapshots = snapshots.into_iter();
        let lines: Vec<CartLineView> = cart
            .items
            .iter()
            .map(|item| CartLineView {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                product: snapshots.next().flatten(),
            })
            .collect();

        // Saturates at i64::MAX instead of wrapping.
        let subtotal = Money::checked_sum(lines.iter().filter_map(CartLineView::line_total))
            .unwrap_or(Money::from_cents(i64::MAX));

        CartView {
            cart_id: cart.id.clone(),
            user_id: cart.user_id.clone(),
            lines,
            subtotal_cents: subtotal.cents(),
        }
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// A frozen line of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TicketItem {
    pub product_id: String,
    /// Product name at time of purchase (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of purchase (frozen).
    pub unit_price_cents: i64,
    /// Fulfilled quantity.
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
}

impl TicketItem {
    /// Freezes `product` at the given fulfilled quantity.
    ///
    /// Fails when unit price × quantity does not fit in `i64`.
    pub fn from_product(product: &Product, quantity: i64) -> CoreResult<Self> {
        let line_total = product
            .price()
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| amount_overflow("line_total_cents"))?;

        Ok(TicketItem {
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            line_total_cents: line_total.cents(),
        })
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// An immutable record of a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ticket {
    /// Globally unique code, usable as an external reference number.
    pub code: String,
    /// Cart the purchase was made from.
    pub cart_id: String,
    /// Purchasing user identity.
    pub purchaser_id: String,
    /// Total in cents, equal to the sum of `items` line totals.
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub purchased_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<TicketItem>,
}

impl Ticket {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Sum of the frozen line totals, `None` on overflow.
    pub fn lines_total(&self) -> Option<Money> {
        Money::checked_sum(self.items.iter().map(TicketItem::line_total))
    }

    /// True when the amount matches its lines exactly.
    pub fn is_balanced(&self) -> bool {
        self.lines_total() == Some(self.amount())
    }
}

/// Error for an amount that does not fit in `i64` cents.
pub(crate) fn amount_overflow(field: &str) -> CoreError {
    CoreError::from(ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

// =============================================================================
// Purchase Outcome
// =============================================================================

/// Why a line could not be fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UnfulfilledReason {
    /// Stock was lower than the requested quantity.
    InsufficientStock,
    /// The product exists but its availability flag is off.
    ProductUnavailable,
    /// The product no longer exists in the catalog.
    ProductMissing,
    /// The decrement did not answer within the storage timeout.
    TimedOut,
}

/// A line that stays in the cart after a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UnfulfilledItem {
    pub product_id: String,
    /// Originally requested quantity.
    pub requested: i64,
    /// Stock observed when the line failed.
    pub available_stock: i64,
    pub reason: UnfulfilledReason,
}

impl UnfulfilledItem {
    /// The cart line this item goes back to.
    pub fn to_line_item(&self) -> CartLineItem {
        CartLineItem::new(self.product_id.clone(), self.requested)
    }
}

/// What a purchase attempt produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOutcome {
    pub cart_id: String,
    pub fulfilment: Fulfilment,
    /// Issued only when at least one line was fulfilled.
    pub ticket: Option<Ticket>,
    pub unfulfilled: Vec<UnfulfilledItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price_cents: i64, stock: i64) -> Product {
        Product::new(name, price_cents, stock)
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new("user-1");
        cart.add_item("p1", 2).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line("p1").map(|l| l.quantity), Some(2));
    }

    #[test]
    fn test_cart_add_same_product_increases_quantity() {
        let mut cart = Cart::new("user-1");
        cart.add_item("p1", 2).unwrap();
        cart.add_item("p1", 3).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.line("p1").map(|l| l.quantity), Some(5));
    }

    #[test]
    fn test_cart_keeps_insertion_order() {
        let mut cart = Cart::new("user-1");
        cart.add_item("b", 1).unwrap();
        cart.add_item("a", 1).unwrap();
        cart.add_item("b", 1).unwrap();

        let ids: Vec<&str> = cart.items.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_cart_rejects_merged_quantity_over_max() {
        let mut cart = Cart::new("user-1");
        cart.add_item("p1", MAX_ITEM_QUANTITY).unwrap();

        let err = cart.add_item("p1", 1).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { requested: 1000, .. }));
        assert_eq!(cart.line("p1").map(|l| l.quantity), Some(MAX_ITEM_QUANTITY));
    }

    #[test]
    fn test_cart_rejects_too_many_lines() {
        let mut cart = Cart::new("user-1");
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&format!("p{i}"), 1).unwrap();
        }

        let err = cart.add_item("one-more", 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));

        // Merging into an existing line is still allowed at the limit.
        cart.add_item("p0", 1).unwrap();
    }

    #[test]
    fn test_product_can_fulfill() {
        let mut p = product("Widget", 1000, 5);
        assert!(p.can_fulfill(5));
        assert!(!p.can_fulfill(6));

        p.available = false;
        assert!(!p.can_fulfill(1));
    }

    #[test]
    fn test_ticket_item_freezes_price() {
        let p = product("Widget", 1000, 5);
        let item = TicketItem::from_product(&p, 2).unwrap();

        assert_eq!(item.unit_price_cents, 1000);
        assert_eq!(item.line_total_cents, 2000);
        assert_eq!(item.name_snapshot, "Widget");
    }

    #[test]
    fn test_ticket_item_rejects_overflowing_line_total() {
        let p = product("Yacht", i64::MAX / 2, 10);
        let err = TicketItem::from_product(&p, 3).unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "line_total_cents"
        ));
    }

    #[test]
    fn test_cart_view_subtotal_skips_missing_products() {
        let a = product("A", 1000, 5);
        let mut cart = Cart::new("user-1");
        cart.add_item(&a.id, 2).unwrap();
        cart.add_item("gone", 4).unwrap();

        let view = CartView::assemble(&cart, vec![Some(a.clone()), None]);

        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.subtotal_cents, 2000);
        assert!(view.lines[1].product.is_none());
        assert_eq!(view.lines[1].quantity, 4);
    }

    #[test]
    fn test_unfulfilled_item_serializes_camel_case() {
        let item = UnfulfilledItem {
            product_id: "p".to_string(),
            requested: 3,
            available_stock: 1,
            reason: UnfulfilledReason::InsufficientStock,
        };
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["productId"], "p");
        assert_eq!(json["requested"], 3);
        assert_eq!(json["availableStock"], 1);
        assert_eq!(json["reason"], "insufficient_stock");
    }
}
