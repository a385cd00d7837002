//! # storefront-core: Pure Business Logic for the Storefront Checkout
//!
//! This crate is the **heart** of the storefront's cart-and-checkout
//! subsystem. It holds every business rule as pure code with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              storefront-api (request facade)                    │   │
//! │  │    create_cart, add_to_cart, get_cart, purchase, get_ticket     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              storefront-checkout (purchase engine)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ledger traits                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storefront-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │  money   │ │ checkout │ │ ledger contracts │  │   │
//! │  │   │ Product  │ │  Money   │ │  Phase   │ │ InventoryLedger  │  │   │
//! │  │   │ Cart     │ │          │ │  Tally   │ │ CartStore        │  │   │
//! │  │   │ Ticket   │ │          │ │          │ │ TicketLedger     │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │          storefront-db (SQLite ledgers implement traits)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Cart, Ticket, purchase outcome)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and the error taxonomy
//! - [`validation`] - Input validation
//! - [`checkout`] - Purchase state machine and the fulfilment tally
//! - [`codes`] - Ticket code generation
//! - [`ledger`] - Storage contracts implemented by the storage crates
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//!
//! let unit_price = Money::from_cents(1000);
//! let line_total = unit_price.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line_total.cents(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod codes;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{CheckoutPhase, CheckoutTally, Fulfilment};
pub use codes::{DatedUuidCodes, TicketCodeGenerator};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use ledger::{CartStore, InventoryLedger, TicketLedger};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct line items allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps a purchase attempt's decrement loop
/// bounded.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
/// Applies to the merged quantity when the same product is added twice.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum catalog unit price in cents ($100,000,000.00).
///
/// A full cart at this price (`MAX_CART_ITEMS` lines of `MAX_ITEM_QUANTITY`)
/// still totals well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;
