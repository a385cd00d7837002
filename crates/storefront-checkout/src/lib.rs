//! # storefront-checkout: Purchase Engine
//!
//! Runs purchase attempts against any implementation of the storefront
//! ledgers.
//!
//! ## Purchase Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One Purchase Attempt                              │
//! │                                                                         │
//! │  1. CartStore::get_cart            lines in cart order                  │
//! │     InventoryLedger::get_product   snapshot per line (display only)     │
//! │                                                                         │
//! │  2. for each line:                                                      │
//! │       InventoryLedger::try_decrement(product, qty)                      │
//! │         applied   → fulfilled, total += price × qty                     │
//! │         refused   → unfulfilled (stays in cart)                         │
//! │         missing   → unfulfilled                                         │
//! │         timed out → unfulfilled                                         │
//! │                                                                         │
//! │  3. fulfilled? → TicketLedger::issue (one retry on code conflict)       │
//! │                                                                         │
//! │  4. CartStore::replace_line_items(unfulfilled)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`engine`] - [`CheckoutEngine`], options and errors
//! - [`memory`] - In-memory ledgers for tests and single-process use

pub mod engine;
pub mod memory;

pub use engine::{AbortStage, AppliedDecrement, CheckoutEngine, CheckoutError, CheckoutOptions};
pub use memory::{MemoryCarts, MemoryInventory, MemoryTickets};

/// Engine wired to the in-memory ledgers.
pub type MemoryCheckoutEngine = CheckoutEngine<MemoryInventory, MemoryCarts, MemoryTickets>;
