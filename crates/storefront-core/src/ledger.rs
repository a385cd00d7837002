//! # Storage Contracts
//!
//! The three stores the checkout engine talks to. Implementations live
//! outside this crate (SQLite in `storefront-db`, in-memory in
//! `storefront-checkout`); this module only states what each must
//! guarantee.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Who Implements What                               │
//! │                                                                         │
//! │  Contract          SQLite (storefront-db)       Memory (checkout)       │
//! │  ───────────────   ─────────────────────────    ─────────────────────   │
//! │  InventoryLedger   ProductRepository            MemoryInventory         │
//! │  CartStore         CartRepository               MemoryCarts             │
//! │  TicketLedger      TicketRepository             MemoryTickets           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All errors use the [`CoreError`](crate::CoreError) taxonomy.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{Cart, CartLineItem, Product, StockDecrement, Ticket};

/// Authoritative stock counts.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Fails `NotFound` if the product is absent.
    async fn get_product(&self, product_id: &str) -> CoreResult<Product>;

    /// Atomically decrements `quantity` units if (and only if) the product
    /// is available and has at least that much stock.
    ///
    /// The check and the write are one indivisible step: two concurrent
    /// callers competing for the last unit never both see `applied`.
    /// Fails `NotFound` if the product is absent.
    async fn try_decrement(&self, product_id: &str, quantity: i64) -> CoreResult<StockDecrement>;

    /// Atomically adds `quantity` units back. Returns the new stock.
    async fn restock(&self, product_id: &str, quantity: i64) -> CoreResult<i64>;
}

/// One cart per user, mutated atomically per cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart, creating an empty one if none exists.
    async fn get_or_create_cart(&self, user_id: &str) -> CoreResult<Cart>;

    /// Fails `NotFound` if the cart is absent.
    async fn get_cart(&self, cart_id: &str) -> CoreResult<Cart>;

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// Fails `NotFound` if the cart or the product do not resolve, and
    /// with an `InvalidArgument` kind for quantities or cart sizes over the
    /// limits.
    async fn add_line_item(&self, cart_id: &str, product_id: &str, quantity: i64) -> CoreResult<Cart>;

    /// Overwrites the cart contents, keeping the given order.
    async fn replace_line_items(&self, cart_id: &str, items: &[CartLineItem]) -> CoreResult<()>;
}

/// Append-only purchase records.
#[async_trait]
pub trait TicketLedger: Send + Sync {
    /// Appends `ticket`. Fails `Conflict` if its code already exists.
    async fn issue(&self, ticket: &Ticket) -> CoreResult<Ticket>;

    /// Fails `NotFound` if no ticket has this code.
    async fn get(&self, code: &str) -> CoreResult<Ticket>;

    /// Tickets bought by `purchaser_id`, newest first.
    async fn list_for_purchaser(&self, purchaser_id: &str) -> CoreResult<Vec<Ticket>>;
}
