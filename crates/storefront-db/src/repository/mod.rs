//! # Repository Module
//!
//! SQLite implementations of the storefront ledgers.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledgers Behind Repositories                          │
//! │                                                                         │
//! │  CheckoutEngine                                                        │
//! │       │                                                                 │
//! │       │  inventory.try_decrement(product_id, 2)                        │
//! │       ▼                                                                 │
//! │  ProductRepository  (impl InventoryLedger)                             │
//! │  ├── get_product / try_decrement / restock                             │
//! │  └── insert / list_available / set_available / count (catalog)         │
//! │                                                                         │
//! │  CartRepository     (impl CartStore)                                   │
//! │  ├── get_or_create_cart / get_cart                                     │
//! │  └── add_line_item / replace_line_items                                │
//! │                                                                         │
//! │  TicketRepository   (impl TicketLedger)                                │
//! │  └── issue / get / list_for_purchaser                                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Trait methods return `CoreError`; inherent helpers return `DbError`
//! and are converted at the trait boundary.

pub mod cart;
pub mod product;
pub mod ticket;
