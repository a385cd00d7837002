//! # storefront-api: Request-Facing Facade
//!
//! Wires configuration, the SQLite ledgers and the checkout engine into the
//! operations the request layer calls.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Request Flow                                    │
//! │                                                                         │
//! │  request layer (auth already done)                                     │
//! │       │                                                                 │
//! │       │  RequestContext { user_id, request_id }                        │
//! │       ▼                                                                 │
//! │  Storefront::purchase(&ctx, cart_id)                                   │
//! │       │  1. validate ids                                               │
//! │       │  2. cart must belong to ctx.user_id (else NotFound)            │
//! │       │  3. CheckoutEngine::purchase                                   │
//! │       ▼                                                                 │
//! │  Result<PurchaseOutcome, ApiError>   (both serde-serializable)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`] - `StoreConfig` from TOML and environment
//! - [`context`] - Per-request identity and tracing span
//! - [`error`] - `ApiError` mapping for callers
//! - [`service`] - The `Storefront` facade

pub mod config;
pub mod context;
pub mod error;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use context::RequestContext;
pub use error::{ApiError, ErrorCode};
pub use service::{SqliteStorefront, Storefront};

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Verbose logging
/// - `RUST_LOG=info` - Normal logging (default)
/// - `RUST_LOG=storefront=trace` - Trace only storefront crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}
