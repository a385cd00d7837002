//! # Storefront Facade
//!
//! The operations exposed to the request-handling layer.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation      Ledger calls                        Returns            │
//! │  ─────────      ────────────                        ───────            │
//! │  create_cart    get_or_create_cart(ctx.user)        Cart               │
//! │  add_to_cart    get_cart → add_line_item            Cart               │
//! │  get_cart       get_cart → get_product per line     CartView           │
//! │  purchase       get_cart → CheckoutEngine           PurchaseOutcome    │
//! │  get_ticket     tickets.get(code)                   Ticket             │
//! │  list_tickets   tickets.list_for_purchaser          Vec<Ticket>        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Carts and tickets are only visible to the user they belong to. A foreign
//! id is reported as `NotFound`, the same as an unknown one.

use std::future::Future;

use storefront_checkout::CheckoutEngine;
use storefront_core::validation::{
    validate_entity_id, validate_quantity, validate_ticket_code, validate_user_id,
};
use storefront_core::{
    Cart, CartStore, CartView, CoreError, CoreResult, ErrorKind, InventoryLedger,
    PurchaseOutcome, Ticket, TicketLedger,
};
use storefront_db::{CartRepository, Database, ProductRepository, TicketRepository};
use tracing::{debug, info, Instrument};

use crate::config::StoreConfig;
use crate::context::RequestContext;
use crate::error::ApiError;

/// Facade over the checkout engine and its ledgers.
pub struct Storefront<I, C, T> {
    engine: CheckoutEngine<I, C, T>,
}

/// Storefront backed by the SQLite repositories.
pub type SqliteStorefront = Storefront<ProductRepository, CartRepository, TicketRepository>;

impl SqliteStorefront {
    /// Opens the database described by `config` and wires the engine to it.
    pub async fn open(config: &StoreConfig) -> Result<(Self, Database), ApiError> {
        let db = Database::new(config.db_config()).await?;
        let storefront = Self::from_database(&db, config);
        Ok((storefront, db))
    }

    /// Wires the engine to an already-open database.
    pub fn from_database(db: &Database, config: &StoreConfig) -> Self {
        let engine = CheckoutEngine::new(db.products(), db.carts(), db.tickets())
            .with_options(config.checkout_options());
        Storefront::new(engine)
    }
}

impl<I, C, T> Storefront<I, C, T>
where
    I: InventoryLedger,
    C: CartStore,
    T: TicketLedger,
{
    pub fn new(engine: CheckoutEngine<I, C, T>) -> Self {
        Storefront { engine }
    }

    pub fn engine(&self) -> &CheckoutEngine<I, C, T> {
        &self.engine
    }

    /// Returns the caller's cart, creating it on first access.
    pub async fn create_cart(&self, ctx: &RequestContext) -> Result<Cart, ApiError> {
        async {
            validate_user_id(ctx.user_id()).map_err(CoreError::from)?;
            let cart = self
                .guarded(self.engine.carts().get_or_create_cart(ctx.user_id()))
                .await?;
            debug!(cart_id = %cart.id, "Cart ready");
            Ok::<_, ApiError>(cart)
        }
        .instrument(ctx.span("create_cart"))
        .await
    }

    /// Adds `quantity` of a product to one of the caller's carts.
    pub async fn add_to_cart(
        &self,
        ctx: &RequestContext,
        cart_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<Cart, ApiError> {
        async {
            validate_entity_id("product_id", product_id).map_err(CoreError::from)?;
            validate_quantity(quantity).map_err(CoreError::from)?;
            self.owned_cart(ctx, cart_id).await?;

            let cart = self
                .guarded(
                    self.engine
                        .carts()
                        .add_line_item(cart_id, product_id, quantity),
                )
                .await?;
            debug!(
                cart_id = %cart_id,
                product_id = %product_id,
                quantity,
                lines = cart.items.len(),
                "Added to cart"
            );
            Ok::<_, ApiError>(cart)
        }
        .instrument(ctx.span("add_to_cart"))
        .await
    }

    /// Cart lines joined with current product snapshots.
    ///
    /// Prices in the view are informational; products that left the
    /// catalog show up with no snapshot.
    pub async fn get_cart(&self, ctx: &RequestContext, cart_id: &str) -> Result<CartView, ApiError> {
        async {
            let cart = self.owned_cart(ctx, cart_id).await?;

            let mut snapshots = Vec::with_capacity(cart.items.len());
            for item in &cart.items {
                let lookup = self
                    .guarded(self.engine.inventory().get_product(&item.product_id))
                    .await;
                match lookup {
                    Ok(product) => snapshots.push(Some(product)),
                    Err(err) if err.kind() == ErrorKind::NotFound => snapshots.push(None),
                    Err(err) => return Err(err.into()),
                }
            }

            Ok::<_, ApiError>(CartView::assemble(&cart, snapshots))
        }
        .instrument(ctx.span("get_cart"))
        .await
    }

    /// Checks out one of the caller's carts.
    pub async fn purchase(
        &self,
        ctx: &RequestContext,
        cart_id: &str,
    ) -> Result<PurchaseOutcome, ApiError> {
        async {
            self.owned_cart(ctx, cart_id).await?;
            let outcome = self.engine.purchase(cart_id).await?;

            info!(
                cart_id = %cart_id,
                fulfilment = ?outcome.fulfilment,
                ticket = outcome.ticket.as_ref().map(|t| t.code.as_str()).unwrap_or("-"),
                unfulfilled = outcome.unfulfilled.len(),
                "Purchase finished"
            );
            Ok::<_, ApiError>(outcome)
        }
        .instrument(ctx.span("purchase"))
        .await
    }

    /// Looks up one of the caller's tickets by code.
    pub async fn get_ticket(&self, ctx: &RequestContext, code: &str) -> Result<Ticket, ApiError> {
        async {
            validate_user_id(ctx.user_id()).map_err(CoreError::from)?;
            validate_ticket_code(code).map_err(CoreError::from)?;

            let ticket = self.guarded(self.engine.tickets().get(code)).await?;
            if ticket.purchaser_id != ctx.user_id() {
                debug!(code = %code, "Ticket belongs to another user");
                return Err(ApiError::not_found("Ticket", code));
            }
            Ok::<_, ApiError>(ticket)
        }
        .instrument(ctx.span("get_ticket"))
        .await
    }

    /// The caller's tickets, newest first.
    pub async fn list_tickets(&self, ctx: &RequestContext) -> Result<Vec<Ticket>, ApiError> {
        async {
            validate_user_id(ctx.user_id()).map_err(CoreError::from)?;
            let tickets = self
                .guarded(self.engine.tickets().list_for_purchaser(ctx.user_id()))
                .await?;
            Ok::<_, ApiError>(tickets)
        }
        .instrument(ctx.span("list_tickets"))
        .await
    }

    /// Loads `cart_id` if it belongs to the caller.
    async fn owned_cart(&self, ctx: &RequestContext, cart_id: &str) -> Result<Cart, ApiError> {
        validate_user_id(ctx.user_id()).map_err(CoreError::from)?;
        validate_entity_id("cart_id", cart_id).map_err(CoreError::from)?;

        let cart = self.guarded(self.engine.carts().get_cart(cart_id)).await?;
        if cart.user_id != ctx.user_id() {
            debug!(cart_id = %cart_id, "Cart belongs to another user");
            return Err(ApiError::not_found("Cart", cart_id));
        }
        Ok(cart)
    }

    /// Bounds a ledger call by the configured storage timeout.
    async fn guarded<R>(&self, fut: impl Future<Output = CoreResult<R>>) -> CoreResult<R> {
        let timeout = self.engine.options().storage_timeout;
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| CoreError::unavailable(format!("storage call exceeded {:?}", timeout)))?
    }
}
