//! # Checkout Engine
//!
//! Orchestrates one purchase attempt per call to
//! [`CheckoutEngine::purchase`]. The pure bookkeeping (phases, tally,
//! ticket assembly) lives in `storefront_core::checkout`; this module adds
//! the storage calls, their timeouts, and the failure handling.
//!
//! ## Failure Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Where it failed            Error                    Stock / ticket     │
//! │  ────────────────────────   ──────────────────────   ────────────────   │
//! │  cart missing / bad input   Rejected                 untouched / none   │
//! │  storage before any write   Aborted (applied = [])   untouched / none   │
//! │  storage after decrements   Aborted (applied = [..]) decremented* / none│
//! │  cart rewrite after ticket  CartNotUpdated           decremented / yes  │
//! │                                                                         │
//! │  * restored when compensate_on_abort is set and the restock succeeds    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use storefront_core::{
    CartStore, CheckoutPhase, CheckoutTally, CoreError, CoreResult, DatedUuidCodes, ErrorKind,
    Fulfilment, InventoryLedger, Product, PurchaseOutcome, Ticket, TicketCodeGenerator,
    TicketLedger, UnfulfilledReason,
};

/// Ticket writes attempted per purchase: the first code plus one retry.
const TICKET_ISSUE_ATTEMPTS: usize = 2;

// =============================================================================
// Options
// =============================================================================

/// Tunables for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Upper bound for every individual storage call.
    /// Default: 5 seconds
    pub storage_timeout: Duration,

    /// Restock the attempt's applied decrements when it aborts before a
    /// ticket is written.
    /// Default: false
    pub compensate_on_abort: bool,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        CheckoutOptions {
            storage_timeout: Duration::from_secs(5),
            compensate_on_abort: false,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Step of the attempt that hit an unrecoverable storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortStage {
    LoadCart,
    Decrement,
    IssueTicket,
}

impl std::fmt::Display for AbortStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AbortStage::LoadCart => "cart load",
            AbortStage::Decrement => "stock decrement",
            AbortStage::IssueTicket => "ticket issue",
        })
    }
}

/// A decrement that was applied before the attempt aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDecrement {
    pub product_id: String,
    pub quantity: i64,
}

/// Why a purchase attempt did not complete normally.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Refused before anything was mutated.
    #[error("purchase rejected: {0}")]
    Rejected(#[source] CoreError),

    /// Storage failed mid-attempt; no ticket exists.
    ///
    /// `applied` lists decrements that happened before the failure;
    /// `compensated` says whether all of them were restocked.
    #[error("purchase aborted during {stage}: {source}")]
    Aborted {
        stage: AbortStage,
        applied: Vec<AppliedDecrement>,
        compensated: bool,
        #[source]
        source: CoreError,
    },

    /// The ticket was issued but the cart still holds the fulfilled lines.
    #[error("ticket issued but cart {} was not updated: {source}", .outcome.cart_id)]
    CartNotUpdated {
        outcome: Box<PurchaseOutcome>,
        #[source]
        source: CoreError,
    },
}

impl CheckoutError {
    /// Taxonomy kind of the underlying failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Rejected(err) => err.kind(),
            CheckoutError::Aborted { .. } | CheckoutError::CartNotUpdated { .. } => {
                ErrorKind::Unavailable
            }
        }
    }

    /// True when some effect of the attempt persisted (stock moved or a
    /// ticket exists).
    pub fn partially_happened(&self) -> bool {
        match self {
            CheckoutError::Rejected(_) => false,
            CheckoutError::Aborted {
                applied,
                compensated,
                ..
            } => !applied.is_empty() && !compensated,
            CheckoutError::CartNotUpdated { .. } => true,
        }
    }

    /// The issued ticket, when the purchase went through.
    pub fn issued_ticket(&self) -> Option<&Ticket> {
        match self {
            CheckoutError::CartNotUpdated { outcome, .. } => outcome.ticket.as_ref(),
            _ => None,
        }
    }
}

// =============================================================================
// Phase Tracking
// =============================================================================

/// Current phase of one attempt, with checked and logged transitions.
struct PhaseTracker<'a> {
    cart_id: &'a str,
    phase: CheckoutPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(cart_id: &'a str) -> Self {
        PhaseTracker {
            cart_id,
            phase: CheckoutPhase::Started,
        }
    }

    fn advance(&mut self, next: CheckoutPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal checkout transition {} -> {}",
            self.phase,
            next
        );
        debug!(cart_id = %self.cart_id, from = %self.phase, to = %next, "Checkout phase");
        self.phase = next;
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Runs purchase attempts against three ledgers.
///
/// ## Example
/// ```rust,ignore
/// let engine = CheckoutEngine::new(db.products(), db.carts(), db.tickets())
///     .with_options(CheckoutOptions {
///         storage_timeout: Duration::from_secs(2),
///         compensate_on_abort: true,
///     });
///
/// let outcome = engine.purchase(&cart_id).await?;
/// ```
pub struct CheckoutEngine<I, C, T> {
    inventory: I,
    carts: C,
    tickets: T,
    codes: Arc<dyn TicketCodeGenerator>,
    options: CheckoutOptions,
}

impl<I, C, T> CheckoutEngine<I, C, T>
where
    I: InventoryLedger,
    C: CartStore,
    T: TicketLedger,
{
    /// Creates an engine with default options and dated UUID ticket codes.
    pub fn new(inventory: I, carts: C, tickets: T) -> Self {
        CheckoutEngine {
            inventory,
            carts,
            tickets,
            codes: Arc::new(DatedUuidCodes),
            options: CheckoutOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CheckoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn TicketCodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn options(&self) -> CheckoutOptions {
        self.options
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    pub fn carts(&self) -> &C {
        &self.carts
    }

    pub fn tickets(&self) -> &T {
        &self.tickets
    }

    /// Runs one purchase attempt for `cart_id`.
    ///
    /// The ticket's purchaser is the cart's owner. Ownership checks belong
    /// to the caller.
    pub async fn purchase(&self, cart_id: &str) -> Result<PurchaseOutcome, CheckoutError> {
        let mut tracker = PhaseTracker::new(cart_id);
        tracker.advance(CheckoutPhase::Validating);

        // Step 1: cart lines and their current snapshots
        let cart = match self.guarded("load cart", self.carts.get_cart(cart_id)).await {
            Ok(cart) => cart,
            Err(err) if err.is_rejection() => {
                tracker.advance(CheckoutPhase::Aborted);
                return Err(CheckoutError::Rejected(err));
            }
            Err(err) => {
                return Err(self
                    .abort(&mut tracker, AbortStage::LoadCart, Vec::new(), err)
                    .await)
            }
        };

        if cart.is_empty() {
            tracker.advance(Fulfilment::Empty.phase());
            tracker.advance(CheckoutPhase::Done);
            debug!(cart_id = %cart_id, "Empty cart, nothing to purchase");
            return Ok(CheckoutTally::new().into_outcome(cart_id, None));
        }

        let mut snapshots: Vec<Option<Product>> = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            match self
                .guarded("read product", self.inventory.get_product(&item.product_id))
                .await
            {
                Ok(product) => snapshots.push(Some(product)),
                Err(err) if err.kind() == ErrorKind::NotFound => snapshots.push(None),
                Err(err) => {
                    return Err(self
                        .abort(&mut tracker, AbortStage::LoadCart, Vec::new(), err)
                        .await)
                }
            }
        }

        // Step 2: one atomic decrement per line, in cart order
        let mut tally = CheckoutTally::new();
        let mut applied: Vec<AppliedDecrement> = Vec::new();

        for (item, snapshot) in cart.items.iter().zip(&snapshots) {
            let decrement = tokio::time::timeout(
                self.options.storage_timeout,
                self.inventory.try_decrement(&item.product_id, item.quantity),
            )
            .await;

            match decrement {
                Ok(Ok(result)) if result.applied => {
                    applied.push(AppliedDecrement {
                        product_id: item.product_id.clone(),
                        quantity: item.quantity,
                    });
                    // The decrement is committed; an unpriceable line aborts
                    // with it counted as applied.
                    let line_total = match tally.record_fulfilled(&result.product, item.quantity) {
                        Ok(line_total) => line_total,
                        Err(err) => {
                            return Err(self
                                .abort(&mut tracker, AbortStage::Decrement, applied, err)
                                .await)
                        }
                    };
                    debug!(
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        line_total = %line_total,
                        remaining = result.remaining_stock,
                        "Line fulfilled"
                    );
                }
                Ok(Ok(result)) => {
                    let reason = if result.product.available {
                        UnfulfilledReason::InsufficientStock
                    } else {
                        UnfulfilledReason::ProductUnavailable
                    };
                    warn!(
                        product_id = %item.product_id,
                        requested = item.quantity,
                        available_stock = result.remaining_stock,
                        ?reason,
                        "Line unfulfilled"
                    );
                    tally.record_unfulfilled(
                        item.product_id.clone(),
                        item.quantity,
                        result.remaining_stock,
                        reason,
                    );
                }
                Ok(Err(err)) if err.kind() == ErrorKind::NotFound => {
                    warn!(product_id = %item.product_id, "Line unfulfilled, product missing");
                    tally.record_unfulfilled(
                        item.product_id.clone(),
                        item.quantity,
                        0,
                        UnfulfilledReason::ProductMissing,
                    );
                }
                Ok(Err(err)) => {
                    return Err(self
                        .abort(&mut tracker, AbortStage::Decrement, applied, err)
                        .await)
                }
                Err(_elapsed) => {
                    let observed = snapshot.as_ref().map(|p| p.stock).unwrap_or(0);
                    warn!(
                        product_id = %item.product_id,
                        timeout = ?self.options.storage_timeout,
                        "Line unfulfilled, decrement timed out"
                    );
                    tally.record_unfulfilled(
                        item.product_id.clone(),
                        item.quantity,
                        observed,
                        UnfulfilledReason::TimedOut,
                    );
                }
            }
        }

        let verdict = tally.verdict();
        tracker.advance(verdict.phase());

        if !verdict.issues_ticket() {
            tracker.advance(CheckoutPhase::Done);
            info!(
                cart_id = %cart_id,
                unfulfilled = tally.unfulfilled().len(),
                "Nothing fulfilled, no ticket issued"
            );
            return Ok(tally.into_outcome(cart_id, None));
        }

        // Step 3: exactly one ticket
        let ticket = match self.issue_ticket(&tally, cart_id, &cart.user_id).await {
            Ok(ticket) => ticket,
            Err(err) => {
                return Err(self
                    .abort(&mut tracker, AbortStage::IssueTicket, applied, err)
                    .await)
            }
        };
        tracker.advance(CheckoutPhase::TicketIssued);

        // Step 4: keep only what could not be bought
        let remaining = tally.remaining_items();
        let outcome = tally.into_outcome(cart_id, Some(ticket));

        if let Err(err) = self
            .guarded(
                "replace cart lines",
                self.carts.replace_line_items(cart_id, &remaining),
            )
            .await
        {
            error!(
                cart_id = %cart_id,
                error = %err,
                "Ticket issued but cart rewrite failed"
            );
            return Err(CheckoutError::CartNotUpdated {
                outcome: Box::new(outcome),
                source: err,
            });
        }
        tracker.advance(CheckoutPhase::CartUpdated);
        tracker.advance(CheckoutPhase::Done);

        info!(
            cart_id = %cart_id,
            fulfilment = ?outcome.fulfilment,
            unfulfilled = outcome.unfulfilled.len(),
            "Purchase complete"
        );

        Ok(outcome)
    }

    /// Writes the attempt's ticket, retrying once with a fresh code when
    /// the ledger reports a collision.
    async fn issue_ticket(
        &self,
        tally: &CheckoutTally,
        cart_id: &str,
        purchaser_id: &str,
    ) -> CoreResult<Ticket> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let draft = tally
                .build_ticket(self.codes.next_code(), cart_id, purchaser_id, Utc::now())
                .ok_or_else(|| CoreError::unavailable("no fulfilled lines to put on a ticket"))?;

            match self.guarded("issue ticket", self.tickets.issue(&draft)).await {
                Ok(ticket) => return Ok(ticket),
                Err(err) if err.kind() == ErrorKind::Conflict && attempt < TICKET_ISSUE_ATTEMPTS => {
                    warn!(code = %draft.code, "Ticket code collision, retrying with a new code");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Builds the abort error, restocking first when configured to.
    async fn abort(
        &self,
        tracker: &mut PhaseTracker<'_>,
        stage: AbortStage,
        applied: Vec<AppliedDecrement>,
        source: CoreError,
    ) -> CheckoutError {
        tracker.advance(CheckoutPhase::Aborted);

        let compensated = if self.options.compensate_on_abort && !applied.is_empty() {
            self.compensate(&applied).await
        } else {
            false
        };

        error!(
            cart_id = %tracker.cart_id,
            %stage,
            applied = applied.len(),
            compensated,
            error = %source,
            "Purchase aborted"
        );

        CheckoutError::Aborted {
            stage,
            applied,
            compensated,
            source,
        }
    }

    /// Best-effort restock. True only if every decrement was restored.
    async fn compensate(&self, applied: &[AppliedDecrement]) -> bool {
        let mut restored_all = true;

        for decrement in applied {
            match self
                .guarded(
                    "restock",
                    self.inventory
                        .restock(&decrement.product_id, decrement.quantity),
                )
                .await
            {
                Ok(stock) => debug!(
                    product_id = %decrement.product_id,
                    quantity = decrement.quantity,
                    stock,
                    "Decrement compensated"
                ),
                Err(err) => {
                    restored_all = false;
                    warn!(
                        product_id = %decrement.product_id,
                        quantity = decrement.quantity,
                        error = %err,
                        "Compensation failed"
                    );
                }
            }
        }

        restored_all
    }

    /// Applies the storage timeout to one ledger call.
    async fn guarded<R, F>(&self, operation: &'static str, call: F) -> CoreResult<R>
    where
        F: Future<Output = CoreResult<R>>,
    {
        match tokio::time::timeout(self.options.storage_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::unavailable(format!(
                "{operation} timed out after {:?}",
                self.options.storage_timeout
            ))),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::PurchaseOutcome;

    #[test]
    fn test_default_options() {
        let options = CheckoutOptions::default();
        assert_eq!(options.storage_timeout, Duration::from_secs(5));
        assert!(!options.compensate_on_abort);
    }

    #[test]
    fn test_error_partiality() {
        let rejected = CheckoutError::Rejected(CoreError::not_found("Cart", "c"));
        assert!(!rejected.partially_happened());
        assert_eq!(rejected.kind(), ErrorKind::NotFound);

        let applied = vec![AppliedDecrement {
            product_id: "a".to_string(),
            quantity: 2,
        }];
        let aborted = CheckoutError::Aborted {
            stage: AbortStage::IssueTicket,
            applied: applied.clone(),
            compensated: false,
            source: CoreError::unavailable("disk"),
        };
        assert!(aborted.partially_happened());
        assert_eq!(aborted.kind(), ErrorKind::Unavailable);

        let restored = CheckoutError::Aborted {
            stage: AbortStage::IssueTicket,
            applied,
            compensated: true,
            source: CoreError::unavailable("disk"),
        };
        assert!(!restored.partially_happened());

        let stale_cart = CheckoutError::CartNotUpdated {
            outcome: Box::new(PurchaseOutcome {
                cart_id: "c".to_string(),
                fulfilment: Fulfilment::PartiallyFulfilled,
                ticket: None,
                unfulfilled: Vec::new(),
            }),
            source: CoreError::unavailable("disk"),
        };
        assert!(stale_cart.partially_happened());
        assert!(stale_cart.to_string().contains("cart c"));
    }

    #[test]
    fn test_abort_details_serialize() {
        let applied = AppliedDecrement {
            product_id: "a".to_string(),
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(&applied).unwrap(),
            serde_json::json!({ "productId": "a", "quantity": 2 })
        );
        assert_eq!(
            serde_json::to_value(AbortStage::IssueTicket).unwrap(),
            serde_json::json!("issue_ticket")
        );
    }
}
