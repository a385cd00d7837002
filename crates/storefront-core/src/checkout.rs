//! # Checkout State Machine
//!
//! The pure half of a purchase attempt: which phases exist, which
//! transitions are legal, and the running tally that partitions cart lines
//! into fulfilled and unfulfilled.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Purchase Attempt Lifecycle                          │
//! │                                                                         │
//! │  Started ──► Validating ──┬──► Empty ─────────────────────────┐        │
//! │                           ├──► NothingFulfilled ──────────────┤        │
//! │                           ├──► PartiallyFulfilled ──┐         │        │
//! │                           └──► FullyFulfilled ──────┤         │        │
//! │                                                     ▼         │        │
//! │                                               TicketIssued    │        │
//! │                                                     │         │        │
//! │                                                     ▼         ▼        │
//! │                                               CartUpdated ──► Done     │
//! │                                                                         │
//! │  Any non-terminal phase ──► Aborted  (storage failure, no ticket)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The I/O side (decrements, ticket write, cart rewrite) lives in
//! `storefront-checkout`; it drives these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{
    amount_overflow, CartLineItem, Product, PurchaseOutcome, Ticket, TicketItem, UnfulfilledItem,
    UnfulfilledReason,
};

// =============================================================================
// Checkout Phase
// =============================================================================

/// One state of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    Started,
    Validating,
    Empty,
    NothingFulfilled,
    PartiallyFulfilled,
    FullyFulfilled,
    TicketIssued,
    CartUpdated,
    Done,
    Aborted,
}

impl CheckoutPhase {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: CheckoutPhase) -> bool {
        use CheckoutPhase::*;

        match (self, next) {
            (current, Aborted) => !current.is_terminal(),
            (Started, Validating) => true,
            (Validating, Empty | NothingFulfilled | PartiallyFulfilled | FullyFulfilled) => true,
            (PartiallyFulfilled | FullyFulfilled, TicketIssued) => true,
            (TicketIssued, CartUpdated) => true,
            (Empty | NothingFulfilled | CartUpdated, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CheckoutPhase::Done | CheckoutPhase::Aborted)
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckoutPhase::Started => "started",
            CheckoutPhase::Validating => "validating",
            CheckoutPhase::Empty => "empty",
            CheckoutPhase::NothingFulfilled => "nothing_fulfilled",
            CheckoutPhase::PartiallyFulfilled => "partially_fulfilled",
            CheckoutPhase::FullyFulfilled => "fully_fulfilled",
            CheckoutPhase::TicketIssued => "ticket_issued",
            CheckoutPhase::CartUpdated => "cart_updated",
            CheckoutPhase::Done => "done",
            CheckoutPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Fulfilment Verdict
// =============================================================================

/// How much of the cart the decrement pass could satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Fulfilment {
    /// The cart had no lines.
    Empty,
    /// Every line failed; no ticket, cart untouched.
    NothingFulfilled,
    /// Some lines succeeded; ticket issued, failures stay in the cart.
    PartiallyFulfilled,
    /// Every line succeeded; ticket issued, cart emptied.
    FullyFulfilled,
}

impl Fulfilment {
    /// The phase reached right after validation.
    pub fn phase(self) -> CheckoutPhase {
        match self {
            Fulfilment::Empty => CheckoutPhase::Empty,
            Fulfilment::NothingFulfilled => CheckoutPhase::NothingFulfilled,
            Fulfilment::PartiallyFulfilled => CheckoutPhase::PartiallyFulfilled,
            Fulfilment::FullyFulfilled => CheckoutPhase::FullyFulfilled,
        }
    }

    pub fn issues_ticket(self) -> bool {
        matches!(
            self,
            Fulfilment::PartiallyFulfilled | Fulfilment::FullyFulfilled
        )
    }
}

// =============================================================================
// Checkout Tally
// =============================================================================

/// Running result of the decrement pass.
///
/// Lines are recorded in cart order. The total only ever grows through
/// [`CheckoutTally::record_fulfilled`], so the amount of the ticket built
/// from it is Σ(unit price × fulfilled quantity) by construction.
#[derive(Debug, Clone, Default)]
pub struct CheckoutTally {
    fulfilled: Vec<TicketItem>,
    unfulfilled: Vec<UnfulfilledItem>,
    total: Money,
}

impl CheckoutTally {
    pub fn new() -> Self {
        CheckoutTally::default()
    }

    /// Records a successful decrement at the price observed by it.
    /// Returns the line total that was added.
    ///
    /// Fails without recording anything when the line total or the new
    /// running total would overflow.
    pub fn record_fulfilled(&mut self, product: &Product, quantity: i64) -> CoreResult<Money> {
        let item = TicketItem::from_product(product, quantity)?;
        let line_total = item.line_total();
        self.total = self
            .total
            .checked_add(line_total)
            .ok_or_else(|| amount_overflow("amount_cents"))?;
        self.fulfilled.push(item);
        Ok(line_total)
    }

    /// Records a line that stays in the cart.
    pub fn record_unfulfilled(
        &mut self,
        product_id: impl Into<String>,
        requested: i64,
        available_stock: i64,
        reason: UnfulfilledReason,
    ) {
        self.unfulfilled.push(UnfulfilledItem {
            product_id: product_id.into(),
            requested,
            available_stock,
            reason,
        });
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Lines whose stock was decremented in this attempt.
    pub fn fulfilled(&self) -> &[TicketItem] {
        &self.fulfilled
    }

    pub fn unfulfilled(&self) -> &[UnfulfilledItem] {
        &self.unfulfilled
    }

    pub fn verdict(&self) -> Fulfilment {
        match (self.fulfilled.is_empty(), self.unfulfilled.is_empty()) {
            (true, true) => Fulfilment::Empty,
            (true, false) => Fulfilment::NothingFulfilled,
            (false, false) => Fulfilment::PartiallyFulfilled,
            (false, true) => Fulfilment::FullyFulfilled,
        }
    }

    /// Cart contents after the attempt: exactly the unfulfilled lines with
    /// their originally requested quantities.
    pub fn remaining_items(&self) -> Vec<CartLineItem> {
        self.unfulfilled
            .iter()
            .map(UnfulfilledItem::to_line_item)
            .collect()
    }

    /// Builds the ticket for this attempt, or `None` when nothing was
    /// fulfilled.
    pub fn build_ticket(
        &self,
        code: impl Into<String>,
        cart_id: impl Into<String>,
        purchaser_id: impl Into<String>,
        purchased_at: DateTime<Utc>,
    ) -> Option<Ticket> {
        if self.fulfilled.is_empty() {
            return None;
        }

        Some(Ticket {
            code: code.into(),
            cart_id: cart_id.into(),
            purchaser_id: purchaser_id.into(),
            amount_cents: self.total.cents(),
            purchased_at,
            items: self.fulfilled.clone(),
        })
    }

    /// Consumes the tally into the caller-facing outcome.
    pub fn into_outcome(self, cart_id: impl Into<String>, ticket: Option<Ticket>) -> PurchaseOutcome {
        let fulfilment = self.verdict();
        PurchaseOutcome {
            cart_id: cart_id.into(),
            fulfilment,
            ticket,
            unfulfilled: self.unfulfilled,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price_cents: i64, stock: i64) -> Product {
        Product::new("Test", price_cents, stock)
    }

    #[test]
    fn test_happy_path_transitions() {
        use CheckoutPhase::*;
        let path = [Started, Validating, PartiallyFulfilled, TicketIssued, CartUpdated, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_short_circuit_transitions() {
        use CheckoutPhase::*;
        assert!(Validating.can_advance_to(Empty));
        assert!(Empty.can_advance_to(Done));
        assert!(NothingFulfilled.can_advance_to(Done));
        assert!(!Empty.can_advance_to(TicketIssued));
        assert!(!NothingFulfilled.can_advance_to(TicketIssued));
    }

    #[test]
    fn test_abort_only_from_non_terminal() {
        use CheckoutPhase::*;
        assert!(Validating.can_advance_to(Aborted));
        assert!(TicketIssued.can_advance_to(Aborted));
        assert!(!Done.can_advance_to(Aborted));
        assert!(!Aborted.can_advance_to(Aborted));
    }

    #[test]
    fn test_verdicts() {
        let mut tally = CheckoutTally::new();
        assert_eq!(tally.verdict(), Fulfilment::Empty);

        tally.record_unfulfilled("b", 3, 1, UnfulfilledReason::InsufficientStock);
        assert_eq!(tally.verdict(), Fulfilment::NothingFulfilled);

        tally.record_fulfilled(&product(1000, 5), 2).unwrap();
        assert_eq!(tally.verdict(), Fulfilment::PartiallyFulfilled);

        let mut full = CheckoutTally::new();
        full.record_fulfilled(&product(1000, 5), 1).unwrap();
        assert_eq!(full.verdict(), Fulfilment::FullyFulfilled);
        assert!(full.verdict().issues_ticket());
    }

    #[test]
    fn test_total_covers_only_fulfilled_lines() {
        let a = product(1000, 5);
        let mut tally = CheckoutTally::new();
        tally.record_fulfilled(&a, 2).unwrap();
        tally.record_unfulfilled("b", 3, 1, UnfulfilledReason::InsufficientStock);

        assert_eq!(tally.total().cents(), 2000);

        let ticket = tally
            .build_ticket("T-1", "cart", "user", Utc::now())
            .expect("fulfilled lines produce a ticket");
        assert_eq!(ticket.amount_cents, 2000);
        assert_eq!(ticket.items.len(), 1);
        assert!(ticket.is_balanced());
    }

    #[test]
    fn test_overflowing_line_leaves_tally_unchanged() {
        let mut tally = CheckoutTally::new();
        tally.record_fulfilled(&product(1000, 5), 2).unwrap();

        assert!(tally.record_fulfilled(&product(i64::MAX / 2, 10), 3).is_err());
        assert_eq!(tally.total().cents(), 2000);
        assert_eq!(tally.fulfilled().len(), 1);
    }

    #[test]
    fn test_overflowing_running_total_is_rejected() {
        let mut tally = CheckoutTally::new();
        tally.record_fulfilled(&product(i64::MAX / 2, 10), 1).unwrap();
        tally.record_fulfilled(&product(i64::MAX / 2, 10), 1).unwrap();

        let err = tally.record_fulfilled(&product(1000, 5), 2).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(tally.fulfilled().len(), 2);
        assert_eq!(tally.total().cents(), (i64::MAX / 2) * 2);
    }

    #[test]
    fn test_remaining_items_keep_requested_quantity() {
        let mut tally = CheckoutTally::new();
        tally.record_fulfilled(&product(1000, 5), 2).unwrap();
        tally.record_unfulfilled("b", 3, 1, UnfulfilledReason::InsufficientStock);
        tally.record_unfulfilled("c", 7, 0, UnfulfilledReason::ProductMissing);

        let remaining = tally.remaining_items();
        assert_eq!(
            remaining,
            vec![CartLineItem::new("b", 3), CartLineItem::new("c", 7)]
        );
    }

    #[test]
    fn test_no_ticket_when_nothing_fulfilled() {
        let mut tally = CheckoutTally::new();
        tally.record_unfulfilled("b", 3, 1, UnfulfilledReason::InsufficientStock);
        assert!(tally.build_ticket("T-1", "cart", "user", Utc::now()).is_none());

        let outcome = tally.into_outcome("cart", None);
        assert_eq!(outcome.fulfilment, Fulfilment::NothingFulfilled);
        assert_eq!(outcome.unfulfilled.len(), 1);
    }
}
