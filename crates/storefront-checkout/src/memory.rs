//! # In-Memory Ledgers
//!
//! Process-local implementations of the three ledgers. Clones share
//! state, so one `MemoryInventory` can back both the engine and the carts.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryInventory   Mutex<HashMap<id, Product>>                          │
//! │                    check-and-decrement under one guard                  │
//! │                                                                         │
//! │  MemoryCarts       RwLock<index>  ──►  Arc<Mutex<Cart>> per cart       │
//! │                    index write lock only to create a cart               │
//! │                                                                         │
//! │  MemoryTickets     Mutex<Vec<Ticket>>  append-only                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Guards are never held across an `.await`. A poisoned lock surfaces as
//! `Unavailable`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use storefront_core::validation::{
    validate_product, validate_quantity, validate_ticket_code, validate_user_id,
};
use storefront_core::{
    Cart, CartLineItem, CartStore, CoreError, CoreResult, InventoryLedger, Product,
    StockDecrement, Ticket, TicketLedger,
};

fn poisoned(what: &str) -> CoreError {
    CoreError::unavailable(format!("{what} lock poisoned"))
}

// =============================================================================
// Inventory
// =============================================================================

/// In-memory Inventory Ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryInventory {
    products: Arc<Mutex<HashMap<String, Product>>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        MemoryInventory::default()
    }

    /// Builds a ledger pre-loaded with `products`, stored as given.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        MemoryInventory {
            products: Arc::new(Mutex::new(map)),
        }
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, HashMap<String, Product>>> {
        self.products.lock().map_err(|_| poisoned("inventory"))
    }

    /// Adds or replaces a product.
    pub fn insert(&self, product: Product) -> CoreResult<()> {
        validate_product(&product)?;
        self.lock()?.insert(product.id.clone(), product);
        Ok(())
    }

    /// Removes a product from the catalog.
    pub fn remove(&self, product_id: &str) -> CoreResult<Option<Product>> {
        Ok(self.lock()?.remove(product_id))
    }

    /// Turns the availability flag on or off.
    pub fn set_available(&self, product_id: &str, available: bool) -> CoreResult<()> {
        let mut products = self.lock()?;
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        product.available = available;
        product.updated_at = Utc::now();
        product.version += 1;
        Ok(())
    }

    /// Current stock, if the product exists.
    pub fn stock(&self, product_id: &str) -> CoreResult<Option<i64>> {
        Ok(self.lock()?.get(product_id).map(|p| p.stock))
    }

    pub fn contains(&self, product_id: &str) -> CoreResult<bool> {
        Ok(self.lock()?.contains_key(product_id))
    }
}

#[async_trait]
impl InventoryLedger for MemoryInventory {
    async fn get_product(&self, product_id: &str) -> CoreResult<Product> {
        self.lock()?
            .get(product_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Product", product_id))
    }

    async fn try_decrement(&self, product_id: &str, quantity: i64) -> CoreResult<StockDecrement> {
        validate_quantity(quantity)?;

        let mut products = self.lock()?;
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        let applied = product.can_fulfill(quantity);
        if applied {
            product.stock -= quantity;
            product.updated_at = Utc::now();
            product.version += 1;
        }

        debug!(product_id = %product_id, quantity, applied, stock = product.stock, "Decrement");

        Ok(StockDecrement {
            applied,
            remaining_stock: product.stock,
            product: product.clone(),
        })
    }

    async fn restock(&self, product_id: &str, quantity: i64) -> CoreResult<i64> {
        validate_quantity(quantity)?;

        let mut products = self.lock()?;
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        product.stock += quantity;
        product.updated_at = Utc::now();
        product.version += 1;
        Ok(product.stock)
    }
}

// =============================================================================
// Carts
// =============================================================================

#[derive(Debug, Default)]
struct CartIndex {
    by_id: HashMap<String, Arc<Mutex<Cart>>>,
    by_user: HashMap<String, String>,
}

/// In-memory Cart Store. Validates product ids against `catalog`.
#[derive(Debug, Clone)]
pub struct MemoryCarts {
    index: Arc<RwLock<CartIndex>>,
    catalog: MemoryInventory,
}

impl MemoryCarts {
    pub fn new(catalog: MemoryInventory) -> Self {
        MemoryCarts {
            index: Arc::new(RwLock::new(CartIndex::default())),
            catalog,
        }
    }

    fn cart_handle(&self, cart_id: &str) -> CoreResult<Arc<Mutex<Cart>>> {
        let index = self.index.read().map_err(|_| poisoned("cart index"))?;
        index
            .by_id
            .get(cart_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Cart", cart_id))
    }

    fn with_cart<R>(&self, cart_id: &str, f: impl FnOnce(&mut Cart) -> CoreResult<R>) -> CoreResult<R> {
        let handle = self.cart_handle(cart_id)?;
        let mut cart = handle.lock().map_err(|_| poisoned("cart"))?;
        f(&mut cart)
    }
}

#[async_trait]
impl CartStore for MemoryCarts {
    async fn get_or_create_cart(&self, user_id: &str) -> CoreResult<Cart> {
        validate_user_id(user_id)?;

        let mut index = self.index.write().map_err(|_| poisoned("cart index"))?;

        let existing = index
            .by_user
            .get(user_id)
            .and_then(|id| index.by_id.get(id))
            .cloned();

        let handle = match existing {
            Some(handle) => handle,
            None => {
                let cart = Cart::new(user_id);
                debug!(user_id = %user_id, cart_id = %cart.id, "Created cart");
                let id = cart.id.clone();
                let handle = Arc::new(Mutex::new(cart));
                index.by_id.insert(id.clone(), Arc::clone(&handle));
                index.by_user.insert(user_id.to_string(), id);
                handle
            }
        };

        let cart = handle.lock().map_err(|_| poisoned("cart"))?.clone();
        Ok(cart)
    }

    async fn get_cart(&self, cart_id: &str) -> CoreResult<Cart> {
        self.with_cart(cart_id, |cart| Ok(cart.clone()))
    }

    async fn add_line_item(&self, cart_id: &str, product_id: &str, quantity: i64) -> CoreResult<Cart> {
        validate_quantity(quantity)?;

        self.with_cart(cart_id, |cart| {
            if !self.catalog.contains(product_id)? {
                return Err(CoreError::not_found("Product", product_id));
            }
            cart.add_item(product_id, quantity)?;
            Ok(cart.clone())
        })
    }

    async fn replace_line_items(&self, cart_id: &str, items: &[CartLineItem]) -> CoreResult<()> {
        for item in items {
            validate_quantity(item.quantity)?;
        }

        self.with_cart(cart_id, |cart| {
            cart.replace_items(items.to_vec());
            Ok(())
        })
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// In-memory Ticket Ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryTickets {
    tickets: Arc<Mutex<Vec<Ticket>>>,
}

impl MemoryTickets {
    pub fn new() -> Self {
        MemoryTickets::default()
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, Vec<Ticket>>> {
        self.tickets.lock().map_err(|_| poisoned("tickets"))
    }

    /// Number of tickets issued so far.
    pub fn len(&self) -> CoreResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}

#[async_trait]
impl TicketLedger for MemoryTickets {
    async fn issue(&self, ticket: &Ticket) -> CoreResult<Ticket> {
        validate_ticket_code(&ticket.code)?;

        let mut tickets = self.lock()?;
        if tickets.iter().any(|t| t.code == ticket.code) {
            return Err(CoreError::conflict("Ticket", &ticket.code));
        }

        tickets.push(ticket.clone());
        Ok(ticket.clone())
    }

    async fn get(&self, code: &str) -> CoreResult<Ticket> {
        self.lock()?
            .iter()
            .find(|t| t.code == code)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Ticket", code))
    }

    async fn list_for_purchaser(&self, purchaser_id: &str) -> CoreResult<Vec<Ticket>> {
        let mut found: Vec<Ticket> = self
            .lock()?
            .iter()
            .rev()
            .filter(|t| t.purchaser_id == purchaser_id)
            .cloned()
            .collect();
        // Stable: ties keep newest-inserted first
        found.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(found)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{ErrorKind, TicketItem};

    #[tokio::test]
    async fn test_inventory_decrement_and_restock() {
        let product = Product::new("Widget", 1000, 5);
        let inventory = MemoryInventory::with_products([product.clone()]);

        let result = inventory.try_decrement(&product.id, 2).await.unwrap();
        assert!(result.applied);
        assert_eq!(result.remaining_stock, 3);

        let result = inventory.try_decrement(&product.id, 4).await.unwrap();
        assert!(!result.applied);
        assert_eq!(result.remaining_stock, 3);

        assert_eq!(inventory.restock(&product.id, 2).await.unwrap(), 5);
        assert_eq!(
            inventory.try_decrement("nope", 1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_insert_validates_catalog_fields() {
        let inventory = MemoryInventory::new();
        let widget = Product::new("Widget", 1000, 5);
        inventory.insert(widget.clone()).unwrap();
        assert_eq!(inventory.stock(&widget.id).unwrap(), Some(5));

        for bad in [
            Product::new("", 1000, 5),
            Product::new("Refund", -1, 5),
            Product::new("Yacht", i64::MAX / 2, 5),
            Product::new("Backorder", 1000, -1),
        ] {
            let id = bad.id.clone();
            assert_eq!(inventory.insert(bad).unwrap_err().kind(), ErrorKind::InvalidArgument);
            assert_eq!(inventory.stock(&id).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_unavailable_product_is_never_decremented() {
        let product = Product::new("Retired", 1000, 5);
        let inventory = MemoryInventory::with_products([product.clone()]);
        inventory.set_available(&product.id, false).unwrap();

        let result = inventory.try_decrement(&product.id, 1).await.unwrap();
        assert!(!result.applied);
        assert!(!result.product.available);
        assert_eq!(inventory.stock(&product.id).unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_carts_merge_and_validate() {
        let a = Product::new("A", 100, 1);
        let inventory = MemoryInventory::with_products([a.clone()]);
        let carts = MemoryCarts::new(inventory);

        let cart = carts.get_or_create_cart("user-1").await.unwrap();
        assert_eq!(carts.get_or_create_cart("user-1").await.unwrap().id, cart.id);

        carts.add_line_item(&cart.id, &a.id, 2).await.unwrap();
        let cart = carts.add_line_item(&cart.id, &a.id, 3).await.unwrap();
        assert_eq!(cart.items, vec![CartLineItem::new(&a.id, 5)]);

        assert_eq!(
            carts.add_line_item(&cart.id, "ghost", 1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            carts.add_line_item("ghost", &a.id, 1).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            carts.add_line_item(&cart.id, &a.id, -1).await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[tokio::test]
    async fn test_tickets_reject_duplicate_codes() {
        let tickets = MemoryTickets::new();
        let item = TicketItem::from_product(&Product::new("A", 100, 1), 1).unwrap();
        let ticket = Ticket {
            code: "T-1".to_string(),
            cart_id: "c".to_string(),
            purchaser_id: "u".to_string(),
            amount_cents: 100,
            purchased_at: Utc::now(),
            items: vec![item],
        };

        tickets.issue(&ticket).await.unwrap();
        assert_eq!(
            tickets.issue(&ticket).await.unwrap_err().kind(),
            ErrorKind::Conflict
        );
        assert_eq!(tickets.len().unwrap(), 1);
        assert_eq!(tickets.list_for_purchaser("u").await.unwrap().len(), 1);
    }
}
