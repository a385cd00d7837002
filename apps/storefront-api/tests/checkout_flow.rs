//! End-to-end flows through the `Storefront` facade over SQLite.

use storefront_api::{ErrorCode, RequestContext, SqliteStorefront, StoreConfig};
use storefront_core::{Fulfilment, InventoryLedger, Product, UnfulfilledReason};
use storefront_db::Database;

async fn open_in_memory() -> (SqliteStorefront, Database) {
    let config = StoreConfig {
        database_path: ":memory:".to_string(),
        ..StoreConfig::default()
    };
    SqliteStorefront::open(&config).await.unwrap()
}

async fn stock_product(shop: &SqliteStorefront, name: &str, price_cents: i64, stock: i64) -> Product {
    let product = Product::new(name, price_cents, stock);
    shop.engine().inventory().insert(&product).await.unwrap();
    product
}

async fn stock_of(shop: &SqliteStorefront, product_id: &str) -> i64 {
    shop.engine()
        .inventory()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
async fn test_partial_purchase_scenario() {
    let (shop, _db) = open_in_memory().await;
    let a = stock_product(&shop, "Product A", 10, 5).await;
    let b = stock_product(&shop, "Product B", 5, 1).await;

    let ctx = RequestContext::new("alice");
    let cart = shop.create_cart(&ctx).await.unwrap();
    shop.add_to_cart(&ctx, &cart.id, &a.id, 2).await.unwrap();
    shop.add_to_cart(&ctx, &cart.id, &b.id, 3).await.unwrap();

    let outcome = shop.purchase(&ctx, &cart.id).await.unwrap();

    assert_eq!(outcome.fulfilment, Fulfilment::PartiallyFulfilled);
    let ticket = outcome.ticket.expect("ticket issued");
    assert_eq!(ticket.amount_cents, 20);
    assert_eq!(ticket.purchaser_id, "alice");

    assert_eq!(outcome.unfulfilled.len(), 1);
    assert_eq!(outcome.unfulfilled[0].product_id, b.id);
    assert_eq!(outcome.unfulfilled[0].requested, 3);
    assert_eq!(outcome.unfulfilled[0].available_stock, 1);
    assert_eq!(outcome.unfulfilled[0].reason, UnfulfilledReason::InsufficientStock);

    let view = shop.get_cart(&ctx, &cart.id).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].product_id, b.id);
    assert_eq!(view.lines[0].quantity, 3);

    assert_eq!(stock_of(&shop, &a.id).await, 3);
    assert_eq!(stock_of(&shop, &b.id).await, 1);

    let stored = shop.get_ticket(&ctx, &ticket.code).await.unwrap();
    assert_eq!(stored.amount_cents, ticket.amount_cents);
    assert_eq!(stored.items, ticket.items);
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].product_id, a.id);
}

#[tokio::test]
async fn test_empty_cart_purchase_writes_nothing() {
    let (shop, _db) = open_in_memory().await;
    let ctx = RequestContext::new("alice");
    let cart = shop.create_cart(&ctx).await.unwrap();

    let outcome = shop.purchase(&ctx, &cart.id).await.unwrap();

    assert_eq!(outcome.fulfilment, Fulfilment::Empty);
    assert!(outcome.ticket.is_none());
    assert!(outcome.unfulfilled.is_empty());
    assert_eq!(shop.engine().tickets().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_add_merges_line() {
    let (shop, _db) = open_in_memory().await;
    let widget = stock_product(&shop, "Widget", 199, 10).await;
    let ctx = RequestContext::new("alice");
    let cart = shop.create_cart(&ctx).await.unwrap();

    shop.add_to_cart(&ctx, &cart.id, &widget.id, 2).await.unwrap();
    let updated = shop.add_to_cart(&ctx, &cart.id, &widget.id, 3).await.unwrap();

    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].quantity, 5);

    let view = shop.get_cart(&ctx, &cart.id).await.unwrap();
    assert_eq!(view.subtotal_cents, 995);
}

#[tokio::test]
async fn test_add_rejects_unknown_product() {
    let (shop, _db) = open_in_memory().await;
    let ctx = RequestContext::new("alice");
    let cart = shop.create_cart(&ctx).await.unwrap();

    let ghost = Product::new("Ghost", 100, 1);
    let err = shop.add_to_cart(&ctx, &cart.id, &ghost.id, 1).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::NotFound);
    assert!(!err.partial);
}

#[tokio::test]
async fn test_nothing_fulfilled_keeps_cart_and_stock() {
    let (shop, _db) = open_in_memory().await;
    let sold_out = stock_product(&shop, "Sold Out", 500, 0).await;
    let hidden = stock_product(&shop, "Hidden", 300, 10).await;
    shop.engine()
        .inventory()
        .set_available(&hidden.id, false)
        .await
        .unwrap();

    let ctx = RequestContext::new("alice");
    let cart = shop.create_cart(&ctx).await.unwrap();
    shop.add_to_cart(&ctx, &cart.id, &sold_out.id, 1).await.unwrap();
    shop.add_to_cart(&ctx, &cart.id, &hidden.id, 2).await.unwrap();

    let outcome = shop.purchase(&ctx, &cart.id).await.unwrap();

    assert_eq!(outcome.fulfilment, Fulfilment::NothingFulfilled);
    assert!(outcome.ticket.is_none());
    let reasons: Vec<_> = outcome.unfulfilled.iter().map(|u| u.reason).collect();
    assert_eq!(
        reasons,
        vec![UnfulfilledReason::InsufficientStock, UnfulfilledReason::ProductUnavailable]
    );

    let view = shop.get_cart(&ctx, &cart.id).await.unwrap();
    assert_eq!(view.lines.len(), 2);
    assert_eq!(stock_of(&shop, &hidden.id).await, 10);
    assert_eq!(shop.engine().tickets().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_retry_after_restock() {
    let (shop, _db) = open_in_memory().await;
    let widget = stock_product(&shop, "Widget", 100, 1).await;
    let ctx = RequestContext::new("alice");
    let cart = shop.create_cart(&ctx).await.unwrap();
    shop.add_to_cart(&ctx, &cart.id, &widget.id, 3).await.unwrap();

    let first = shop.purchase(&ctx, &cart.id).await.unwrap();
    assert!(first.ticket.is_none());

    shop.engine().inventory().restock(&widget.id, 2).await.unwrap();

    let second = shop.purchase(&ctx, &cart.id).await.unwrap();
    assert_eq!(second.fulfilment, Fulfilment::FullyFulfilled);
    assert_eq!(second.ticket.map(|t| t.amount_cents), Some(300));
    assert_eq!(stock_of(&shop, &widget.id).await, 0);

    let view = shop.get_cart(&ctx, &cart.id).await.unwrap();
    assert!(view.lines.is_empty());
}

#[tokio::test]
async fn test_carts_and_tickets_are_private() {
    let (shop, _db) = open_in_memory().await;
    let widget = stock_product(&shop, "Widget", 100, 5).await;
    let alice = RequestContext::new("alice");
    let mallory = RequestContext::new("mallory");

    let cart = shop.create_cart(&alice).await.unwrap();
    shop.add_to_cart(&alice, &cart.id, &widget.id, 1).await.unwrap();

    let err = shop.purchase(&mallory, &cart.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(stock_of(&shop, &widget.id).await, 5);

    let outcome = shop.purchase(&alice, &cart.id).await.unwrap();
    let code = outcome.ticket.unwrap().code;

    let err = shop.get_ticket(&mallory, &code).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(shop.list_tickets(&alice).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_goes_to_one_buyer() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        database_path: dir.path().join("shop.db").to_string_lossy().into_owned(),
        max_connections: 4,
        ..StoreConfig::default()
    };
    let (shop, _db) = SqliteStorefront::open(&config).await.unwrap();
    let last = stock_product(&shop, "Last One", 1000, 1).await;

    let alice = RequestContext::new("alice");
    let bob = RequestContext::new("bob");
    let alice_cart = shop.create_cart(&alice).await.unwrap();
    let bob_cart = shop.create_cart(&bob).await.unwrap();
    shop.add_to_cart(&alice, &alice_cart.id, &last.id, 1).await.unwrap();
    shop.add_to_cart(&bob, &bob_cart.id, &last.id, 1).await.unwrap();

    let (a, b) = tokio::join!(
        shop.purchase(&alice, &alice_cart.id),
        shop.purchase(&bob, &bob_cart.id)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let winners = [&a, &b].iter().filter(|o| o.ticket.is_some()).count();
    let losers = [&a, &b].iter().filter(|o| o.unfulfilled.len() == 1).count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 1);
    assert_eq!(stock_of(&shop, &last.id).await, 0);
}
