//! Concurrent decrements against a file-backed database with several
//! pooled connections.

use std::sync::Arc;

use storefront_core::{InventoryLedger, Product};
use storefront_db::{Database, DbConfig};

async fn file_database(dir: &tempfile::TempDir) -> Database {
    let config = DbConfig::new(dir.path().join("storefront.db")).max_connections(8);
    Database::new(config).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decrements_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_database(&dir).await;

    let product = Product::new("Limited Run", 1500, 10);
    db.products().insert(&product).await.unwrap();

    let ledger = Arc::new(db.products());
    let mut handles = Vec::new();
    for i in 0..24 {
        let ledger = Arc::clone(&ledger);
        let id = product.id.clone();
        let quantity = (i % 3) + 1;
        handles.push(tokio::spawn(async move {
            let result = ledger.try_decrement(&id, quantity).await.unwrap();
            (quantity, result.applied)
        }));
    }

    let mut sold = 0;
    for handle in handles {
        let (quantity, applied) = handle.await.unwrap();
        if applied {
            sold += quantity;
        }
    }

    let remaining = db.products().get_product(&product.id).await.unwrap().stock;
    assert!(remaining >= 0);
    assert_eq!(remaining, 10 - sold);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_goes_to_exactly_one_caller() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_database(&dir).await;

    let product = Product::new("Last One", 900, 1);
    db.products().insert(&product).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = db.products();
        let id = product.id.clone();
        handles.push(tokio::spawn(async move {
            ledger.try_decrement(&id, 1).await.unwrap().applied
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(db.products().get_product(&product.id).await.unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_or_create_converges() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_database(&dir).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let carts = db.carts();
        handles.push(tokio::spawn(async move {
            carts.get_or_create("shopper").await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();

    assert_eq!(ids.len(), 1);
}
