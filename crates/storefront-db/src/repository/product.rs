//! # Product Repository
//!
//! The SQLite Inventory Ledger.
//!
//! ## Atomic Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Decrement Strategy                         │
//! │                                                                     │
//! │  ❌ WRONG: read, compare in Rust, write back                       │
//! │     SELECT stock ...;  if stock >= q { UPDATE ... SET stock = 4 }  │
//! │     Two attempts both read 1, both "succeed": oversold             │
//! │                                                                     │
//! │  ✅ CORRECT: one conditional statement                             │
//! │     UPDATE products SET stock = stock - ?2                         │
//! │     WHERE id = ?1 AND available = 1 AND stock >= ?2                │
//! │     RETURNING ...                                                  │
//! │                                                                     │
//! │  SQLite runs one writer at a time, so the guard and the write      │
//! │  cannot interleave with another attempt.                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_product, validate_quantity};
use storefront_core::{CoreError, CoreResult, InventoryLedger, Product, StockDecrement};

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, stock, available, created_at, updated_at, version";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// repo.insert(&Product::new("Widget", 1000, 5)).await?;
/// let decrement = repo.try_decrement(&id, 2).await?; // InventoryLedger
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product (catalog management, seeding).
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(_))` - name, price or stock is out of range
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_product(product).map_err(CoreError::from)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, stock, available,
                created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.available)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists available products sorted by name.
    pub async fn list_available(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE available = 1 ORDER BY name LIMIT ?1"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Turns the availability flag on or off.
    ///
    /// Unavailable products stay in carts but are never decremented.
    pub async fn set_available(&self, id: &str, available: bool) -> DbResult<()> {
        debug!(id = %id, available = available, "Setting product availability");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET available = ?2, updated_at = ?3, version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(available)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Removes a product from the catalog.
    ///
    /// Cart lines referencing it remain; checkout reports them missing.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<StockDecrement> {
        let sql = format!(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3, version = version + 1
            WHERE id = ?1 AND available = 1 AND stock >= ?2
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(quantity)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(product) = updated {
            debug!(id = %id, quantity = quantity, remaining = product.stock, "Stock decremented");
            return Ok(StockDecrement {
                applied: true,
                remaining_stock: product.stock,
                product,
            });
        }

        // Guard failed: tell "absent" apart from "not enough / unavailable"
        let product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        debug!(
            id = %id,
            quantity = quantity,
            stock = product.stock,
            available = product.available,
            "Stock decrement refused"
        );

        Ok(StockDecrement {
            applied: false,
            remaining_stock: product.stock,
            product,
        })
    }

    async fn add_stock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        debug!(id = %id, quantity = quantity, "Restocking product");

        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3, version = version + 1
            WHERE id = ?1
            RETURNING stock
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }
}

#[async_trait]
impl InventoryLedger for ProductRepository {
    async fn get_product(&self, product_id: &str) -> CoreResult<Product> {
        self.get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))
    }

    async fn try_decrement(&self, product_id: &str, quantity: i64) -> CoreResult<StockDecrement> {
        validate_quantity(quantity)?;
        Ok(self.decrement_stock(product_id, quantity).await?)
    }

    async fn restock(&self, product_id: &str, quantity: i64) -> CoreResult<i64> {
        validate_quantity(quantity)?;
        Ok(self.add_stock(product_id, quantity).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
