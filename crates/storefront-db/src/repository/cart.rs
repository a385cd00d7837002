//! # Cart Repository
//!
//! The SQLite Cart Store: one cart per user, ordered line items.
//!
//! ## Per-Cart Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                             │
//! │    UPDATE carts SET updated_at = ? WHERE id = ?   ← takes the      │
//! │                                                     write lock,    │
//! │                                                     0 rows = 404   │
//! │    ... read lines, apply Cart rules, write lines ...               │
//! │  COMMIT                                                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! The first statement of every mutation is a write, so two mutations of
//! the same cart never interleave their read-modify-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_quantity, validate_user_id};
use storefront_core::{Cart, CartLineItem, CartStore, CoreResult};

/// Cart header row (lines are loaded separately).
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRow {
    fn into_cart(self, items: Vec<CartLineItem>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets a cart with its lines in insertion order.
    pub async fn get_by_id(&self, cart_id: &str) -> DbResult<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, cart_id).await
    }

    /// Gets the cart owned by `user_id`, if one exists.
    pub async fn get_by_user(&self, user_id: &str) -> DbResult<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;

        let cart_id: Option<String> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        match cart_id {
            Some(id) => load_cart(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Creates the user's cart unless it exists, then returns it.
    ///
    /// `ON CONFLICT(user_id) DO NOTHING` makes concurrent first calls for
    /// the same user converge on one row.
    pub async fn get_or_create(&self, user_id: &str) -> DbResult<Cart> {
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            debug!(user_id = %user_id, "Created cart");
        }

        self.get_by_user(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", user_id))
    }

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// Merge and size rules come from [`Cart::add_item`], evaluated on the
    /// cart as read inside the transaction.
    pub async fn add_item(&self, cart_id: &str, product_id: &str, quantity: i64) -> DbResult<Cart> {
        debug!(cart_id = %cart_id, product_id = %product_id, quantity = quantity, "Adding cart line");

        let mut tx = self.pool.begin().await?;

        touch_cart(&mut tx, cart_id).await?;

        let product_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if product_exists.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let mut cart = load_cart(&mut tx, cart_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", cart_id))?;

        cart.add_item(product_id, quantity)?;

        let merged = cart
            .line(product_id)
            .map(|line| line.quantity)
            .ok_or_else(|| DbError::Internal("merged line missing".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, position)
            VALUES (
                ?1, ?2, ?3,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM cart_items WHERE cart_id = ?1)
            )
            ON CONFLICT(cart_id, product_id) DO UPDATE SET quantity = excluded.quantity
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(merged)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(cart)
    }

    /// Overwrites the cart's lines with `items`, in order.
    pub async fn replace_items(&self, cart_id: &str, items: &[CartLineItem]) -> DbResult<()> {
        debug!(cart_id = %cart_id, lines = items.len(), "Replacing cart lines");

        let mut tx = self.pool.begin().await?;

        touch_cart(&mut tx, cart_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, product_id, quantity, position)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(cart_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}

/// Bumps `updated_at`; fails NotFound when the cart is absent.
async fn touch_cart(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
        .bind(cart_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Cart", cart_id));
    }

    Ok(())
}

async fn load_cart(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<Option<Cart>> {
    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id, user_id, created_at, updated_at FROM carts WHERE id = ?1",
    )
    .bind(cart_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, CartLineItem>(
        "SELECT product_id, quantity FROM cart_items WHERE cart_id = ?1 ORDER BY position",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_cart(items)))
}

#[async_trait]
impl CartStore for CartRepository {
    async fn get_or_create_cart(&self, user_id: &str) -> CoreResult<Cart> {
        validate_user_id(user_id)?;
        Ok(self.get_or_create(user_id).await?)
    }

    async fn get_cart(&self, cart_id: &str) -> CoreResult<Cart> {
        self.get_by_id(cart_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", cart_id).into())
    }

    async fn add_line_item(&self, cart_id: &str, product_id: &str, quantity: i64) -> CoreResult<Cart> {
        validate_quantity(quantity)?;
        Ok(self.add_item(cart_id, product_id, quantity).await?)
    }

    async fn replace_line_items(&self, cart_id: &str, items: &[CartLineItem]) -> CoreResult<()> {
        for item in items {
            validate_quantity(item.quantity)?;
        }
        Ok(self.replace_items(cart_id, items).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
