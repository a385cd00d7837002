//! # Ticket Repository
//!
//! The SQLite Ticket Ledger. Append-only: there is no update or delete
//! method, and schema triggers abort any UPDATE/DELETE on the tables.
//!
//! ## Snapshot Pattern
//! Product details (name, price) are copied into `ticket_items` at
//! purchase time, so a ticket still adds up after the catalog changes.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_ticket_code;
use storefront_core::{CoreError, CoreResult, Ticket, TicketItem, TicketLedger, ValidationError};

/// Repository for ticket database operations.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    /// Appends a ticket and its lines in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the code is already taken
    pub async fn insert(&self, ticket: &Ticket) -> DbResult<()> {
        if !ticket.is_balanced() {
            return Err(CoreError::from(ValidationError::InvalidFormat {
                field: "amount_cents".to_string(),
                reason: match ticket.lines_total() {
                    Some(lines) => format!(
                        "{} does not match the sum of its lines ({})",
                        ticket.amount(),
                        lines
                    ),
                    None => "the sum of its lines overflows".to_string(),
                },
            })
            .into());
        }

        debug!(code = %ticket.code, lines = ticket.items.len(), "Inserting ticket");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tickets (code, cart_id, purchaser_id, amount_cents, purchased_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&ticket.code)
        .bind(&ticket.cart_id)
        .bind(&ticket.purchaser_id)
        .bind(ticket.amount_cents)
        .bind(ticket.purchased_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("Ticket", &ticket.code),
            other => other,
        })?;

        for (line_no, item) in ticket.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO ticket_items (
                    ticket_code, line_no, product_id, name_snapshot,
                    unit_price_cents, quantity, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&ticket.code)
            .bind(line_no as i64)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            code = %ticket.code,
            purchaser_id = %ticket.purchaser_id,
            amount = %ticket.amount(),
            "Ticket issued"
        );

        Ok(())
    }

    /// Gets a ticket with its lines.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Ticket>> {
        let mut conn = self.pool.acquire().await?;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT code, cart_id, purchaser_id, amount_cents, purchased_at
            FROM tickets
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

        match ticket {
            Some(mut ticket) => {
                ticket.items = load_items(&mut conn, &ticket.code).await?;
                Ok(Some(ticket))
            }
            None => Ok(None),
        }
    }

    /// Lists a purchaser's tickets, newest first.
    pub async fn list_by_purchaser(&self, purchaser_id: &str) -> DbResult<Vec<Ticket>> {
        let mut conn = self.pool.acquire().await?;

        let mut tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT code, cart_id, purchaser_id, amount_cents, purchased_at
            FROM tickets
            WHERE purchaser_id = ?1
            ORDER BY purchased_at DESC, rowid DESC
            "#,
        )
        .bind(purchaser_id)
        .fetch_all(&mut *conn)
        .await?;

        for ticket in &mut tickets {
            ticket.items = load_items(&mut conn, &ticket.code).await?;
        }

        Ok(tickets)
    }

    /// Counts all tickets (diagnostics, tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn load_items(conn: &mut SqliteConnection, code: &str) -> DbResult<Vec<TicketItem>> {
    let items = sqlx::query_as::<_, TicketItem>(
        r#"
        SELECT product_id, name_snapshot, unit_price_cents, quantity, line_total_cents
        FROM ticket_items
        WHERE ticket_code = ?1
        ORDER BY line_no
        "#,
    )
    .bind(code)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

#[async_trait]
impl TicketLedger for TicketRepository {
    async fn issue(&self, ticket: &Ticket) -> CoreResult<Ticket> {
        validate_ticket_code(&ticket.code)?;
        self.insert(ticket).await?;
        Ok(ticket.clone())
    }

    async fn get(&self, code: &str) -> CoreResult<Ticket> {
        self.get_by_code(code)
            .await?
            .ok_or_else(|| CoreError::not_found("Ticket", code))
    }

    async fn list_for_purchaser(&self, purchaser_id: &str) -> CoreResult<Vec<Ticket>> {
        Ok(self.list_by_purchaser(purchaser_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
