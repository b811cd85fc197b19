// ABOUTME: Database operations for stored prompt/response exchanges
// ABOUTME: Handles create, ordered listing, latest lookup, cursor pagination and deletes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::defaults;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

// ============================================================================
// Database Record Types
// ============================================================================

/// One prompt/response pair; ids are assigned by the store and strictly increase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Store-assigned id
    pub id: i64,
    /// Text sent to the assistant
    pub prompt: String,
    /// Cleaned assistant reply
    pub response: String,
}

impl Exchange {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            prompt: row.get("prompt"),
            response: row.get("response"),
        }
    }
}

// ============================================================================
// Exchange Manager
// ============================================================================

/// Exchange database operations manager
#[derive(Clone)]
pub struct ExchangeManager {
    pool: SqlitePool,
}

impl ExchangeManager {
    /// Create a new exchange manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new exchange
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn create(&self, prompt: &str, response: &str) -> AppResult<Exchange> {
        let result = sqlx::query(
            r"
            INSERT INTO conversations (prompt, response)
            VALUES ($1, $2)
            ",
        )
        .bind(prompt)
        .bind(response)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create exchange: {e}")))?;

        Ok(Exchange {
            id: result.last_insert_rowid(),
            prompt: prompt.to_owned(),
            response: response.to_owned(),
        })
    }

    /// All exchanges in ascending id order
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list(&self) -> AppResult<Vec<Exchange>> {
        let rows = sqlx::query(
            r"
            SELECT id, prompt, response
            FROM conversations
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list exchanges: {e}")))?;

        Ok(rows.iter().map(Exchange::from_row).collect())
    }

    /// Exchange with the highest id, if any
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn latest(&self) -> AppResult<Option<Exchange>> {
        let row = sqlx::query(
            r"
            SELECT id, prompt, response
            FROM conversations
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get latest exchange: {e}")))?;

        Ok(row.as_ref().map(Exchange::from_row))
    }

    /// The page of up to ten exchanges ending at `cursor`, ascending
    ///
    /// A cursor that does not name a stored exchange yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn paginate(&self, cursor: i64) -> AppResult<Vec<Exchange>> {
        let anchor = sqlx::query("SELECT id FROM conversations WHERE id = $1")
            .bind(cursor)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up cursor: {e}")))?;

        if anchor.is_none() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r"
            SELECT id, prompt, response
            FROM conversations
            WHERE id <= $1
            ORDER BY id DESC
            LIMIT $2
            ",
        )
        .bind(cursor)
        .bind(defaults::PAGE_SIZE)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to paginate exchanges: {e}")))?;

        Ok(rows.iter().rev().map(Exchange::from_row).collect())
    }

    /// Delete one exchange; returns whether it existed
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete exchange: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every exchange with `id >= from_id`; returns the number removed
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn delete_from(&self, from_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM conversations WHERE id >= $1")
            .bind(from_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete exchanges: {e}")))?;

        Ok(result.rows_affected())
    }

    /// Delete every exchange; returns the number removed
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn delete_all(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM conversations")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete exchanges: {e}")))?;

        Ok(result.rows_affected())
    }
}
