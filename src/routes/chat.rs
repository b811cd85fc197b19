// ABOUTME: Chat route handlers relaying prompts to the first persona and managing stored exchanges
// ABOUTME: Provides REST endpoints for sending, listing, paginating and deleting exchanges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat routes
//!
//! `POST /chat` sends the prompt to the first persona and stores the cleaned
//! reply. The remaining routes read and delete stored exchanges.

use crate::{
    assistants::PersonaSlot,
    constants::messages,
    database::Exchange,
    errors::AppError,
    server::ServerResources,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /chat`
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    /// Text sent to the persona
    pub prompt: String,
}

/// Single-field text response used by several routes
#[derive(Debug, Serialize, Deserialize)]
pub struct TextResponse {
    /// Reply or status text
    pub response: String,
}

impl TextResponse {
    fn ok(response: impl Into<String>) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                response: response.into(),
            }),
        )
            .into_response()
    }
}

/// List of exchanges
#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeListResponse {
    /// Exchanges in ascending id order
    pub messages: Vec<Exchange>,
}

/// Pagination cursor, sent either as a number or as a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Cursor {
    /// `{"cursor": 42}`
    Number(i64),
    /// `{"cursor": "42"}`
    Text(String),
}

impl Cursor {
    fn id(&self) -> Result<i64, AppError> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| AppError::invalid_input("Invalid cursor format")),
        }
    }
}

/// Body of `POST /paginate-chat`
#[derive(Debug, Deserialize)]
pub struct PaginateRequest {
    /// Id of the newest exchange on the page
    pub cursor: Cursor,
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/chat", post(Self::send_prompt))
            .route("/chat", get(Self::list_exchanges))
            .route("/chat", delete(Self::delete_all))
            .route("/latest-chat", get(Self::latest_exchange))
            .route("/paginate-chat", post(Self::paginate))
            .route("/chat/:id", delete(Self::delete_exchange))
            .route("/after-chat/:id", delete(Self::delete_from))
            .with_state(resources)
    }

    /// Parse a path id
    fn parse_id(raw: &str) -> Result<i64, AppError> {
        raw.parse()
            .map_err(|_| AppError::invalid_input(messages::INVALID_ID_FORMAT))
    }

    /// Send a prompt to the first persona and store the exchange
    async fn send_prompt(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<PromptRequest>,
    ) -> Result<Response, AppError> {
        let poller = resources.completion()?;
        let exchanges = resources.exchanges()?;

        let response = poller.prompt(PersonaSlot::First, &request.prompt).await?;
        let exchange = exchanges.create(&request.prompt, &response).await?;
        info!(exchange_id = exchange.id, "Stored chat exchange");

        Ok(TextResponse::ok(exchange.response))
    }

    /// List every exchange
    async fn list_exchanges(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let messages = resources.exchanges()?.list().await?;
        Ok((StatusCode::OK, Json(ExchangeListResponse { messages })).into_response())
    }

    /// Latest exchange
    async fn latest_exchange(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let exchange = resources
            .exchanges()?
            .latest()
            .await?
            .ok_or_else(|| AppError::not_found("Exchange"))?;
        Ok((StatusCode::OK, Json(exchange)).into_response())
    }

    /// Page of up to ten exchanges ending at the cursor
    async fn paginate(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<PaginateRequest>,
    ) -> Result<Response, AppError> {
        let cursor = request.cursor.id()?;
        let messages = resources.exchanges()?.paginate(cursor).await?;
        Ok((StatusCode::OK, Json(ExchangeListResponse { messages })).into_response())
    }

    /// Delete one exchange
    async fn delete_exchange(
        State(resources): State<Arc<ServerResources>>,
        Path(raw_id): Path<String>,
    ) -> Result<Response, AppError> {
        let id = Self::parse_id(&raw_id)?;
        if !resources.exchanges()?.delete(id).await? {
            return Err(AppError::not_found(format!("Exchange {id}")));
        }
        info!(exchange_id = id, "Deleted exchange");
        Ok(TextResponse::ok(format!("Successfully deleted ID: {id}")))
    }

    /// Delete every exchange with an id at or above the path id
    async fn delete_from(
        State(resources): State<Arc<ServerResources>>,
        Path(raw_id): Path<String>,
    ) -> Result<Response, AppError> {
        let id = Self::parse_id(&raw_id)?;
        let removed = resources.exchanges()?.delete_from(id).await?;
        info!(from_id = id, removed, "Deleted exchanges");
        Ok(TextResponse::ok(messages::CONVERSATION_DELETED))
    }

    /// Delete every exchange
    async fn delete_all(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let removed = resources.exchanges()?.delete_all().await?;
        info!(removed, "Deleted all exchanges");
        Ok(TextResponse::ok(messages::CONVERSATION_DELETED))
    }
}
