// ABOUTME: Conversation route handlers that start and stop the scheduled two-persona loop
// ABOUTME: Start seeds one exchange and arms the timer; stop disarms it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::{
    constants::messages,
    errors::AppError,
    routes::chat::{PromptRequest, TextResponse},
    scheduler::StartOutcome,
    server::ServerResources,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Conversation loop routes handler
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/start-conversation", post(Self::start_conversation))
            .route("/stop-conversation", post(Self::stop_conversation))
            .with_state(resources)
    }

    /// Seed the conversation and arm the timer
    async fn start_conversation(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<PromptRequest>,
    ) -> Result<Response, AppError> {
        match resources.scheduler()?.start(&request.prompt).await? {
            StartOutcome::Started(init_message) => Ok((
                StatusCode::OK,
                Json(TextResponse {
                    response: init_message,
                }),
            )
                .into_response()),
            StartOutcome::AlreadyActive => Ok((
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": messages::CONVERSATION_ALREADY_ACTIVE })),
            )
                .into_response()),
        }
    }

    /// Disarm the timer
    async fn stop_conversation(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        resources.scheduler()?.stop().await?;
        Ok((
            StatusCode::OK,
            Json(TextResponse {
                response: messages::CONVERSATION_STOPPED.to_owned(),
            }),
        )
            .into_response())
    }
}
