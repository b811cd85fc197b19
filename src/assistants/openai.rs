// ABOUTME: OpenAI Assistants API client built on reqwest
// ABOUTME: Maps threads, messages, runs and assistants onto the AssistantsApi contract
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI` Assistants Client
//!
//! Thin JSON client for the stateful Assistants API. Every request carries the
//! bearer key and the `OpenAI-Beta` header selecting the API revision.
//!
//! ## Configuration
//!
//! - `OPENAI_API_KEY`: bearer key (required)
//! - `OPENAI_BASE_URL`: API root (default: <https://api.openai.com/v1>)
//! - `OPENAI_BETA_HEADER`: API revision (default: `assistants=v2`)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{
    AssistantsApi, MessageRole, Persona, RunHandle, RunStatus, ThreadHandle, ThreadMessage,
};
use crate::config::OpenAiConfig;
use crate::constants::service_names;
use crate::errors::{AppError, AppResult, ErrorCode};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Header selecting the Assistants API revision
const OPENAI_BETA_HEADER_NAME: &str = "openai-beta";

/// Connection timeout
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout; individual calls return quickly since runs are polled
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Number of messages fetched when looking for the latest reply
const MESSAGE_PAGE_LIMIT: u32 = 20;

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Body of `POST /threads/{thread}/messages`
#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

/// Body of `POST /threads/{thread}/runs`
#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
    instructions: &'a str,
}

/// Thread object
#[derive(Debug, Deserialize)]
struct OpenAiThread {
    id: String,
}

/// Run object
#[derive(Debug, Deserialize)]
struct OpenAiRun {
    id: String,
    status: RunStatus,
}

/// Assistant object
#[derive(Debug, Deserialize)]
struct OpenAiAssistant {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
}

impl From<OpenAiAssistant> for Persona {
    fn from(assistant: OpenAiAssistant) -> Self {
        Self {
            name: assistant.name.unwrap_or_else(|| assistant.id.clone()),
            instructions: assistant.instructions.unwrap_or_default(),
            id: assistant.id,
        }
    }
}

/// Page of thread messages
#[derive(Debug, Deserialize)]
struct OpenAiMessageList {
    data: Vec<OpenAiMessage>,
}

/// Thread message
#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    role: MessageRole,
    #[serde(default)]
    content: Vec<OpenAiContent>,
}

impl From<OpenAiMessage> for ThreadMessage {
    fn from(message: OpenAiMessage) -> Self {
        let text = message
            .content
            .into_iter()
            .filter_map(|part| match part {
                OpenAiContent::Text { text } => Some(text.value),
                OpenAiContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            role: message.role,
            text,
        }
    }
}

/// One content part of a message; only text parts are used
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContent {
    Text { text: OpenAiText },
    #[serde(other)]
    Other,
}

/// Text payload of a content part
#[derive(Debug, Deserialize)]
struct OpenAiText {
    value: String,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Client Configuration
// ============================================================================

/// Connection settings of the Assistants client
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    /// Bearer key
    pub api_key: String,
    /// API root, e.g. <https://api.openai.com/v1>
    pub base_url: String,
    /// Value of the `OpenAI-Beta` header
    pub beta_header: String,
}

impl OpenAiClientConfig {
    /// Extract client settings from the server configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigMissing` error when no API key is configured.
    pub fn from_config(config: &OpenAiConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::config_missing("OPENAI_API_KEY is not set"))?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            beta_header: config.beta_header.clone(),
        })
    }
}

// ============================================================================
// Client Implementation
// ============================================================================

/// `OpenAI` Assistants API client
pub struct OpenAiAssistantsClient {
    client: Client,
    base_url: String,
}

impl OpenAiAssistantsClient {
    /// Create a client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a header value is not valid ASCII or the HTTP
    /// client cannot be created.
    pub fn new(config: OpenAiClientConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| AppError::config(format!("Invalid OpenAI API key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        let beta = HeaderValue::from_str(&config.beta_header)
            .map_err(|e| AppError::config(format!("Invalid OpenAI-Beta header: {e}")))?;
        headers.insert(OPENAI_BETA_HEADER_NAME, beta);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        info!(
            "Initializing OpenAI Assistants client: base_url={}, beta={}",
            config.base_url, config.beta_header
        );

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    /// Send a request and decode the JSON body, mapping HTTP errors
    async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> AppResult<T> {
        let response = request.send().await.map_err(|e| {
            AppError::external_service(
                service_names::OPENAI,
                format!("Failed to send {what} request: {e}"),
            )
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::external_service(
                service_names::OPENAI,
                format!("Failed to read {what} response: {e}"),
            )
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::external_service(
                service_names::OPENAI,
                format!("Failed to parse {what} response: {e}"),
            )
        })
    }

    /// Parse error response from the API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error_type = error_response
                .error
                .error_type
                .unwrap_or_else(|| "unknown".to_owned());

            match status.as_u16() {
                401 => AppError::new(
                    ErrorCode::ExternalAuthFailed,
                    format!(
                        "OpenAI authentication failed: {}",
                        error_response.error.message
                    ),
                ),
                429 => AppError::new(
                    ErrorCode::ExternalRateLimited,
                    format!("OpenAI rate limit: {}", error_response.error.message),
                ),
                _ => AppError::external_service(
                    service_names::OPENAI,
                    format!(
                        "{} ({error_type}): {}",
                        status.as_u16(),
                        error_response.error.message
                    ),
                ),
            }
        } else {
            AppError::external_service(
                service_names::OPENAI,
                format!(
                    "API error ({}): {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            )
        }
    }
}

#[async_trait]
impl AssistantsApi for OpenAiAssistantsClient {
    #[instrument(skip(self))]
    async fn create_thread(&self) -> AppResult<ThreadHandle> {
        let request = self
            .client
            .post(self.api_url("threads"))
            .json(&serde_json::json!({}));
        let thread: OpenAiThread = Self::send_json(request, "create thread").await?;
        debug!(thread_id = %thread.id, "Created thread");
        Ok(ThreadHandle::new(thread.id))
    }

    #[instrument(skip(self, content), fields(thread = %thread, content_len = content.len()))]
    async fn create_message(&self, thread: &ThreadHandle, content: &str) -> AppResult<()> {
        let request = self
            .client
            .post(self.api_url(&format!("threads/{}/messages", thread.id())))
            .json(&CreateMessageRequest {
                role: "user",
                content,
            });
        let _: serde_json::Value = Self::send_json(request, "create message").await?;
        Ok(())
    }

    #[instrument(skip(self, persona), fields(thread = %thread, persona = %persona.name))]
    async fn create_run(&self, thread: &ThreadHandle, persona: &Persona) -> AppResult<RunHandle> {
        let request = self
            .client
            .post(self.api_url(&format!("threads/{}/runs", thread.id())))
            .json(&CreateRunRequest {
                assistant_id: &persona.id,
                instructions: &persona.instructions,
            });
        let run: OpenAiRun = Self::send_json(request, "create run").await?;
        debug!(run_id = %run.id, status = ?run.status, "Created run");
        Ok(RunHandle::new(run.id))
    }

    #[instrument(skip(self), fields(thread = %thread, run = %run))]
    async fn retrieve_run(&self, thread: &ThreadHandle, run: &RunHandle) -> AppResult<RunStatus> {
        let request = self.client.get(self.api_url(&format!(
            "threads/{}/runs/{}",
            thread.id(),
            run.id()
        )));
        let run: OpenAiRun = Self::send_json(request, "retrieve run").await?;
        Ok(run.status)
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn list_messages(&self, thread: &ThreadHandle) -> AppResult<Vec<ThreadMessage>> {
        let request = self
            .client
            .get(self.api_url(&format!("threads/{}/messages", thread.id())))
            .query(&[
                ("order", "desc".to_owned()),
                ("limit", MESSAGE_PAGE_LIMIT.to_string()),
            ]);
        let page: OpenAiMessageList = Self::send_json(request, "list messages").await?;
        Ok(page.data.into_iter().map(ThreadMessage::from).collect())
    }

    #[instrument(skip(self))]
    async fn retrieve_persona(&self, assistant_id: &str) -> AppResult<Persona> {
        let request = self
            .client
            .get(self.api_url(&format!("assistants/{assistant_id}")));
        let assistant: OpenAiAssistant = Self::send_json(request, "retrieve assistant").await?;
        Ok(Persona::from(assistant))
    }
}
