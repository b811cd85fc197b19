// ABOUTME: Centralized resource container shared by every route handler
// ABOUTME: Holds configuration, the exchange store, the completion poller and the conversation scheduler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources
//!
//! The store, the remote client and the scheduler are each optional: a
//! missing `DATABASE_URL` or incomplete `OpenAI` settings leave the
//! corresponding slot empty, and routes that need it fail with a generic 500
//! instead of the process refusing to start.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::assistants::{AssistantsApi, OpenAiAssistantsClient, OpenAiClientConfig};
use crate::completion::CompletionPoller;
use crate::config::ServerConfig;
use crate::database::{Database, ExchangeManager};
use crate::errors::{AppError, AppResult};
use crate::scheduler::{ConversationLoop, ConversationScheduler};

/// Shared state of the HTTP server
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Exchange store, if persistence is configured
    pub exchanges: Option<ExchangeManager>,
    /// Remote client, if `OpenAI` settings are complete and bootstrap succeeded
    pub completion: Option<Arc<CompletionPoller>>,
    /// Conversation loop, available when both the store and the client are
    pub scheduler: Option<ConversationScheduler>,
}

impl ServerResources {
    /// Assemble resources from already built components
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        exchanges: Option<ExchangeManager>,
        completion: Option<Arc<CompletionPoller>>,
    ) -> Self {
        let scheduler = match (&completion, &exchanges) {
            (Some(poller), Some(store)) => {
                let conversation =
                    ConversationLoop::new(Arc::clone(poller), store.clone());
                Some(
                    ConversationScheduler::new(
                        Arc::new(conversation),
                        config.scheduler.schedule.clone(),
                    )
                    .with_timezone(config.scheduler.timezone),
                )
            }
            _ => None,
        };

        Self {
            config,
            exchanges,
            completion,
            scheduler,
        }
    }

    /// Connect the store and bootstrap the remote client from configuration
    ///
    /// Failures are logged and leave the affected component unconfigured.
    pub async fn bootstrap(config: ServerConfig) -> Self {
        let exchanges = match &config.database.url {
            Some(url) => match Database::connect(url).await {
                Ok(db) => Some(db.exchanges()),
                Err(e) => {
                    error!(error = %e, "Database unavailable, persistence disabled");
                    None
                }
            },
            None => {
                warn!("DATABASE_URL is not set, persistence disabled");
                None
            }
        };

        let completion = match Self::bootstrap_completion(&config).await {
            Ok(poller) => Some(Arc::new(poller)),
            Err(e) => {
                error!(error = %e, "Assistants client unavailable");
                None
            }
        };

        Self::new(Arc::new(config), exchanges, completion)
    }

    async fn bootstrap_completion(config: &ServerConfig) -> AppResult<CompletionPoller> {
        if !config.openai.is_complete() {
            return Err(AppError::config_missing(
                "OPENAI_API_KEY, FIRST_ASSISTANT_ID and SECOND_ASSISTANT_ID are required",
            ));
        }
        let client = OpenAiAssistantsClient::new(OpenAiClientConfig::from_config(&config.openai)?)?;
        let api: Arc<dyn AssistantsApi> = Arc::new(client);
        let poller =
            CompletionPoller::bootstrap(api, &config.openai, config.polling.retry_policy()).await?;
        let personas = poller.interlocutors();
        info!(
            first = %personas.first.name,
            second = %personas.second.name,
            "Assistants client ready"
        );
        Ok(poller)
    }

    /// Exchange store
    ///
    /// # Errors
    ///
    /// Returns a `ConfigMissing` error when persistence is disabled
    pub fn exchanges(&self) -> AppResult<&ExchangeManager> {
        self.exchanges
            .as_ref()
            .ok_or_else(|| AppError::config_missing("Database is not configured"))
    }

    /// Completion poller
    ///
    /// # Errors
    ///
    /// Returns a `ConfigMissing` error when the remote client is not configured
    pub fn completion(&self) -> AppResult<&CompletionPoller> {
        self.completion
            .as_deref()
            .ok_or_else(|| AppError::config_missing("Assistants client is not configured"))
    }

    /// Conversation scheduler
    ///
    /// # Errors
    ///
    /// Returns a `ConfigMissing` error unless both the store and the client are configured
    pub fn scheduler(&self) -> AppResult<&ConversationScheduler> {
        self.scheduler.as_ref().ok_or_else(|| {
            AppError::config_missing("Conversation requires both the database and the assistants client")
        })
    }

    /// Stop an armed conversation timer, if any
    pub async fn shutdown(&self) {
        if let Some(scheduler) = &self.scheduler {
            if scheduler.is_active() {
                if let Err(e) = scheduler.stop().await {
                    warn!(error = %e, "Failed to stop conversation on shutdown");
                }
            }
        }
    }
}
