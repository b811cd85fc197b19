// ABOUTME: System-wide constants: environment variable names, defaults and response messages
// ABOUTME: Keeps configuration keys and client-facing strings in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Environment variable names, default values and fixed response messages.

/// Names of the environment variables read at start-up
pub mod env_vars {
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// HTTP listen address
    pub const HOST: &str = "HOST";
    /// Database connection URL; absence disables persistence
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Bearer key protecting the HTTP routes; absence disables authentication
    pub const API_KEY: &str = "API_KEY";
    /// `OpenAI` API key; absence disables the remote client
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    /// `OpenAI` API root
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
    /// Value of the `OpenAI-Beta` header
    pub const OPENAI_BETA_HEADER: &str = "OPENAI_BETA_HEADER";
    /// Assistant id of the first interlocutor
    pub const FIRST_ASSISTANT_ID: &str = "FIRST_ASSISTANT_ID";
    /// Assistant id of the second interlocutor
    pub const SECOND_ASSISTANT_ID: &str = "SECOND_ASSISTANT_ID";
    /// Text appended to every prompt
    pub const PROMPT_SUFFIX: &str = "PROMPT_SUFFIX";
    /// Poll attempt bound
    pub const POLL_MAX_ATTEMPTS: &str = "POLL_MAX_ATTEMPTS";
    /// First poll backoff in milliseconds
    pub const POLL_INITIAL_BACKOFF_MS: &str = "POLL_INITIAL_BACKOFF_MS";
    /// Poll backoff cap in milliseconds
    pub const POLL_MAX_BACKOFF_MS: &str = "POLL_MAX_BACKOFF_MS";
    /// Cron expression of the conversation loop
    pub const CONVERSATION_SCHEDULE: &str = "CONVERSATION_SCHEDULE";
    /// Clock of the conversation schedule, `local` or `utc`
    pub const CONVERSATION_TIMEZONE: &str = "CONVERSATION_TIMEZONE";
    /// Comma separated CORS origins
    pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
}

/// Default configuration values
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8080;
    /// Default listen address
    pub const HOST: &str = "0.0.0.0";
    /// Default `OpenAI` API root
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    /// Default `OpenAI-Beta` header value
    pub const OPENAI_BETA_HEADER: &str = "assistants=v2";
    /// Default number of run status polls
    pub const POLL_MAX_ATTEMPTS: u32 = 10;
    /// Default first backoff
    pub const POLL_INITIAL_BACKOFF_MS: u64 = 1_000;
    /// Default backoff cap
    pub const POLL_MAX_BACKOFF_MS: u64 = 30_000;
    /// Backoff multiplier between consecutive polls
    pub const POLL_BACKOFF_MULTIPLIER: u32 = 2;
    /// Every hour on the hour between 08:00 and 20:00 host time (sec min hour dom mon dow)
    pub const CONVERSATION_SCHEDULE: &str = "0 0 8-20 * * *";
    /// Default CORS origins
    pub const CORS_ALLOWED_ORIGINS: &str = "*";
    /// Page size of `/paginate-chat`
    pub const PAGE_SIZE: i64 = 10;
}

/// Service names for structured logging
pub mod service_names {
    /// Name of the HTTP server
    pub const INTERLOCUTOR_SERVER: &str = "interlocutor-server";
    /// Name used in error messages about the remote API
    pub const OPENAI: &str = "OpenAI";
}

/// Fixed client-facing response messages
pub mod messages {
    /// `/start-conversation` while the loop is armed
    pub const CONVERSATION_ALREADY_ACTIVE: &str = "Conversation process is already active.";
    /// `/stop-conversation` success
    pub const CONVERSATION_STOPPED: &str = "Conversation process stopped successfully.";
    /// Bulk delete success
    pub const CONVERSATION_DELETED: &str = "Successfully deleted Chat Conversation";
    /// Path id that is not an integer
    pub const INVALID_ID_FORMAT: &str = "Invalid ID format";
    /// Bearer key mismatch
    pub const INVALID_API_KEY: &str = "Invalid API key";
}
