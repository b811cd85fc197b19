// ABOUTME: Main library entry point for the interlocutor chat relay
// ABOUTME: Relays prompts to OpenAI assistants, stores exchanges and drives a scheduled two-persona loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Interlocutor
//!
//! A small HTTP backend in front of the `OpenAI` Assistants API. Prompts are
//! relayed to a persona over a shared thread, the cleaned replies are stored
//! as prompt/response exchanges in `SQLite`, and an optional cron-driven loop
//! lets two personas keep answering each other.
//!
//! ## Architecture
//!
//! - **Assistants**: async trait over the remote API and its reqwest client
//! - **Completion**: posts a prompt, creates a run and polls it to completion
//! - **Scheduler**: single armed timer running mutually exclusive ticks
//! - **Database**: exchange store and JSON export
//! - **Routes**: axum handlers over shared server resources
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use interlocutor::config::ServerConfig;
//! use interlocutor::errors::AppResult;
//! use interlocutor::server::{self, ServerResources};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = Arc::new(ServerResources::bootstrap(config).await);
//!     server::run(resources).await
//! }
//! ```

/// Remote assistants API contract and `OpenAI` client
pub mod assistants;

/// Prompt submission and run polling
pub mod completion;

/// Environment configuration
pub mod config;

/// Environment variable names, defaults and fixed messages
pub mod constants;

/// Exchange persistence
pub mod database;

/// Unified error handling
pub mod errors;

/// Logging configuration
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// HTTP route handlers
pub mod routes;

/// Scheduled conversation loop
pub mod scheduler;

/// Server assembly and shared resources
pub mod server;

/// Retry and text utilities
pub mod utils;
