// ABOUTME: Remote assistants abstraction: personas, threads, runs and the client contract
// ABOUTME: Defines the async trait implemented by the OpenAI client and by test doubles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Assistants
//!
//! The remote conversational API is modelled as an [`AssistantsApi`] trait so
//! that the completion poller and the conversation loop can be exercised
//! against a scripted implementation in tests.
//!
//! ## Key Concepts
//!
//! - **Thread**: server-side history container, created once and shared
//! - **Run**: one asynchronous invocation of a persona against a thread
//! - **Persona**: remote assistant identity with its own instructions
//!
//! ## Example
//!
//! ```rust,no_run
//! use interlocutor::assistants::{AssistantsApi, RunStatus};
//! use interlocutor::errors::AppResult;
//!
//! async fn one_run(api: &dyn AssistantsApi) -> AppResult<RunStatus> {
//!     let persona = api.retrieve_persona("asst_123").await?;
//!     let thread = api.create_thread().await?;
//!     api.create_message(&thread, "What is spirit?").await?;
//!     let run = api.create_run(&thread, &persona).await?;
//!     api.retrieve_run(&thread, &run).await
//! }
//! ```

mod openai;

pub use openai::{OpenAiAssistantsClient, OpenAiClientConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AppResult;

// ============================================================================
// Handles
// ============================================================================

/// Identifier of a remote conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadHandle(String);

impl ThreadHandle {
    /// Wrap a remote thread id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Remote thread id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one asynchronous run, owned by the poll that created it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunHandle(String);

impl RunHandle {
    /// Wrap a remote run id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Remote run id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Personas
// ============================================================================

/// Remote assistant identity, loaded once at start-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Remote assistant id
    pub id: String,
    /// Display name
    pub name: String,
    /// Instructions sent with every run
    pub instructions: String,
}

/// Which of the two configured personas to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaSlot {
    /// Persona that opens each exchange
    First,
    /// Persona that answers the first one
    Second,
}

/// The two personas taking part in the conversation loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interlocutors {
    /// Opens each exchange
    pub first: Persona,
    /// Answers each exchange
    pub second: Persona,
}

impl Interlocutors {
    /// Persona occupying `slot`
    #[must_use]
    pub const fn get(&self, slot: PersonaSlot) -> &Persona {
        match slot {
            PersonaSlot::First => &self.first,
            PersonaSlot::Second => &self.second,
        }
    }
}

// ============================================================================
// Runs and messages
// ============================================================================

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting to start
    Queued,
    /// Generating
    InProgress,
    /// Waiting on tool outputs
    RequiresAction,
    /// Cancellation requested
    Cancelling,
    /// Cancelled
    Cancelled,
    /// Failed
    Failed,
    /// Finished successfully
    Completed,
    /// Ended before finishing
    Incomplete,
    /// Timed out remotely
    Expired,
    /// Status added by the remote API after this client was written
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run produced a reply
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Sent by this service
    User,
    /// Produced by a run
    Assistant,
}

/// Text content of one thread message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    /// Author
    pub role: MessageRole,
    /// Concatenated text parts
    pub text: String,
}

// ============================================================================
// Client contract
// ============================================================================

/// Operations of the remote assistants API used by this service
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Create an empty thread
    async fn create_thread(&self) -> AppResult<ThreadHandle>;

    /// Append a user message to `thread`
    async fn create_message(&self, thread: &ThreadHandle, content: &str) -> AppResult<()>;

    /// Start a run of `persona` against `thread`
    async fn create_run(&self, thread: &ThreadHandle, persona: &Persona) -> AppResult<RunHandle>;

    /// Fetch the current status of `run`
    async fn retrieve_run(&self, thread: &ThreadHandle, run: &RunHandle) -> AppResult<RunStatus>;

    /// List the messages of `thread`, newest first
    async fn list_messages(&self, thread: &ThreadHandle) -> AppResult<Vec<ThreadMessage>>;

    /// Look up a persona by its remote id
    async fn retrieve_persona(&self, assistant_id: &str) -> AppResult<Persona>;
}
