// ABOUTME: Completion poller that sends a prompt to a persona and waits for the run to finish
// ABOUTME: Owns the shared thread and both personas; polls run status under a bounded retry policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Completion Poller
//!
//! A prompt is posted as a `user` message on the shared thread, a run of the
//! target persona is created, and the run status is polled until it reports
//! `completed`. The newest assistant message is then returned with citation
//! markers removed.
//!
//! Per invocation the state moves `Submitted -> Polling -> {Completed | RetryExhausted}`.
//! There is no cancellation; the wait is bounded by the retry policy.
//!
//! All requests share one thread. Concurrent prompts may interleave their
//! messages on it, and a poll may pick up a reply produced for another
//! request. This is accepted: the thread is the conversation history.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::assistants::{
    AssistantsApi, Interlocutors, MessageRole, Persona, PersonaSlot, RunHandle, ThreadHandle,
};
use crate::config::OpenAiConfig;
use crate::constants::service_names;
use crate::errors::{AppError, AppResult};
use crate::utils::retry::{retry_with_backoff, RetryPolicy};
use crate::utils::text::strip_citations;

/// Sends prompts to the configured personas over the shared thread
pub struct CompletionPoller {
    api: Arc<dyn AssistantsApi>,
    thread: ThreadHandle,
    interlocutors: Interlocutors,
    policy: RetryPolicy,
    prompt_suffix: Option<String>,
}

impl CompletionPoller {
    /// Create a poller over an existing thread and personas
    #[must_use]
    pub fn new(
        api: Arc<dyn AssistantsApi>,
        thread: ThreadHandle,
        interlocutors: Interlocutors,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            thread,
            interlocutors,
            policy,
            prompt_suffix: None,
        }
    }

    /// Append `suffix` verbatim to every prompt
    #[must_use]
    pub fn with_prompt_suffix(mut self, suffix: Option<String>) -> Self {
        self.prompt_suffix = suffix;
        self
    }

    /// Load both personas and create the shared thread
    ///
    /// # Errors
    ///
    /// Returns a `ConfigMissing` error if an assistant id is absent, or the
    /// remote error if a persona lookup or the thread creation fails.
    pub async fn bootstrap(
        api: Arc<dyn AssistantsApi>,
        config: &OpenAiConfig,
        policy: RetryPolicy,
    ) -> AppResult<Self> {
        let first_id = config
            .first_assistant_id
            .as_deref()
            .ok_or_else(|| AppError::config_missing("FIRST_ASSISTANT_ID is not set"))?;
        let second_id = config
            .second_assistant_id
            .as_deref()
            .ok_or_else(|| AppError::config_missing("SECOND_ASSISTANT_ID is not set"))?;

        let first = api.retrieve_persona(first_id).await?;
        let second = api.retrieve_persona(second_id).await?;
        let thread = api.create_thread().await?;

        info!(thread = %thread, "Assistants thread created");

        Ok(Self::new(api, thread, Interlocutors { first, second }, policy)
            .with_prompt_suffix(config.prompt_suffix.clone()))
    }

    /// Shared thread
    #[must_use]
    pub const fn thread(&self) -> &ThreadHandle {
        &self.thread
    }

    /// Both personas
    #[must_use]
    pub const fn interlocutors(&self) -> &Interlocutors {
        &self.interlocutors
    }

    /// Send `prompt` to the persona in `slot`
    ///
    /// # Errors
    ///
    /// See [`Self::send_prompt`].
    pub async fn prompt(&self, slot: PersonaSlot, prompt: &str) -> AppResult<String> {
        self.send_prompt(prompt, self.interlocutors.get(slot)).await
    }

    /// Post `prompt` to `persona` and wait for its cleaned reply
    ///
    /// # Errors
    ///
    /// Returns the remote error if the message or run cannot be created, or
    /// an `ExternalServiceUnavailable` error if the run does not complete
    /// within the retry budget.
    #[instrument(skip(self, prompt, persona), fields(persona = %persona.name))]
    pub async fn send_prompt(&self, prompt: &str, persona: &Persona) -> AppResult<String> {
        let content = match &self.prompt_suffix {
            Some(suffix) => format!("{prompt}{suffix}"),
            None => prompt.to_owned(),
        };

        self.api.create_message(&self.thread, &content).await?;
        let run = self.api.create_run(&self.thread, persona).await?;
        debug!(run_id = %run, "Run submitted, polling for completion");

        let reply = retry_with_backoff(&self.policy, "assistant run", |attempt| {
            self.poll_once(&run, attempt)
        })
        .await?;

        info!(persona = %persona.name, run_id = %run, "Assistant replied");
        Ok(strip_citations(&reply))
    }

    /// One poll step: succeed with the newest assistant text once the run is completed
    async fn poll_once(&self, run: &RunHandle, attempt: u32) -> AppResult<String> {
        let status = self.api.retrieve_run(&self.thread, run).await?;
        debug!(run_id = %run, attempt, status = ?status, "Polled run status");

        if !status.is_completed() {
            return Err(AppError::external_unavailable(
                service_names::OPENAI,
                format!("run {run} is {status:?}"),
            ));
        }

        let messages = self.api.list_messages(&self.thread).await?;
        messages
            .into_iter()
            .find(|message| message.role == MessageRole::Assistant)
            .map(|message| message.text)
            .ok_or_else(|| {
                AppError::external_service(
                    service_names::OPENAI,
                    format!("run {run} completed without an assistant message"),
                )
            })
    }
}
