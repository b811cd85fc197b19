// ABOUTME: Scripted in-memory implementation of the assistants API for tests
// ABOUTME: Personas transform the prompt they receive; run statuses follow a per-test script
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use interlocutor::assistants::{
    AssistantsApi, Interlocutors, MessageRole, Persona, RunHandle, RunStatus, ThreadHandle,
    ThreadMessage,
};
use interlocutor::completion::CompletionPoller;
use interlocutor::errors::{AppError, AppResult};
use interlocutor::utils::retry::RetryPolicy;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Assistant id of the first persona in tests
pub const FIRST_ID: &str = "asst_first";
/// Assistant id of the second persona in tests
pub const SECOND_ID: &str = "asst_second";
/// Poll budget used by test pollers
pub const TEST_POLL_ATTEMPTS: u32 = 4;

/// How a persona turns the prompt it receives into its reply
pub type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Reply with the prompt unchanged
pub fn echo() -> Transform {
    Arc::new(|prompt: &str| prompt.to_owned())
}

/// Reply with `prefix` followed by the prompt
pub fn prefixed(prefix: &str) -> Transform {
    let prefix = prefix.to_owned();
    Arc::new(move |prompt| format!("{prefix}{prompt}"))
}

/// Reply with a fixed text
pub fn fixed(reply: &str) -> Transform {
    let reply = reply.to_owned();
    Arc::new(move |_| reply.clone())
}

/// One scripted answer of `retrieve_run`
#[derive(Debug, Clone, Copy)]
pub enum Poll {
    /// Report this status
    Status(RunStatus),
    /// Fail the status call as if the transport broke
    TransportError,
}

struct PendingRun {
    reply: String,
    delivered: bool,
}

#[derive(Default)]
struct FakeState {
    personas: HashMap<String, (Persona, Option<Transform>)>,
    poll_script: VecDeque<Poll>,
    default_poll: Option<Poll>,
    last_user_message: String,
    runs: HashMap<String, PendingRun>,
    messages: Vec<ThreadMessage>,
    received: Vec<(String, String)>,
    fail_create_run: bool,
    run_delay: Option<Duration>,
}

/// In-memory assistants API
#[derive(Default)]
pub struct FakeAssistants {
    state: Mutex<FakeState>,
    threads_created: AtomicU32,
    messages_created: AtomicU32,
    runs_created: AtomicU32,
    status_calls: AtomicU32,
}

impl FakeAssistants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persona and its reply transform
    pub fn with_persona(self, id: &str, name: &str, transform: Transform) -> Self {
        let persona = Persona {
            id: id.to_owned(),
            name: name.to_owned(),
            instructions: format!("You are {name}."),
        };
        self.state
            .lock()
            .unwrap()
            .personas
            .insert(id.to_owned(), (persona, Some(transform)));
        self
    }

    /// Answer the next status calls with `polls`, then fall back to the default
    pub fn with_poll_script(self, polls: impl IntoIterator<Item = Poll>) -> Self {
        self.state.lock().unwrap().poll_script.extend(polls);
        self
    }

    /// Answer every unscripted status call with `poll` instead of `completed`
    pub fn with_default_poll(self, poll: Poll) -> Self {
        self.state.lock().unwrap().default_poll = Some(poll);
        self
    }

    /// Hold every `create_run` call for `delay` before it answers
    pub fn with_run_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().run_delay = Some(delay);
        self
    }

    /// Make every `create_run` call fail
    pub fn failing_runs(self) -> Self {
        self.state.lock().unwrap().fail_create_run = true;
        self
    }

    pub fn persona(&self, id: &str) -> Persona {
        self.state.lock().unwrap().personas[id].0.clone()
    }

    /// Prompts received by the persona with `id`, in order
    pub fn received_by(&self, id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .received
            .iter()
            .filter(|(persona, _)| persona == id)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn threads_created(&self) -> u32 {
        self.threads_created.load(Ordering::SeqCst)
    }

    pub fn messages_created(&self) -> u32 {
        self.messages_created.load(Ordering::SeqCst)
    }

    pub fn runs_created(&self) -> u32 {
        self.runs_created.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantsApi for FakeAssistants {
    async fn create_thread(&self) -> AppResult<ThreadHandle> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ThreadHandle::new(format!("thread_{n}")))
    }

    async fn create_message(&self, _thread: &ThreadHandle, content: &str) -> AppResult<()> {
        self.messages_created.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.last_user_message = content.to_owned();
        state.messages.insert(
            0,
            ThreadMessage {
                role: MessageRole::User,
                text: content.to_owned(),
            },
        );
        Ok(())
    }

    async fn create_run(&self, _thread: &ThreadHandle, persona: &Persona) -> AppResult<RunHandle> {
        let delay = self.state.lock().unwrap().run_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_create_run {
            return Err(AppError::external_service("Fake", "run creation refused"));
        }
        let n = self.runs_created.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = state.last_user_message.clone();
        let transform = state
            .personas
            .get(&persona.id)
            .and_then(|(_, transform)| transform.clone())
            .unwrap_or_else(echo);
        let reply = transform(&prompt);
        state.received.push((persona.id.clone(), prompt));

        let run_id = format!("run_{n}");
        state.runs.insert(
            run_id.clone(),
            PendingRun {
                reply,
                delivered: false,
            },
        );
        Ok(RunHandle::new(run_id))
    }

    async fn retrieve_run(&self, _thread: &ThreadHandle, run: &RunHandle) -> AppResult<RunStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let poll = state
            .poll_script
            .pop_front()
            .or(state.default_poll)
            .unwrap_or(Poll::Status(RunStatus::Completed));

        let status = match poll {
            Poll::TransportError => {
                return Err(AppError::external_service("Fake", "connection reset"));
            }
            Poll::Status(status) => status,
        };

        if status == RunStatus::Completed {
            let reply = state.runs.get_mut(run.id()).and_then(|pending| {
                if pending.delivered {
                    None
                } else {
                    pending.delivered = true;
                    Some(pending.reply.clone())
                }
            });
            if let Some(text) = reply {
                state.messages.insert(
                    0,
                    ThreadMessage {
                        role: MessageRole::Assistant,
                        text,
                    },
                );
            }
        }
        Ok(status)
    }

    async fn list_messages(&self, _thread: &ThreadHandle) -> AppResult<Vec<ThreadMessage>> {
        Ok(self.state.lock().unwrap().messages.clone())
    }

    async fn retrieve_persona(&self, assistant_id: &str) -> AppResult<Persona> {
        self.state
            .lock()
            .unwrap()
            .personas
            .get(assistant_id)
            .map(|(persona, _)| persona.clone())
            .ok_or_else(|| AppError::not_found(format!("Assistant {assistant_id}")))
    }
}

/// Fake with both test personas registered
pub fn two_personas(first: Transform, second: Transform) -> FakeAssistants {
    FakeAssistants::new()
        .with_persona(FIRST_ID, "First", first)
        .with_persona(SECOND_ID, "Second", second)
}

/// Fake where both personas echo their prompt
pub fn echo_personas() -> FakeAssistants {
    two_personas(echo(), echo())
}

/// Poller over `fake` with an immediate retry policy of `max_attempts`
pub fn create_test_poller_with_attempts(
    fake: &Arc<FakeAssistants>,
    max_attempts: u32,
) -> CompletionPoller {
    let interlocutors = Interlocutors {
        first: fake.persona(FIRST_ID),
        second: fake.persona(SECOND_ID),
    };
    let api: Arc<dyn AssistantsApi> = Arc::clone(fake) as Arc<dyn AssistantsApi>;
    CompletionPoller::new(
        api,
        ThreadHandle::new("thread_test"),
        interlocutors,
        RetryPolicy::immediate(max_attempts),
    )
}

/// Poller over `fake` with the default test poll budget
pub fn create_test_poller(fake: &Arc<FakeAssistants>) -> Arc<CompletionPoller> {
    Arc::new(create_test_poller_with_attempts(fake, TEST_POLL_ATTEMPTS))
}
