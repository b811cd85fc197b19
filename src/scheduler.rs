// ABOUTME: Scheduled two-persona conversation loop with a single armed cron timer
// ABOUTME: Start seeds one exchange and arms the timer; each tick continues from the latest exchange
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Conversation Scheduler
//!
//! [`ConversationLoop`] holds the work of one exchange: the first persona
//! answers a prompt, the second persona answers the first, and the pair is
//! stored. [`ConversationScheduler`] owns at most one armed cron timer whose
//! ticks run that loop from the response of the latest stored exchange.
//!
//! Ticks are mutually exclusive through a single running flag. A tick that
//! fires while the previous one is still in progress is skipped, not queued.
//! The flag is released by a guard on every exit path.
//!
//! Every armed timer carries its own cancellation flag. `stop` raises it
//! before the job is removed, so a fire that races the shutdown returns
//! without touching the conversation.

use chrono::{Local, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::assistants::PersonaSlot;
use crate::completion::CompletionPoller;
use crate::config::ScheduleTimezone;
use crate::database::{Exchange, ExchangeManager};
use crate::errors::{AppError, AppResult};

// ============================================================================
// Outcomes
// ============================================================================

/// Result of [`ConversationScheduler::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Seed exchange stored and timer armed; carries the first persona's message
    Started(String),
    /// A timer was already armed and was left untouched
    AlreadyActive,
}

/// Result of one timer tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Previous tick still running
    Skipped,
    /// Store is empty, nothing to continue from
    NoPreviousExchange,
    /// New exchange stored
    Completed(Exchange),
    /// Remote or store error, logged
    Failed,
}

// ============================================================================
// Tick guard
// ============================================================================

/// Holds the tick-running flag; clears it when dropped
pub struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ============================================================================
// Conversation loop
// ============================================================================

/// One step of the two-persona conversation and its mutual-exclusion flag
pub struct ConversationLoop {
    poller: Arc<CompletionPoller>,
    exchanges: ExchangeManager,
    tick_running: AtomicBool,
}

impl ConversationLoop {
    /// Create a loop over the shared poller and the exchange store
    #[must_use]
    pub const fn new(poller: Arc<CompletionPoller>, exchanges: ExchangeManager) -> Self {
        Self {
            poller,
            exchanges,
            tick_running: AtomicBool::new(false),
        }
    }

    /// Whether a tick currently holds the running flag
    #[must_use]
    pub fn is_tick_running(&self) -> bool {
        self.tick_running.load(Ordering::Acquire)
    }

    /// Take the running flag, or `None` if a tick already holds it
    pub fn try_acquire_tick(&self) -> Option<TickGuard<'_>> {
        self.tick_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard {
                flag: &self.tick_running,
            })
    }

    fn clear_tick_flag(&self) {
        self.tick_running.store(false, Ordering::Release);
    }

    /// First persona answers `prompt`, second answers the first; the pair is stored
    ///
    /// # Errors
    ///
    /// Returns the remote or store error of the failing step
    pub async fn exchange(&self, prompt: &str) -> AppResult<Exchange> {
        let message = self.poller.prompt(PersonaSlot::First, prompt).await?;
        let response = self.poller.prompt(PersonaSlot::Second, &message).await?;
        self.exchanges.create(&message, &response).await
    }

    /// Continue the conversation from the latest stored exchange
    ///
    /// Errors are logged and reported as [`TickOutcome::Failed`].
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = self.try_acquire_tick() else {
            warn!("Previous conversation tick still running, skipping");
            return TickOutcome::Skipped;
        };

        let previous = match self.exchanges.latest().await {
            Ok(Some(previous)) => previous,
            Ok(None) => {
                error!("No previous exchange to continue the conversation from");
                return TickOutcome::NoPreviousExchange;
            }
            Err(e) => {
                error!(error = %e, "Failed to load the latest exchange");
                return TickOutcome::Failed;
            }
        };

        match self.exchange(&previous.response).await {
            Ok(exchange) => {
                info!(
                    previous_id = previous.id,
                    exchange_id = exchange.id,
                    "Conversation tick stored a new exchange"
                );
                TickOutcome::Completed(exchange)
            }
            Err(e) => {
                error!(previous_id = previous.id, error = %e, "Conversation tick failed");
                TickOutcome::Failed
            }
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Armed timer, the id of its single job and its cancellation flag
struct ArmedTask {
    scheduler: JobScheduler,
    job_id: Uuid,
    cancelled: Arc<AtomicBool>,
}

enum TimerState {
    Idle,
    /// Seed exchange in progress; the lock is not held meanwhile
    Starting,
    Armed(ArmedTask),
}

/// Returns a `Starting` state to `Idle` unless it was armed first
struct StartingGuard<'a> {
    scheduler: &'a ConversationScheduler,
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.scheduler.lock_state();
        if matches!(*state, TimerState::Starting) {
            *state = TimerState::Idle;
        }
    }
}

/// Owns the conversation timer; `start` and `stop` are its only mutators
pub struct ConversationScheduler {
    conversation: Arc<ConversationLoop>,
    schedule: String,
    timezone: ScheduleTimezone,
    state: Mutex<TimerState>,
}

impl ConversationScheduler {
    /// Create a disarmed scheduler firing on `schedule` (six-field cron, host local time)
    pub fn new(conversation: Arc<ConversationLoop>, schedule: impl Into<String>) -> Self {
        Self {
            conversation,
            schedule: schedule.into(),
            timezone: ScheduleTimezone::Local,
            state: Mutex::new(TimerState::Idle),
        }
    }

    /// Evaluate the schedule against `timezone` instead of host local time
    #[must_use]
    pub const fn with_timezone(mut self, timezone: ScheduleTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// The loop run by each tick
    #[must_use]
    pub const fn conversation(&self) -> &Arc<ConversationLoop> {
        &self.conversation
    }

    /// Cron expression of the timer
    #[must_use]
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Clock the schedule is evaluated against
    #[must_use]
    pub const fn timezone(&self) -> ScheduleTimezone {
        self.timezone
    }

    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Conversation timer lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a timer is armed
    ///
    /// A scheduler still running its seed exchange is not active yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(*self.lock_state(), TimerState::Armed(_))
    }

    /// Whether a start is running its seed exchange
    #[must_use]
    pub fn is_starting(&self) -> bool {
        matches!(*self.lock_state(), TimerState::Starting)
    }

    /// Job id of the armed timer
    #[must_use]
    pub fn active_job_id(&self) -> Option<Uuid> {
        match &*self.lock_state() {
            TimerState::Armed(task) => Some(task.job_id),
            TimerState::Idle | TimerState::Starting => None,
        }
    }

    /// Run one seed exchange from `seed_prompt`, then arm the timer
    ///
    /// An already armed timer, or a start still seeding, is left untouched.
    /// The state lock is only held to claim and to publish the timer, so
    /// `stop` and `is_active` answer while the seed exchange is polling.
    ///
    /// # Errors
    ///
    /// Returns the error of the seed exchange or of arming the timer; the
    /// scheduler stays disarmed in both cases.
    #[instrument(skip(self, seed_prompt))]
    pub async fn start(&self, seed_prompt: &str) -> AppResult<StartOutcome> {
        {
            let mut state = self.lock_state();
            match &*state {
                TimerState::Armed(task) => {
                    warn!(job_id = %task.job_id, "Conversation already active");
                    return Ok(StartOutcome::AlreadyActive);
                }
                TimerState::Starting => {
                    warn!("Conversation is already starting");
                    return Ok(StartOutcome::AlreadyActive);
                }
                TimerState::Idle => *state = TimerState::Starting,
            }
        }
        let _starting = StartingGuard { scheduler: self };

        let seed = self.conversation.exchange(seed_prompt).await?;
        let task = self.arm().await?;

        info!(
            exchange_id = seed.id,
            job_id = %task.job_id,
            schedule = %self.schedule,
            timezone = %self.timezone,
            "Conversation started"
        );
        *self.lock_state() = TimerState::Armed(task);
        Ok(StartOutcome::Started(seed.prompt))
    }

    /// Cancel the timer and clear the tick-running flag
    ///
    /// No tick starts after this returns. A tick already in progress runs
    /// to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if no timer is armed, including while a start is
    /// still running its seed exchange
    #[instrument(skip(self))]
    pub async fn stop(&self) -> AppResult<()> {
        let mut task = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, TimerState::Idle) {
                TimerState::Armed(task) => task,
                other => {
                    *state = other;
                    return Err(AppError::internal("No active conversation to stop"));
                }
            }
        };

        task.cancelled.store(true, Ordering::Release);
        if let Err(e) = task.scheduler.remove(&task.job_id).await {
            warn!(job_id = %task.job_id, error = %e, "Error removing conversation job");
        }
        if let Err(e) = task.scheduler.shutdown().await {
            error!(job_id = %task.job_id, error = %e, "Error shutting down conversation timer");
        }
        self.conversation.clear_tick_flag();

        info!(job_id = %task.job_id, "Conversation stopped");
        Ok(())
    }

    /// Run one tick now, outside the timer
    pub async fn tick(&self) -> TickOutcome {
        self.conversation.tick().await
    }

    async fn arm(&self) -> AppResult<ArmedTask> {
        let mut scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let conversation = Arc::clone(&self.conversation);
        let job = match self.timezone {
            ScheduleTimezone::Local => {
                conversation_job(&self.schedule, Local, conversation, Arc::clone(&cancelled))
            }
            ScheduleTimezone::Utc => {
                conversation_job(&self.schedule, Utc, conversation, Arc::clone(&cancelled))
            }
        }
        .map_err(|e| {
            AppError::config(format!(
                "Invalid conversation schedule '{}': {e}",
                self.schedule
            ))
        })?;

        let job_id = scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add conversation job: {e}")))?;

        if let Err(e) = scheduler.start().await {
            if let Err(shutdown_error) = scheduler.shutdown().await {
                warn!(error = %shutdown_error, "Error discarding unstarted scheduler");
            }
            return Err(AppError::internal(format!(
                "Failed to start conversation timer: {e}"
            )));
        }

        Ok(ArmedTask {
            scheduler,
            job_id,
            cancelled,
        })
    }
}

/// Cron job running one tick per fire until `cancelled` is raised
fn conversation_job<TZ: TimeZone>(
    schedule: &str,
    timezone: TZ,
    conversation: Arc<ConversationLoop>,
    cancelled: Arc<AtomicBool>,
) -> Result<Job, JobSchedulerError> {
    Job::new_async_tz(schedule, timezone, move |_uuid, _lock| {
        let conversation = Arc::clone(&conversation);
        let cancelled = Arc::clone(&cancelled);
        Box::pin(async move {
            if cancelled.load(Ordering::Acquire) {
                debug!("Conversation timer fired after stop, ignoring");
                return;
            }
            conversation.tick().await;
        })
    })
}
