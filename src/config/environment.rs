// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed server, remote API and scheduler settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::constants::{defaults, env_vars};
use crate::errors::{AppError, AppResult};
use crate::utils::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path of the database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns a configuration error for database backends other than `SQLite`
    pub fn parse_url(s: &str) -> AppResult<Self> {
        if s.starts_with("postgresql://") || s.starts_with("postgres://") {
            return Err(AppError::config(
                "PostgreSQL is not supported; use a sqlite: DATABASE_URL",
            ));
        }
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Ok(Self::Memory)
        } else {
            Ok(Self::SQLite {
                path: PathBuf::from(path_str.trim_start_matches("//")),
            })
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Persistence settings
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Database location; `None` disables persistence entirely
    pub url: Option<DatabaseUrl>,
}

/// HTTP authentication settings
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer key; `None` disables authentication (fail-open)
    pub api_key: Option<String>,
}

/// `OpenAI` Assistants API settings
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key; `None` leaves the remote client unconfigured
    pub api_key: Option<String>,
    /// API root
    pub base_url: String,
    /// Value sent in the `OpenAI-Beta` header
    pub beta_header: String,
    /// Assistant id of the first interlocutor
    pub first_assistant_id: Option<String>,
    /// Assistant id of the second interlocutor
    pub second_assistant_id: Option<String>,
    /// Text appended verbatim to every prompt
    pub prompt_suffix: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::OPENAI_BASE_URL.to_owned(),
            beta_header: defaults::OPENAI_BETA_HEADER.to_owned(),
            first_assistant_id: None,
            second_assistant_id: None,
            prompt_suffix: None,
        }
    }
}

impl OpenAiConfig {
    /// Whether the key and both assistant ids are present
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.api_key.is_some()
            && self.first_assistant_id.is_some()
            && self.second_assistant_id.is_some()
    }
}

/// Run status polling settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Total number of status polls per run
    pub max_attempts: u32,
    /// Delay before the second poll
    pub initial_backoff_ms: u64,
    /// Upper bound of any single delay
    pub max_backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::POLL_MAX_ATTEMPTS,
            initial_backoff_ms: defaults::POLL_INITIAL_BACKOFF_MS,
            max_backoff_ms: defaults::POLL_MAX_BACKOFF_MS,
        }
    }
}

impl PollingConfig {
    /// Build the retry policy used by the completion poller
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: defaults::POLL_BACKOFF_MULTIPLIER,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Clock the conversation schedule is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleTimezone {
    /// Host local time
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

impl ScheduleTimezone {
    /// Lowercase name as accepted in configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Utc => "utc",
        }
    }
}

impl FromStr for ScheduleTimezone {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(AppError::config(format!(
                "Invalid {} value '{other}': expected 'local' or 'utc'",
                env_vars::CONVERSATION_TIMEZONE
            ))),
        }
    }
}

impl std::fmt::Display for ScheduleTimezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation loop settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Six-field cron expression (sec min hour dom mon dow)
    pub schedule: String,
    /// Clock the schedule is evaluated against
    pub timezone: ScheduleTimezone,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule: defaults::CONVERSATION_SCHEDULE.to_owned(),
            timezone: ScheduleTimezone::default(),
        }
    }
}

/// CORS settings
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma separated origins, or `*`
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: defaults::CORS_ALLOWED_ORIGINS.to_owned(),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// HTTP listen address
    pub host: String,
    /// Persistence settings
    pub database: DatabaseConfig,
    /// Authentication settings
    pub auth: AuthConfig,
    /// Remote API settings
    pub openai: OpenAiConfig,
    /// Run polling settings
    pub polling: PollingConfig,
    /// Conversation loop settings
    pub scheduler: SchedulerConfig,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: defaults::HTTP_PORT,
            host: defaults::HOST.to_owned(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            openai: OpenAiConfig::default(),
            polling: PollingConfig::default(),
            scheduler: SchedulerConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed or a value is out of range
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Empty values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed or a value is out of range
    pub fn from_vars<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var(env_vars::DATABASE_URL)
            .map(|url| DatabaseUrl::parse_url(&url))
            .transpose()?;

        let config = Self {
            http_port: parse_or(&var, env_vars::HTTP_PORT, defaults::HTTP_PORT)?,
            host: var(env_vars::HOST).unwrap_or_else(|| defaults::HOST.to_owned()),
            database: DatabaseConfig { url: database_url },
            auth: AuthConfig {
                api_key: var(env_vars::API_KEY),
            },
            openai: OpenAiConfig {
                api_key: var(env_vars::OPENAI_API_KEY),
                base_url: var(env_vars::OPENAI_BASE_URL)
                    .unwrap_or_else(|| defaults::OPENAI_BASE_URL.to_owned()),
                beta_header: var(env_vars::OPENAI_BETA_HEADER)
                    .unwrap_or_else(|| defaults::OPENAI_BETA_HEADER.to_owned()),
                first_assistant_id: var(env_vars::FIRST_ASSISTANT_ID),
                second_assistant_id: var(env_vars::SECOND_ASSISTANT_ID),
                // Suffix is appended verbatim, so it is not trimmed
                prompt_suffix: lookup(env_vars::PROMPT_SUFFIX).filter(|v| !v.is_empty()),
            },
            polling: PollingConfig {
                max_attempts: parse_or(
                    &var,
                    env_vars::POLL_MAX_ATTEMPTS,
                    defaults::POLL_MAX_ATTEMPTS,
                )?,
                initial_backoff_ms: parse_or(
                    &var,
                    env_vars::POLL_INITIAL_BACKOFF_MS,
                    defaults::POLL_INITIAL_BACKOFF_MS,
                )?,
                max_backoff_ms: parse_or(
                    &var,
                    env_vars::POLL_MAX_BACKOFF_MS,
                    defaults::POLL_MAX_BACKOFF_MS,
                )?,
            },
            scheduler: SchedulerConfig {
                schedule: var(env_vars::CONVERSATION_SCHEDULE)
                    .unwrap_or_else(|| defaults::CONVERSATION_SCHEDULE.to_owned()),
                timezone: var(env_vars::CONVERSATION_TIMEZONE)
                    .map(|raw| raw.parse())
                    .transpose()?
                    .unwrap_or_default(),
            },
            cors: CorsConfig {
                allowed_origins: var(env_vars::CORS_ALLOWED_ORIGINS)
                    .unwrap_or_else(|| defaults::CORS_ALLOWED_ORIGINS.to_owned()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error if the polling bound is zero or the backoff window is inverted
    pub fn validate(&self) -> AppResult<()> {
        if self.polling.max_attempts == 0 {
            return Err(AppError::config(format!(
                "{} must be at least 1",
                env_vars::POLL_MAX_ATTEMPTS
            )));
        }
        if self.polling.max_backoff_ms < self.polling.initial_backoff_ms {
            return Err(AppError::config(format!(
                "{} must not be smaller than {}",
                env_vars::POLL_MAX_BACKOFF_MS,
                env_vars::POLL_INITIAL_BACKOFF_MS
            )));
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        let enabled = |on: bool| if on { "Enabled" } else { "Disabled" };
        format!(
            "Interlocutor Server Configuration:\n\
             - HTTP: {}:{}\n\
             - Database: {}\n\
             - API Key Authentication: {}\n\
             - OpenAI Client: {}\n\
             - OpenAI Base URL: {}\n\
             - Prompt Suffix: {}\n\
             - Poll Attempts: {} (backoff {}ms..{}ms)\n\
             - Conversation Schedule: {} ({})\n\
             - CORS Origins: {}",
            self.host,
            self.http_port,
            self.database
                .url
                .as_ref()
                .map_or_else(|| "Disabled".to_owned(), ToString::to_string),
            enabled(self.auth.api_key.is_some()),
            enabled(self.openai.is_complete()),
            self.openai.base_url,
            enabled(self.openai.prompt_suffix.is_some()),
            self.polling.max_attempts,
            self.polling.initial_backoff_ms,
            self.polling.max_backoff_ms,
            self.scheduler.schedule,
            self.scheduler.timezone,
            self.cors.allowed_origins,
        )
    }
}

/// Parse an optional variable, falling back to `default` when absent
fn parse_or<T, F>(var: &F, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}")))
    })
}
