// ABOUTME: Integration tests for loading server configuration from the process environment
// ABOUTME: Runs serially because each test mutates environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use interlocutor::config::{DatabaseUrl, ScheduleTimezone, ServerConfig};
use interlocutor::constants::env_vars;
use interlocutor::errors::ErrorCode;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const ALL_VARS: [&str; 16] = [
    env_vars::HTTP_PORT,
    env_vars::HOST,
    env_vars::DATABASE_URL,
    env_vars::API_KEY,
    env_vars::OPENAI_API_KEY,
    env_vars::OPENAI_BASE_URL,
    env_vars::OPENAI_BETA_HEADER,
    env_vars::FIRST_ASSISTANT_ID,
    env_vars::SECOND_ASSISTANT_ID,
    env_vars::PROMPT_SUFFIX,
    env_vars::POLL_MAX_ATTEMPTS,
    env_vars::POLL_INITIAL_BACKOFF_MS,
    env_vars::POLL_MAX_BACKOFF_MS,
    env_vars::CONVERSATION_SCHEDULE,
    env_vars::CONVERSATION_TIMEZONE,
    env_vars::CORS_ALLOWED_ORIGINS,
];

fn clear_env() {
    for key in ALL_VARS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_with_nothing_set_uses_defaults() {
    clear_env();

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8080);
    assert!(config.database.url.is_none());
    assert!(config.auth.api_key.is_none());
    assert!(!config.openai.is_complete());
    assert_eq!(config.openai.beta_header, "assistants=v2");
    assert_eq!(config.polling.max_attempts, 10);
    assert_eq!(config.scheduler.schedule, "0 0 8-20 * * *");
    assert_eq!(config.scheduler.timezone, ScheduleTimezone::Local);
}

#[test]
#[serial]
fn test_from_env_reads_service_settings() {
    clear_env();
    env::set_var(env_vars::HTTP_PORT, "9090");
    env::set_var(env_vars::DATABASE_URL, "sqlite:./data/chat.db");
    env::set_var(env_vars::API_KEY, "secret");
    env::set_var(env_vars::OPENAI_API_KEY, "sk-test");
    env::set_var(env_vars::FIRST_ASSISTANT_ID, "asst_a");
    env::set_var(env_vars::SECOND_ASSISTANT_ID, "asst_b");
    env::set_var(env_vars::PROMPT_SUFFIX, " Keep it short.");
    env::set_var(env_vars::POLL_MAX_ATTEMPTS, "3");
    env::set_var(env_vars::POLL_INITIAL_BACKOFF_MS, "250");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.http_port, 9090);
    assert_eq!(
        config.database.url,
        Some(DatabaseUrl::SQLite {
            path: PathBuf::from("./data/chat.db")
        })
    );
    assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
    assert!(config.openai.is_complete());
    assert_eq!(config.openai.prompt_suffix.as_deref(), Some(" Keep it short."));

    let policy = config.polling.retry_policy();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff_after(1), Duration::from_millis(250));
    assert_eq!(policy.backoff_after(2), Duration::from_millis(500));
}

#[test]
#[serial]
fn test_from_env_rejects_postgres_url() {
    clear_env();
    env::set_var(env_vars::DATABASE_URL, "postgres://user@localhost/chat");

    let error = ServerConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(error.code, ErrorCode::ConfigError);
}

#[test]
#[serial]
fn test_from_env_rejects_zero_poll_attempts() {
    clear_env();
    env::set_var(env_vars::POLL_MAX_ATTEMPTS, "0");

    let error = ServerConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(error.code, ErrorCode::ConfigError);
    assert!(error.message.contains(env_vars::POLL_MAX_ATTEMPTS));
}

#[test]
#[serial]
fn test_summary_never_contains_keys() {
    clear_env();
    env::set_var(env_vars::API_KEY, "very-secret-api-key");
    env::set_var(env_vars::OPENAI_API_KEY, "sk-very-secret");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    let summary = config.summary();
    assert!(!summary.contains("very-secret-api-key"));
    assert!(!summary.contains("sk-very-secret"));
    assert!(summary.contains("API Key Authentication: Enabled"));
}

#[test]
#[serial]
fn test_from_env_reads_schedule_timezone() {
    clear_env();
    env::set_var(env_vars::CONVERSATION_SCHEDULE, "0 30 9 * * Mon-Fri");
    env::set_var(env_vars::CONVERSATION_TIMEZONE, "utc");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.scheduler.schedule, "0 30 9 * * Mon-Fri");
    assert_eq!(config.scheduler.timezone, ScheduleTimezone::Utc);
}
