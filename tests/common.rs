// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory stores, test configuration and assembled server resources
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `interlocutor`

use anyhow::Result;
use interlocutor::{
    completion::CompletionPoller,
    config::{AuthConfig, DatabaseUrl, ScheduleTimezone, SchedulerConfig, ServerConfig},
    database::{Database, ExchangeManager},
    server::ServerResources,
};
use std::sync::{Arc, Once};

/// Midnight on January 1st, so the armed timer never fires during a test
pub const DORMANT_SCHEDULE: &str = "0 0 0 1 1 *";
/// Fires at the start of every second
pub const EVERY_SECOND_SCHEDULE: &str = "* * * * * *";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Fresh in-memory database with the schema applied
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::connect(&DatabaseUrl::Memory).await?)
}

/// Exchange store over a fresh in-memory database
pub async fn create_test_exchanges() -> Result<ExchangeManager> {
    Ok(create_test_database().await?.exchanges())
}

/// Configuration for tests: optional API key and a dormant timer
pub fn create_test_config(api_key: Option<&str>) -> ServerConfig {
    ServerConfig {
        auth: AuthConfig {
            api_key: api_key.map(ToOwned::to_owned),
        },
        scheduler: SchedulerConfig {
            schedule: DORMANT_SCHEDULE.to_owned(),
            timezone: ScheduleTimezone::Utc,
        },
        ..ServerConfig::default()
    }
}

/// Server resources with every component configured around `poller`
pub async fn create_test_server_resources(
    api_key: Option<&str>,
    poller: Arc<CompletionPoller>,
) -> Result<(Arc<ServerResources>, ExchangeManager)> {
    let exchanges = create_test_exchanges().await?;
    let resources = ServerResources::new(
        Arc::new(create_test_config(api_key)),
        Some(exchanges.clone()),
        Some(poller),
    );
    Ok((Arc::new(resources), exchanges))
}

/// Server resources with neither a store nor a remote client
pub fn create_unconfigured_server_resources(api_key: Option<&str>) -> Arc<ServerResources> {
    init_test_logging();
    Arc::new(ServerResources::new(
        Arc::new(create_test_config(api_key)),
        None,
        None,
    ))
}
