// ABOUTME: Server binary: loads configuration, bootstraps resources and serves the HTTP API
// ABOUTME: Stops an armed conversation timer on Ctrl-C or SIGTERM before exiting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Interlocutor Server Binary
//!
//! Relays prompts to `OpenAI` assistants, stores exchanges and serves the
//! conversation loop controls.

use anyhow::Result;
use clap::Parser;
use interlocutor::{
    config::ServerConfig,
    logging,
    server::{self, ServerResources},
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "interlocutor-server")]
#[command(about = "Interlocutor - HTTP relay to OpenAI assistants with a scheduled conversation loop")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override listen address
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    logging::init_from_env()?;

    info!("Starting Interlocutor server");
    info!("{}", config.summary());

    let resources = Arc::new(ServerResources::bootstrap(config).await);
    display_available_endpoints(&resources.config);

    if let Err(e) = server::run(resources).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Display all available API endpoints
#[allow(clippy::cognitive_complexity)]
fn display_available_endpoints(config: &ServerConfig) {
    let host = &config.host;
    let port = config.http_port;

    info!("=== Available API Endpoints ===");
    info!("Chat:");
    info!("   Send Prompt:       POST   http://{host}:{port}/chat");
    info!("   List Exchanges:    GET    http://{host}:{port}/chat");
    info!("   Latest Exchange:   GET    http://{host}:{port}/latest-chat");
    info!("   Paginate:          POST   http://{host}:{port}/paginate-chat");
    info!("   Delete One:        DELETE http://{host}:{port}/chat/{{id}}");
    info!("   Delete From Id:    DELETE http://{host}:{port}/after-chat/{{id}}");
    info!("   Delete All:        DELETE http://{host}:{port}/chat");
    info!("Conversation:");
    info!("   Start:             POST   http://{host}:{port}/start-conversation");
    info!("   Stop:              POST   http://{host}:{port}/stop-conversation");
    info!("Monitoring:");
    info!("   Health Check:      GET    http://{host}:{port}/health");
    info!("=== End of Endpoint List ===");
}
