// ABOUTME: HTTP server assembly: router construction, listener and graceful shutdown
// ABOUTME: Protects chat and conversation routes with the API key guard and leaves /health open
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server
//!
//! [`build_router`] wires every route over shared [`ServerResources`];
//! [`run`] binds the listener and serves until Ctrl-C or SIGTERM, then stops
//! an armed conversation timer.

mod resources;

pub use resources::ServerResources;

use axum::body::Body;
use axum::http::Request;
use axum::{middleware, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::errors::{AppError, AppResult};
use crate::middleware::{create_request_span, require_api_key, setup_cors, ApiKeyAuth};
use crate::routes::{ChatRoutes, ConversationRoutes, HealthRoutes};

/// Build the complete application router
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let auth = ApiKeyAuth::new(resources.config.auth.api_key.clone());

    let protected = Router::new()
        .merge(ChatRoutes::routes(Arc::clone(&resources)))
        .merge(ConversationRoutes::routes(Arc::clone(&resources)))
        .route_layer(middleware::from_fn_with_state(auth, require_api_key));

    Router::new()
        .merge(HealthRoutes::routes())
        .merge(protected)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            create_request_span(request)
        }))
        .layer(setup_cors(&resources.config.cors))
}

/// Serve HTTP until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails
pub async fn run(resources: Arc<ServerResources>) -> AppResult<()> {
    let config = &resources.config;
    let addr = format!("{}:{}", config.host, config.http_port);

    if config.auth.api_key.is_none() {
        warn!("API_KEY is not set: authentication is DISABLED and every route is open");
    }

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::config(format!("Failed to bind {addr}: {e}")))?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, build_router(Arc::clone(&resources)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("HTTP server error: {e}")))?;

    resources.shutdown().await;
    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
