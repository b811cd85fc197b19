// ABOUTME: Route module organization for the interlocutor HTTP endpoints
// ABOUTME: Groups chat, conversation loop and health routes by domain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module
//!
//! Each domain module contains route definitions and thin handlers that
//! delegate to the store, the completion poller or the scheduler.

/// Prompt relay and stored exchange routes
pub mod chat;
/// Start and stop of the scheduled conversation
pub mod conversation;
/// Health check route
pub mod health;

/// Chat route handlers
pub use chat::ChatRoutes;
/// Conversation route handlers
pub use conversation::ConversationRoutes;
/// Health route handlers
pub use health::HealthRoutes;
