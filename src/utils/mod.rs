// ABOUTME: Utility modules for common functionality across the application
// ABOUTME: Contains the bounded retry combinator and text sanitizers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Bounded exponential-backoff retry combinator
pub mod retry;
/// Removal of citation markers from assistant replies
pub mod text;
