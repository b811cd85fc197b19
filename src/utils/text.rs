// ABOUTME: Text sanitizers applied to assistant replies before they are returned
// ABOUTME: Strips the 【…†…】 file citation markers produced by retrieval-enabled assistants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use regex::Regex;
use std::sync::LazyLock;

/// Lenticular-bracket citation token such as `【4†source】`
static CITATION_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"【.*?†.*?】").ok());

/// Remove every citation marker from `input`
///
/// Text without markers is returned unchanged.
#[must_use]
pub fn strip_citations(input: &str) -> String {
    match CITATION_MARKER.as_ref() {
        Some(pattern) => pattern.replace_all(input, "").into_owned(),
        None => input.to_owned(),
    }
}
