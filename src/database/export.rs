// ABOUTME: JSON snapshot of every stored exchange for offline backup
// ABOUTME: Builds the export document, its dated file name and a short textual preview
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Exchange, ExchangeManager};
use crate::errors::{AppError, AppResult};

/// Characters kept from each field in a preview line
const PREVIEW_CHARS: usize = 80;

/// Exported exchange
pub type ExportEntry = Exchange;

/// Export document written by `export-conversations`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationExport {
    /// Time of the snapshot (RFC 3339)
    pub export_date: DateTime<Utc>,
    /// Number of exported exchanges
    pub total_entries: usize,
    /// Exchanges in ascending id order
    pub conversations: Vec<ExportEntry>,
}

impl ConversationExport {
    /// Snapshot all exchanges at `now`
    ///
    /// # Errors
    ///
    /// Returns an error if the exchanges cannot be read
    pub async fn collect(exchanges: &ExchangeManager, now: DateTime<Utc>) -> AppResult<Self> {
        let conversations = exchanges.list().await?;
        Ok(Self {
            export_date: now,
            total_entries: conversations.len(),
            conversations,
        })
    }

    /// `conversations-export-YYYY-MM-DD.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "conversations-export-{}.json",
            self.export_date.format("%Y-%m-%d")
        )
    }

    /// Write the document as pretty JSON into `dir`; returns the file path
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails
    pub async fn write_to(&self, dir: &Path) -> AppResult<PathBuf> {
        let path = dir.join(self.file_name());
        let body = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, body).await.map_err(|e| {
            AppError::internal(format!("Failed to write {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    /// Id range of the exported exchanges
    #[must_use]
    pub fn id_range(&self) -> Option<(i64, i64)> {
        let first = self.conversations.first()?;
        let last = self.conversations.last()?;
        Some((first.id, last.id))
    }

    /// One line per exchange for the first `count` entries, fields truncated
    #[must_use]
    pub fn preview(&self, count: usize) -> Vec<String> {
        self.conversations
            .iter()
            .take(count)
            .map(|entry| {
                format!(
                    "#{} prompt: {} | response: {}",
                    entry.id,
                    truncate(&entry.prompt),
                    truncate(&entry.response)
                )
            })
            .collect()
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_owned()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn export(conversations: Vec<Exchange>) -> ConversationExport {
        ConversationExport {
            export_date: Utc.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).unwrap(),
            total_entries: conversations.len(),
            conversations,
        }
    }

    #[test]
    fn test_file_name_uses_export_day() {
        assert_eq!(
            export(Vec::new()).file_name(),
            "conversations-export-2025-03-09.json"
        );
    }

    #[test]
    fn test_preview_truncates_long_fields() {
        let long = "x".repeat(100);
        let doc = export(vec![
            Exchange {
                id: 1,
                prompt: long.clone(),
                response: "short".to_owned(),
            },
            Exchange {
                id: 2,
                prompt: "b".to_owned(),
                response: "c".to_owned(),
            },
        ]);

        let preview = doc.preview(3);
        assert_eq!(preview.len(), 2);
        assert!(preview[0].contains(&format!("{}...", "x".repeat(80))));
        assert!(!preview[0].contains(&long));
        assert!(preview[0].ends_with("response: short"));
        assert_eq!(doc.id_range(), Some((1, 2)));
    }

    #[test]
    fn test_document_uses_camel_case_keys() {
        let value = serde_json::to_value(export(Vec::new())).unwrap();
        assert!(value.get("exportDate").is_some());
        assert_eq!(value["totalEntries"], 0);
        assert!(value["conversations"].as_array().unwrap().is_empty());
    }
}
