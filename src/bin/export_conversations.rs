// ABOUTME: Export binary writing every stored exchange to a dated JSON file
// ABOUTME: Logs the id range and a short preview of the first entries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::{Context, Result};
use clap::Parser;
use interlocutor::{
    config::{DatabaseUrl, ServerConfig},
    database::{ConversationExport, Database},
    logging,
};
use std::path::PathBuf;
use tracing::info;

/// Number of entries shown in the preview
const PREVIEW_ENTRIES: usize = 3;

#[derive(Parser)]
#[command(name = "export-conversations")]
#[command(about = "Export all stored exchanges to conversations-export-YYYY-MM-DD.json")]
pub struct Args {
    /// Directory the export file is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Database URL, overriding `DATABASE_URL`
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::from_env()?;
    logging::init_from_env()?;

    let url = match args.database_url {
        Some(raw) => DatabaseUrl::parse_url(&raw)?,
        None => config
            .database
            .url
            .context("DATABASE_URL is not set and --database-url was not given")?,
    };

    let database = Database::connect(&url).await?;
    let export = ConversationExport::collect(&database.exchanges(), chrono::Utc::now()).await?;
    let path = export.write_to(&args.output_dir).await?;

    info!(
        path = %path.display(),
        total = export.total_entries,
        "Export written"
    );
    if let Some((first, last)) = export.id_range() {
        info!(first_id = first, last_id = last, "Exported id range");
    }
    for line in export.preview(PREVIEW_ENTRIES) {
        info!("{line}");
    }

    database.pool().close().await;
    Ok(())
}
