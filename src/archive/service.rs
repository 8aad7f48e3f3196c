//! Archive Export
//!
//! Runs an [`ArchivalJob`] to completion (or to its limit) and writes the
//! documents as JSON lines. A failing page stops the run without discarding
//! what was already written: the response still names the last written
//! document so the caller can resume from it.

use super::http::HttpQuerySource;
use super::reader::{ArchivalReader, QuerySource};
use super::types::{ArchiveRequest, ArchiveResponse};
use crate::error::ArchiveError;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

pub struct ArchiveService {
    client: reqwest::Client,
    base_url: String,
    data_folder: PathBuf,
}

impl ArchiveService {
    pub fn new(client: reqwest::Client, base_url: &str, data_folder: &Path) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            data_folder: data_folder.to_path_buf(),
        }
    }

    /// Output file for one run of `collection`.
    pub fn output_path(&self, collection: &str) -> PathBuf {
        self.data_folder
            .join(format!("{}-{}.jsonl", collection, Uuid::new_v4()))
    }

    pub async fn archive(&self, request: ArchiveRequest) -> Result<ArchiveResponse, ArchiveError> {
        let source = Arc::new(HttpQuerySource::new(
            self.client.clone(),
            &self.base_url,
            &request.job.collection,
        ));
        tracing::info!(
            "Archiving '{}' from {}",
            request.job.collection,
            source.select_url()
        );

        let file = self.output_path(&request.job.collection);
        export_documents(source, &request, &file, Utc::now()).await
    }
}

/// Streams the job's documents into `file`, one JSON object per line.
pub async fn export_documents(
    source: Arc<dyn QuerySource>,
    request: &ArchiveRequest,
    file: &Path,
    now: DateTime<Utc>,
) -> Result<ArchiveResponse, ArchiveError> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let reader = ArchivalReader::new(source, &request.job, now)?;
    let mut pages = reader.open(request.cursor.clone(), request.job.rows);
    let mut out = BufWriter::new(tokio::fs::File::create(file).await?);

    let mut written = 0usize;
    let mut cursor = request.cursor.clone();
    let mut error = None;

    while request.limit.map_or(true, |limit| written < limit) {
        let document = match pages.next().await {
            Ok(Some(document)) => document,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(
                    "Archiving '{}' stopped after {} document(s): {}",
                    request.job.collection,
                    written,
                    e
                );
                error = Some(e.to_string());
                break;
            }
        };

        let mut line = serde_json::to_vec(&document)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        written += 1;
        cursor = Some(document);
    }

    out.flush().await?;
    tracing::info!(
        "Archived {} document(s) of '{}' to {}",
        written,
        request.job.collection,
        file.display()
    );

    Ok(ArchiveResponse {
        file: file.display().to_string(),
        written,
        end: reader.window().end.clone(),
        cursor,
        error,
    })
}
