use super::document::Document;
use super::query::QueryWindow;

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_rows() -> usize {
    100
}

/// Description of one archival extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalJob {
    pub collection: String,
    /// Main query; `*:*` when absent.
    #[serde(default)]
    pub query_text: Option<String>,
    /// Cursor filter, e.g. `logtime:{${logtime} TO ${end}]`.
    #[serde(default)]
    pub filter_query_text: Option<String>,
    #[serde(default)]
    pub sort_columns: Vec<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    #[serde(default = "default_rows")]
    pub rows: usize,
}

impl ArchivalJob {
    pub fn window(&self) -> QueryWindow {
        QueryWindow {
            start: self.start.clone(),
            end: self.end.clone(),
            ttl: self.ttl_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveRequest {
    pub job: ArchivalJob,
    /// Resume after this document.
    #[serde(default)]
    pub cursor: Option<Document>,
    /// Stop after this many documents.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveResponse {
    pub file: String,
    pub written: usize,
    pub end: Option<String>,
    /// Last document written; pass it back as `cursor` to continue.
    pub cursor: Option<Document>,
    /// Set when the run stopped early; `cursor` is still the resume point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of every `/archive` reply. A failed run carries its error text instead
/// of a result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ArchiveResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
