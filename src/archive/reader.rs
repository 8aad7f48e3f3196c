//! Archival Reader
//!
//! Pulls documents page by page from a [`QuerySource`]. Each page request is a
//! self-contained query: the window comes from the job, and the position comes
//! from the cursor document (the last document of the previous page) rendered
//! into the filter query. No server-side cursor survives between requests, so
//! a run can be resumed from any document it has already emitted.

use super::document::Document;
use super::query::{QueryWindow, SearchQuery, SearchQueryBuilder};
use super::types::ArchivalJob;
use crate::error::ArchiveError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

/// Executes one page request and returns owned documents; whatever the request
/// held open is released before this returns.
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn query(&self, query: &SearchQuery) -> Result<Vec<Document>, ArchiveError>;
}

#[derive(Clone)]
pub struct ArchivalReader {
    source: Arc<dyn QuerySource>,
    builder: SearchQueryBuilder,
    window: QueryWindow,
}

impl ArchivalReader {
    /// Creates a reader whose end boundary is fixed against `now` for its lifetime.
    pub fn new(
        source: Arc<dyn QuerySource>,
        job: &ArchivalJob,
        now: DateTime<Utc>,
    ) -> Result<Self, ArchiveError> {
        let window = job.window().resolve(now)?;

        let mut builder = SearchQueryBuilder::new()
            .window(&window)
            .add_sort(&job.sort_columns);
        if let Some(text) = &job.query_text {
            builder = builder.query_text(text.clone());
        }
        if let Some(text) = &job.filter_query_text {
            builder = builder.filter_query_text(text.clone());
        }

        tracing::info!(
            "Archival window for '{}': start={:?} end={:?}",
            job.collection,
            window.start,
            window.end
        );

        Ok(Self {
            source,
            builder,
            window,
        })
    }

    pub fn window(&self) -> &QueryWindow {
        &self.window
    }

    /// The page request following `cursor`.
    ///
    /// With a cursor the filter query must render from the cursor's fields;
    /// otherwise the request would return the first page again.
    pub fn query_for(
        &self,
        cursor: Option<&Document>,
        rows: usize,
    ) -> Result<SearchQuery, ArchiveError> {
        let builder = self.builder.clone().document(cursor.cloned()).rows(rows);

        if cursor.is_some() && !builder.filter_follows_document() {
            return Err(ArchiveError::UnboundedCursor);
        }
        Ok(builder.build())
    }

    /// Lazy document sequence starting after `cursor` (or at the beginning).
    pub fn open(&self, cursor: Option<Document>, rows: usize) -> DocumentPages {
        DocumentPages {
            reader: self.clone(),
            cursor,
            rows: rows.max(1),
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

/// Iterator over the pages of one archival run.
pub struct DocumentPages {
    reader: ArchivalReader,
    cursor: Option<Document>,
    rows: usize,
    buffer: VecDeque<Document>,
    exhausted: bool,
}

impl DocumentPages {
    /// Next document, fetching a new page when the current one is used up.
    /// `Ok(None)` once a short page has been drained.
    pub async fn next(&mut self) -> Result<Option<Document>, ArchiveError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }

        match self.buffer.pop_front() {
            Some(document) => {
                self.cursor = Some(document.clone());
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    /// The last document handed out; the resume point after a failure.
    pub fn cursor(&self) -> Option<&Document> {
        self.cursor.as_ref()
    }

    async fn fetch_page(&mut self) -> Result<(), ArchiveError> {
        let query = self.reader.query_for(self.cursor.as_ref(), self.rows)?;
        tracing::debug!("Fetching page: q={} fq={:?}", query.query, query.filter_queries);

        let page = self.reader.source.query(&query).await?;
        if page.len() < self.rows {
            self.exhausted = true;
        }
        tracing::debug!("Fetched {} document(s)", page.len());

        self.buffer.extend(page);
        Ok(())
    }
}
