//! Query Window Builder
//!
//! Computes the end boundary of an archival window and renders the query and
//! filter texts sent to the search engine. Templates reference values with
//! `${name}` placeholders: `${start}` and `${end}` come from the window, any
//! other name is looked up in the cursor document.

use super::document::Document;
use crate::error::ArchiveError;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::OnceLock;
use std::time::Duration;

/// Default query when no query text is configured.
pub const MATCH_ALL: &str = "*:*";
/// Stand-in for an unbounded `${start}` / `${end}` in the main query.
pub const WILDCARD: &str = "*";

const START: &str = "start";
const END: &str = "end";

/// End boundary of an archival run.
///
/// An explicit end always wins; otherwise `now - ttl` (ISO-8601, millisecond
/// precision, UTC); otherwise the range is open-ended.
///
/// A ttl reaching past the representable date range is an
/// [`ArchiveError::InvalidWindow`], never an open end.
pub fn compute_end(
    end: Option<&str>,
    now: DateTime<Utc>,
    ttl: Option<Duration>,
) -> Result<Option<String>, ArchiveError> {
    if let Some(end) = end {
        return Ok(Some(end.to_string()));
    }
    let Some(ttl) = ttl else {
        return Ok(None);
    };

    let out_of_range =
        || ArchiveError::InvalidWindow(format!("ttl of {}s is out of range", ttl.as_secs()));
    let delta = TimeDelta::from_std(ttl).map_err(|_| out_of_range())?;
    let end = now.checked_sub_signed(delta).ok_or_else(out_of_range)?;
    Ok(Some(end.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

/// Escapes the characters that are significant to the query parser and appear
/// in timestamps.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if c == ':' || c == '-' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// Replaces every `${name}` found by `lookup`. Placeholders the lookup cannot
/// resolve are left verbatim and reported in the second element.
fn substitute<F>(template: &str, lookup: F) -> (String, Vec<String>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let rendered = placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    missing.push(name.to_string());
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    (rendered, missing)
}

/// Archival window: optional bounds plus an optional time-to-live used to
/// derive the end boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: Option<String>,
    pub end: Option<String>,
    pub ttl: Option<Duration>,
}

impl QueryWindow {
    /// Fixes the end boundary against `now`. The result carries no ttl, so the
    /// boundary stays the same for every page of the run.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<QueryWindow, ArchiveError> {
        Ok(QueryWindow {
            start: self.start.clone(),
            end: compute_end(self.end.as_deref(), now, self.ttl)?,
            ttl: None,
        })
    }
}

/// A fully rendered, parameterized search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub filter_queries: Vec<String>,
    /// Sort fields in priority order; each ascending.
    pub sort: Vec<String>,
    pub rows: Option<usize>,
}

impl SearchQuery {
    /// Value for the `sort` request parameter, e.g. `logtime asc,id asc`.
    pub fn sort_param(&self) -> Option<String> {
        if self.sort.is_empty() {
            return None;
        }
        Some(
            self.sort
                .iter()
                .map(|field| format!("{} asc", field))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQueryBuilder {
    query_text: Option<String>,
    filter_query_text: Option<String>,
    document: Option<Document>,
    start: Option<String>,
    end: Option<String>,
    sort: Vec<String>,
    rows: Option<usize>,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_text(mut self, text: impl Into<String>) -> Self {
        self.query_text = Some(text.into());
        self
    }

    pub fn filter_query_text(mut self, text: impl Into<String>) -> Self {
        self.filter_query_text = Some(text.into());
        self
    }

    /// Binds the cursor document whose fields feed `${<field>}` placeholders.
    pub fn document(mut self, document: Option<Document>) -> Self {
        self.document = document;
        self
    }

    pub fn interval(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start = start.map(str::to_string);
        self.end = end.map(str::to_string);
        self
    }

    pub fn window(self, window: &QueryWindow) -> Self {
        self.interval(window.start.as_deref(), window.end.as_deref())
    }

    pub fn add_sort<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.sort
            .extend(fields.iter().map(|field| field.as_ref().to_string()));
        self
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn build(&self) -> SearchQuery {
        SearchQuery {
            query: self.render_query(),
            filter_queries: self
                .render_filter()
                .map(|(text, _)| text)
                .into_iter()
                .collect(),
            sort: self.sort.clone(),
            rows: self.rows,
        }
    }

    /// True when the filter renders and takes at least one value from the
    /// bound document, i.e. the next page actually moves past the cursor.
    pub fn filter_follows_document(&self) -> bool {
        matches!(self.render_filter(), Some((_, true)))
    }

    fn window_value(&self, name: &str) -> Option<Option<&str>> {
        match name {
            START => Some(self.start.as_deref()),
            END => Some(self.end.as_deref()),
            _ => None,
        }
    }

    fn document_value(&self, name: &str) -> Option<String> {
        self.document
            .as_ref()
            .and_then(|document| document.get_string(name))
    }

    fn render_query(&self) -> String {
        let Some(text) = self.query_text.as_deref() else {
            return MATCH_ALL.to_string();
        };
        let (rendered, missing) = substitute(text, |name| match self.window_value(name) {
            Some(Some(value)) => Some(escape_value(value)),
            Some(None) => Some(WILDCARD.to_string()),
            None => self.document_value(name).map(|value| escape_value(&value)),
        });
        if !missing.is_empty() {
            tracing::warn!("Unresolved placeholders in query text: {:?}", missing);
        }
        rendered
    }

    /// The filter is dropped entirely when any placeholder it references has no
    /// value, e.g. before the first page when no cursor document exists yet.
    /// The flag tells whether any value came from the document.
    fn render_filter(&self) -> Option<(String, bool)> {
        let text = self.filter_query_text.as_deref()?;
        let from_document = Cell::new(false);
        let (rendered, missing) = substitute(text, |name| match self.window_value(name) {
            Some(value) => value.map(escape_value),
            None => {
                let value = self.document_value(name)?;
                from_document.set(true);
                Some(escape_value(&value))
            }
        });
        if missing.is_empty() {
            Some((rendered, from_document.get()))
        } else {
            tracing::debug!("Filter query dropped, unresolved placeholders: {:?}", missing);
            None
        }
    }
}
