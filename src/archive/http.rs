use super::document::Document;
use super::query::SearchQuery;
use super::reader::QuerySource;
use crate::error::ArchiveError;

use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectDocs,
}

#[derive(Debug, Deserialize)]
struct SelectDocs {
    #[serde(default)]
    docs: Vec<Document>,
}

/// `QuerySource` over a collection's `/select` handler.
pub struct HttpQuerySource {
    client: reqwest::Client,
    select_url: String,
}

impl HttpQuerySource {
    pub fn new(client: reqwest::Client, base_url: &str, collection: &str) -> Self {
        Self {
            client,
            select_url: format!("{}/{}/select", base_url.trim_end_matches('/'), collection),
        }
    }

    pub fn select_url(&self) -> &str {
        &self.select_url
    }

    pub fn params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.query.clone()), ("wt", "json".to_string())];
        for fq in &query.filter_queries {
            params.push(("fq", fq.clone()));
        }
        if let Some(sort) = query.sort_param() {
            params.push(("sort", sort));
        }
        if let Some(rows) = query.rows {
            params.push(("rows", rows.to_string()));
        }
        params
    }
}

#[async_trait]
impl QuerySource for HttpQuerySource {
    async fn query(&self, query: &SearchQuery) -> Result<Vec<Document>, ArchiveError> {
        let response = self
            .client
            .get(&self.select_url)
            .query(&Self::params(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Query(format!(
                "{} returned {}: {}",
                self.select_url, status, body
            )));
        }

        let bytes = response.bytes().await?;
        let parsed: SelectResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.response.docs)
    }
}
