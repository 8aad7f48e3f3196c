//! Archive Module Tests
//!
//! ## Test Scopes
//! - **Window**: End boundary computation from explicit end and ttl.
//! - **Rendering**: Placeholder substitution, escaping, filter dropping, sort order.
//! - **Reader**: Paging, restart from a cursor, failure mid-run.
//! - **Export**: JSON-lines output and resume information.
//! - **Replies**: HTTP status and body for each export outcome.

#[cfg(test)]
mod tests {
    use crate::archive::document::{Document, FieldValue};
    use crate::archive::handlers::archive_reply;
    use crate::archive::http::HttpQuerySource;
    use crate::archive::query::{
        MATCH_ALL, QueryWindow, SearchQuery, SearchQueryBuilder, compute_end, escape_value,
    };
    use crate::archive::reader::{ArchivalReader, QuerySource};
    use crate::archive::service::export_documents;
    use crate::archive::types::{ArchivalJob, ArchiveRequest, ArchiveResponse};
    use crate::error::ArchiveError;

    use async_trait::async_trait;
    use axum::Json;
    use axum::http::StatusCode;
    use chrono::{DateTime, TimeZone, Utc};
    use regex::Regex;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const FIVE_DAYS: Duration = Duration::from_secs(5 * 24 * 60 * 60);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 10, 9, 10, 11, 12).unwrap()
    }

    fn doc(id: i64) -> Document {
        Document::new([
            ("id", FieldValue::Integer(id)),
            (
                "logtime",
                FieldValue::from(format!("2018-10-01T00:00:{:02}.000Z", id)),
            ),
        ])
    }

    fn id_of(document: &Document) -> i64 {
        match document.get("id") {
            Some(FieldValue::Integer(id)) => *id,
            other => panic!("unexpected id {:?}", other),
        }
    }

    /// Serves documents sorted by id; understands a single `id:{N TO *]` filter.
    struct FakeSource {
        docs: Vec<Document>,
        queries: Mutex<Vec<SearchQuery>>,
        fail_on_call: Option<usize>,
    }

    impl FakeSource {
        fn with_docs(count: i64) -> Arc<Self> {
            Arc::new(Self {
                docs: (1..=count).map(doc).collect(),
                queries: Mutex::new(Vec::new()),
                fail_on_call: None,
            })
        }

        fn failing_on(count: i64, call: usize) -> Arc<Self> {
            Arc::new(Self {
                docs: (1..=count).map(doc).collect(),
                queries: Mutex::new(Vec::new()),
                fail_on_call: Some(call),
            })
        }

        fn queries(&self) -> Vec<SearchQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuerySource for FakeSource {
        async fn query(&self, query: &SearchQuery) -> Result<Vec<Document>, ArchiveError> {
            let call = {
                let mut queries = self.queries.lock().unwrap();
                queries.push(query.clone());
                queries.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(ArchiveError::Query("read timed out".to_string()));
            }

            let pattern = Regex::new(r"id:\{(\d+) TO").unwrap();
            let after = query
                .filter_queries
                .first()
                .and_then(|fq| pattern.captures(fq))
                .map(|caps| caps[1].parse::<i64>().unwrap())
                .unwrap_or(0);

            Ok(self
                .docs
                .iter()
                .filter(|d| id_of(d) > after)
                .take(query.rows.unwrap_or(10))
                .cloned()
                .collect())
        }
    }

    fn job() -> ArchivalJob {
        ArchivalJob {
            collection: "hadoop_logs".to_string(),
            query_text: None,
            filter_query_text: Some("id:{${id} TO *]".to_string()),
            sort_columns: vec!["id".to_string()],
            start: None,
            end: None,
            ttl_secs: None,
            rows: 3,
        }
    }

    fn request(job: ArchivalJob) -> ArchiveRequest {
        ArchiveRequest {
            job,
            cursor: None,
            limit: None,
        }
    }

    async fn drain(reader: &ArchivalReader, cursor: Option<Document>, rows: usize) -> Vec<i64> {
        let mut pages = reader.open(cursor, rows);
        let mut ids = Vec::new();
        while let Some(document) = pages.next().await.unwrap() {
            ids.push(id_of(&document));
        }
        ids
    }

    // ============================================================
    // TEST 1: Window - End Boundary
    // ============================================================

    #[test]
    fn test_compute_end_without_end_or_ttl_is_open() {
        // ACT
        let end = compute_end(None, now(), None).unwrap();

        // ASSERT
        assert_eq!(end, None);
    }

    #[test]
    fn test_compute_end_keeps_explicit_end() {
        // ACT
        let end = compute_end(Some("2018-10-09T10:11:12.000Z"), now(), None).unwrap();

        // ASSERT
        assert_eq!(end.as_deref(), Some("2018-10-09T10:11:12.000Z"));
    }

    #[test]
    fn test_compute_end_from_ttl() {
        // ACT
        let end = compute_end(None, now(), Some(FIVE_DAYS)).unwrap();

        // ASSERT: now - 5 days, millisecond precision, UTC
        assert_eq!(end.as_deref(), Some("2018-10-04T10:11:12.000Z"));
    }

    #[test]
    fn test_explicit_end_wins_over_ttl() {
        // ACT
        let end = compute_end(Some("2017-01-01T00:00:00.000Z"), now(), Some(FIVE_DAYS)).unwrap();

        // ASSERT
        assert_eq!(end.as_deref(), Some("2017-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_ttl_beyond_duration_range_is_invalid_window() {
        // ARRANGE: Too large for a signed time delta
        let ttl = Duration::from_secs(u64::MAX);

        // ACT
        let result = compute_end(None, now(), Some(ttl));

        // ASSERT: An error, never an open end
        assert!(matches!(result, Err(ArchiveError::InvalidWindow(_))));
    }

    #[test]
    fn test_ttl_before_earliest_date_is_invalid_window() {
        // ARRANGE: A valid delta that lands before the earliest representable date
        let ttl = Duration::from_secs(10_000_000_000_000);

        // ACT
        let result = compute_end(None, now(), Some(ttl));

        // ASSERT
        match result {
            Err(ArchiveError::InvalidWindow(message)) => {
                assert!(message.contains("10000000000000"));
            }
            other => panic!("expected InvalidWindow, got {:?}", other),
        }
    }

    #[test]
    fn test_resolved_window_is_fixed() {
        // ARRANGE
        let window = QueryWindow {
            start: Some("2018-01-01T00:00:00.000Z".to_string()),
            end: None,
            ttl: Some(FIVE_DAYS),
        };

        // ACT
        let resolved = window.resolve(now()).unwrap();

        // ASSERT: The ttl is consumed; resolving again changes nothing
        assert_eq!(resolved.end.as_deref(), Some("2018-10-04T10:11:12.000Z"));
        assert_eq!(resolved.ttl, None);
        assert_eq!(resolved.resolve(Utc::now()).unwrap(), resolved);
    }

    // ============================================================
    // TEST 2: Rendering - Placeholders, Escaping, Sort
    // ============================================================

    #[test]
    fn test_default_query_matches_all() {
        // ACT
        let query = SearchQueryBuilder::new().build();

        // ASSERT
        assert_eq!(query.query, MATCH_ALL);
        assert!(query.filter_queries.is_empty());
        assert_eq!(query.sort_param(), None);
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(
            escape_value("2017-11-27T10:12:11.372Z"),
            r"2017\-11\-27T10\:12\:11.372Z"
        );
        assert_eq!(escape_value("plain"), "plain");
    }

    #[test]
    fn test_query_end_is_escaped_or_wildcard() {
        // ACT
        let with_end = SearchQueryBuilder::new()
            .query_text("logtime:[* TO ${end}]")
            .interval(None, Some("2017-11-27T10:12:11.372Z"))
            .build();
        let without_end = SearchQueryBuilder::new()
            .query_text("logtime:[* TO ${end}]")
            .build();

        // ASSERT
        assert_eq!(with_end.query, r"logtime:[* TO 2017\-11\-27T10\:12\:11.372Z]");
        assert_eq!(without_end.query, "logtime:[* TO *]");
    }

    #[test]
    fn test_unbounded_interval_renders_wildcards() {
        // ACT
        let query = SearchQueryBuilder::new()
            .query_text("id:[${start} TO ${end}]")
            .build();

        // ASSERT
        assert_eq!(query.query, "id:[* TO *]");
    }

    #[test]
    fn test_quoted_interval_values() {
        // ACT
        let query = SearchQueryBuilder::new()
            .query_text(r#"id:["${start}" TO "${end}"]"#)
            .interval(Some("10"), Some("13"))
            .build();

        // ASSERT
        assert_eq!(query.query, r#"id:["10" TO "13"]"#);
    }

    #[test]
    fn test_filter_with_document_and_end() {
        // ARRANGE
        let document = Document::new([
            ("logtime", "2017-10-02'T'10:00:11.634Z"),
            ("id", "1"),
        ]);

        // ACT
        let query = SearchQueryBuilder::new()
            .filter_query_text("(logtime:${logtime} AND id:{${id} TO *]) OR logtime:{${logtime} TO ${end}]")
            .document(Some(document))
            .interval(None, Some("2017-11-27'T'10:12:11.372Z"))
            .build();

        // ASSERT
        assert_eq!(
            query.filter_queries,
            vec![
                r"(logtime:2017\-10\-02'T'10\:00\:11.634Z AND id:{1 TO *]) OR logtime:{2017\-10\-02'T'10\:00\:11.634Z TO 2017\-11\-27'T'10\:12\:11.372Z]"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_filter_without_document_is_dropped() {
        // ACT
        let query = SearchQueryBuilder::new()
            .filter_query_text("(logtime:${logtime} AND id:{${id} TO *]) OR logtime:{${logtime} TO ${end}]")
            .interval(None, Some("2017-11-27'T'10:12:11.372Z"))
            .build();

        // ASSERT
        assert!(query.filter_queries.is_empty());
    }

    #[test]
    fn test_filter_with_missing_end_is_dropped() {
        // ACT
        let query = SearchQueryBuilder::new()
            .filter_query_text("logtime:{${logtime} TO ${end}]")
            .document(Some(Document::new([("logtime", "2017-10-02")])))
            .build();

        // ASSERT
        assert!(query.filter_queries.is_empty());
    }

    #[test]
    fn test_filter_follows_document_only_with_document_fields() {
        // ARRANGE: Same document, one filter using its fields and one using only the window
        let moving = SearchQueryBuilder::new()
            .filter_query_text("id:{${id} TO *]")
            .document(Some(doc(2)));
        let window_only = SearchQueryBuilder::new()
            .filter_query_text("logtime:[* TO ${end}]")
            .interval(None, Some("2018-10-04T10:11:12.000Z"))
            .document(Some(doc(2)));

        // ASSERT: Both render, only the first moves with the document
        assert!(moving.filter_follows_document());
        assert_eq!(window_only.build().filter_queries.len(), 1);
        assert!(!window_only.filter_follows_document());
    }

    #[test]
    fn test_sort_fields_keep_given_order() {
        // ACT
        let query = SearchQueryBuilder::new()
            .add_sort(&["logtime", "id"])
            .rows(50)
            .build();

        // ASSERT
        assert_eq!(query.sort, vec!["logtime", "id"]);
        assert_eq!(query.sort_param().as_deref(), Some("logtime asc,id asc"));
        assert_eq!(query.rows, Some(50));
    }

    #[test]
    fn test_select_params() {
        // ARRANGE
        let query = SearchQuery {
            query: "*:*".to_string(),
            filter_queries: vec!["a:1".to_string(), "b:2".to_string()],
            sort: vec!["logtime".to_string()],
            rows: Some(10),
        };

        // ACT
        let params = HttpQuerySource::params(&query);

        // ASSERT: One fq parameter per filter
        let fqs: Vec<&String> = params.iter().filter(|(k, _)| *k == "fq").map(|(_, v)| v).collect();
        assert_eq!(fqs, vec!["a:1", "b:2"]);
        assert!(params.contains(&("sort", "logtime asc".to_string())));
        assert!(params.contains(&("rows", "10".to_string())));
    }

    // ============================================================
    // TEST 3: Document - String Coercion
    // ============================================================

    #[test]
    fn test_document_string_coercion() {
        // ARRANGE
        let document: Document = serde_json::from_str(
            r#"{"id":"a1","count":7,"ratio":0.5,"ok":true,"gone":null,"tags":["x","y"]}"#,
        )
        .unwrap();

        // ASSERT
        assert_eq!(document.get_string("id").as_deref(), Some("a1"));
        assert_eq!(document.get_string("count").as_deref(), Some("7"));
        assert_eq!(document.get_string("ratio").as_deref(), Some("0.5"));
        assert_eq!(document.get_string("ok").as_deref(), Some("true"));
        assert_eq!(document.get_string("tags").as_deref(), Some("[x, y]"));
        assert_eq!(document.get_string("gone"), None);
        assert_eq!(document.get_string("absent"), None);
        assert_eq!(document.len(), 6);
    }

    // ============================================================
    // TEST 4: Reader - Paging and Cursors
    // ============================================================

    #[tokio::test]
    async fn test_reader_pages_until_short_page() {
        // ARRANGE
        let source = FakeSource::with_docs(7);
        let reader = ArchivalReader::new(source.clone(), &job(), now()).unwrap();

        // ACT
        let ids = drain(&reader, None, 3).await;

        // ASSERT: First page unfiltered, later pages start after the previous last id
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        let queries = source.queries();
        assert_eq!(queries.len(), 3);
        assert!(queries[0].filter_queries.is_empty());
        assert_eq!(queries[1].filter_queries, vec!["id:{3 TO *]"]);
        assert_eq!(queries[2].filter_queries, vec!["id:{6 TO *]"]);
    }

    #[tokio::test]
    async fn test_reader_stops_on_empty_page() {
        // ARRANGE
        let source = FakeSource::with_docs(6);
        let reader = ArchivalReader::new(source.clone(), &job(), now()).unwrap();

        // ACT
        let ids = drain(&reader, None, 3).await;

        // ASSERT
        assert_eq!(ids.len(), 6);
        assert_eq!(source.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_reader_restarts_from_cursor() {
        // ARRANGE
        let source = FakeSource::with_docs(7);
        let reader = ArchivalReader::new(source.clone(), &job(), now()).unwrap();

        // ACT
        let ids = drain(&reader, Some(doc(4)), 3).await;

        // ASSERT
        assert_eq!(ids, vec![5, 6, 7]);
    }

    #[tokio::test]
    async fn test_reader_rejects_out_of_range_ttl() {
        // ARRANGE
        let job = ArchivalJob {
            ttl_secs: Some(u64::MAX),
            ..job()
        };

        // ACT
        let result = ArchivalReader::new(FakeSource::with_docs(1), &job, now());

        // ASSERT
        assert!(matches!(result, Err(ArchiveError::InvalidWindow(_))));
    }

    #[tokio::test]
    async fn test_cursor_without_renderable_filter_is_rejected() {
        // ARRANGE: The filter names a field the cursor document does not have
        let source = FakeSource::with_docs(3);
        let job = ArchivalJob {
            filter_query_text: Some("seq:{${seq} TO *]".to_string()),
            ..job()
        };
        let reader = ArchivalReader::new(source.clone(), &job, now()).unwrap();

        // ACT
        let mut pages = reader.open(Some(doc(1)), 3);

        // ASSERT: Rejected before any request is sent
        assert!(matches!(pages.next().await, Err(ArchiveError::UnboundedCursor)));
        assert!(source.queries().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_with_window_only_filter_is_rejected() {
        // ARRANGE: The filter renders, but only from the window
        let source = FakeSource::with_docs(3);
        let job = ArchivalJob {
            filter_query_text: Some("logtime:[* TO ${end}]".to_string()),
            end: Some("2018-10-04T10:11:12.000Z".to_string()),
            ..job()
        };
        let reader = ArchivalReader::new(source.clone(), &job, now()).unwrap();

        // ACT
        let mut pages = reader.open(Some(doc(1)), 3);

        // ASSERT
        assert!(matches!(pages.next().await, Err(ArchiveError::UnboundedCursor)));
        assert!(source.queries().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_last_consumed_cursor() {
        // ARRANGE: Second page request fails
        let source = FakeSource::failing_on(7, 2);
        let reader = ArchivalReader::new(source.clone(), &job(), now()).unwrap();
        let mut pages = reader.open(None, 3);

        // ACT
        for _ in 0..3 {
            pages.next().await.unwrap();
        }
        let result = pages.next().await;

        // ASSERT
        assert!(result.is_err());
        assert_eq!(pages.cursor().map(id_of), Some(3));
    }

    #[tokio::test]
    async fn test_reader_freezes_end_for_the_run() {
        // ARRANGE
        let source = FakeSource::with_docs(1);
        let job = ArchivalJob {
            query_text: Some("logtime:[* TO ${end}]".to_string()),
            ttl_secs: Some(FIVE_DAYS.as_secs()),
            ..job()
        };
        let reader = ArchivalReader::new(source.clone(), &job, now()).unwrap();

        // ACT
        drain(&reader, None, 3).await;

        // ASSERT
        assert_eq!(reader.window().end.as_deref(), Some("2018-10-04T10:11:12.000Z"));
        assert_eq!(
            source.queries()[0].query,
            r"logtime:[* TO 2018\-10\-04T10\:11\:12.000Z]"
        );
    }

    // ============================================================
    // TEST 5: Export - JSON Lines and Resume Point
    // ============================================================

    #[tokio::test]
    async fn test_export_writes_json_lines() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out").join("hadoop_logs.jsonl");

        // ACT
        let response = export_documents(FakeSource::with_docs(5), &request(job()), &file, now())
            .await
            .unwrap();

        // ASSERT
        assert_eq!(response.written, 5);
        assert_eq!(response.cursor.as_ref().map(id_of), Some(5));
        assert!(response.error.is_none());
        let content = std::fs::read_to_string(&file).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        let first: Document = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(id_of(&first), 1);
    }

    #[tokio::test]
    async fn test_export_honors_limit() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("limited.jsonl");
        let request = ArchiveRequest {
            limit: Some(4),
            ..request(job())
        };

        // ACT
        let response = export_documents(FakeSource::with_docs(10), &request, &file, now())
            .await
            .unwrap();

        // ASSERT
        assert_eq!(response.written, 4);
        assert_eq!(response.cursor.as_ref().map(id_of), Some(4));
    }

    #[tokio::test]
    async fn test_export_reports_failure_with_resume_point() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("partial.jsonl");

        // ACT
        let response = export_documents(FakeSource::failing_on(7, 2), &request(job()), &file, now())
            .await
            .unwrap();

        // ASSERT
        assert_eq!(response.written, 3);
        assert_eq!(response.cursor.as_ref().map(id_of), Some(3));
        assert!(response.error.unwrap().contains("read timed out"));
        assert_eq!(std::fs::read_to_string(&file).unwrap().lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_with_window_only_filter_stops_after_first_page() {
        // ARRANGE: A full first page, then a filter that cannot move past it
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stuck.jsonl");
        let source = FakeSource::with_docs(10);
        let job = ArchivalJob {
            filter_query_text: Some("logtime:[* TO ${end}]".to_string()),
            end: Some("2018-10-04T10:11:12.000Z".to_string()),
            ..job()
        };

        // ACT
        let response = export_documents(source.clone(), &request(job), &file, now())
            .await
            .unwrap();

        // ASSERT: The run ends with an error instead of repeating the first page
        assert_eq!(response.written, 3);
        assert_eq!(response.cursor.as_ref().map(id_of), Some(3));
        assert!(response.error.is_some());
        assert_eq!(source.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_export_with_out_of_range_ttl_fails() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("never.jsonl");
        let job = ArchivalJob {
            ttl_secs: Some(10_000_000_000_000),
            ..job()
        };

        // ACT
        let result = export_documents(FakeSource::with_docs(3), &request(job), &file, now()).await;

        // ASSERT
        assert!(matches!(result, Err(ArchiveError::InvalidWindow(_))));
    }

    // ============================================================
    // TEST 6: Replies - Status and Body per Outcome
    // ============================================================

    fn response(error: Option<&str>) -> ArchiveResponse {
        ArchiveResponse {
            file: "/tmp/hadoop_logs.jsonl".to_string(),
            written: 3,
            end: None,
            cursor: Some(doc(3)),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_reply_for_complete_run() {
        // ACT
        let (status, Json(body)) = archive_reply(Ok(response(None)));

        // ASSERT
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.result.as_ref().map(|r| r.written), Some(3));
        assert!(body.error.is_none());
    }

    #[test]
    fn test_reply_for_partial_run() {
        // ACT
        let (status, Json(body)) = archive_reply(Ok(response(Some("read timed out"))));

        // ASSERT: The partial result and its resume point are still returned
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.success);
        assert_eq!(
            body.result.as_ref().and_then(|r| r.cursor.as_ref()).map(id_of),
            Some(3)
        );
    }

    #[test]
    fn test_reply_for_failed_run_carries_error_text() {
        // ACT
        let (status, Json(body)) = archive_reply(Err(ArchiveError::Query("connection refused".to_string())));

        // ASSERT
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.success);
        assert!(body.result.is_none());
        assert!(body.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_reply_for_invalid_window_is_bad_request() {
        // ACT
        let (status, Json(body)) =
            archive_reply(Err(ArchiveError::InvalidWindow("ttl of 1s is out of range".to_string())));

        // ASSERT
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.unwrap().contains("out of range"));
    }
}
