use super::service::ArchiveService;
use super::types::*;
use crate::error::ArchiveError;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

pub async fn handle_archive(
    Extension(service): Extension<Arc<ArchiveService>>,
    Json(req): Json<ArchiveRequest>,
) -> (StatusCode, Json<ArchiveReply>) {
    let collection = req.job.collection.clone();
    let outcome = service.archive(req).await;

    match &outcome {
        Ok(response) if response.error.is_some() => tracing::warn!(
            "Archive of '{}' is partial ({} document(s))",
            collection,
            response.written
        ),
        Ok(_) => {}
        Err(e) => tracing::error!("Archive of '{}' failed: {}", collection, e),
    }

    archive_reply(outcome)
}

/// Status and body for one archive outcome: 200 for a complete run, 502 for a
/// partial one, 400 for a window that cannot be computed, 500 otherwise.
pub(crate) fn archive_reply(
    outcome: Result<ArchiveResponse, ArchiveError>,
) -> (StatusCode, Json<ArchiveReply>) {
    match outcome {
        Ok(response) => {
            let status = if response.error.is_some() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(ArchiveReply {
                    success: response.error.is_none(),
                    result: Some(response),
                    error: None,
                }),
            )
        }
        Err(e) => {
            let status = match e {
                ArchiveError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ArchiveReply {
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
