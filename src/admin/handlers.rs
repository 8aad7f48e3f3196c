use super::client::ClusterAdmin;
use super::types::*;
use crate::error::AdminError;
use crate::executor::types::AdminTask;

use axum::{Extension, Json, extract::Path, http::StatusCode};
use std::sync::Arc;

pub(crate) fn failure(err: &AdminError) -> (StatusCode, Json<CommandResponse>) {
    let status = match err.last_cause() {
        AdminError::UnknownCommand(_) => StatusCode::NOT_FOUND,
        AdminError::Payload { .. } | AdminError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(CommandResponse {
            success: false,
            result: None,
            error: Some(err.to_string()),
        }),
    )
}

/// A result that cannot be encoded is reported as a failure, not as an empty
/// success.
pub(crate) fn success<T: serde::Serialize>(value: T) -> (StatusCode, Json<CommandResponse>) {
    match serde_json::to_value(value) {
        Ok(result) => (
            StatusCode::OK,
            Json(CommandResponse {
                success: true,
                result: Some(result),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to encode command result: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CommandResponse {
                    success: false,
                    result: None,
                    error: Some(format!("Failed to encode command result: {}", e)),
                }),
            )
        }
    }
}

pub async fn handle_list_collections(
    Extension(admin): Extension<Arc<ClusterAdmin>>,
) -> (StatusCode, Json<CommandResponse>) {
    match admin.list_collections().await {
        Ok(collections) => success(collections),
        Err(e) => {
            tracing::error!("Failed to list collections: {}", e);
            failure(&e)
        }
    }
}

pub async fn handle_create_collection(
    Extension(admin): Extension<Arc<ClusterAdmin>>,
) -> (StatusCode, Json<CommandResponse>) {
    match admin.create_collection().await {
        Ok(created) => success(created),
        Err(e) => {
            tracing::error!("Failed to create collection: {}", e);
            failure(&e)
        }
    }
}

pub async fn handle_dump_collections(
    Extension(admin): Extension<Arc<ClusterAdmin>>,
) -> (StatusCode, Json<CommandResponse>) {
    match admin.dump_collections(None).await {
        Ok(dumps) => success(dumps),
        Err(e) => {
            tracing::error!("Failed to dump collections: {}", e);
            failure(&e)
        }
    }
}

pub async fn handle_create_shard(
    Extension(admin): Extension<Arc<ClusterAdmin>>,
    Json(req): Json<CreateShardRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    match admin.create_shard(req.shard.as_deref()).await {
        Ok(shards) => success(shards),
        Err(e) => {
            tracing::error!("Failed to create shard: {}", e);
            failure(&e)
        }
    }
}

pub async fn handle_update_security_state(
    Extension(admin): Extension<Arc<ClusterAdmin>>,
) -> (StatusCode, Json<CommandResponse>) {
    match admin.update_security_state().await {
        Ok(transition) => success(transition),
        Err(e) => {
            tracing::error!("Failed to update security state: {}", e);
            failure(&e)
        }
    }
}

/// Generic dispatch: the request body is the command payload.
pub async fn handle_run_command(
    Extension(admin): Extension<Arc<ClusterAdmin>>,
    Path(name): Path<String>,
    payload: Option<Json<serde_json::Value>>,
) -> (StatusCode, Json<CommandResponse>) {
    let task = match payload {
        Some(Json(payload)) => AdminTask::new(&name, payload),
        None => AdminTask::without_payload(&name),
    };

    match admin.run(&task).await {
        Ok(result) => {
            tracing::info!("Command '{}' completed", name);
            success(result)
        }
        Err(e) => {
            tracing::error!("Command '{}' failed: {}", name, e);
            failure(&e)
        }
    }
}
