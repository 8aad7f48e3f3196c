use super::types::{AdminRequest, AdminResponse};
use crate::error::AdminResult;

use async_trait::async_trait;

/// The execute-admin-request contract of the search engine.
///
/// Implementations report transport failures as errors and engine-level
/// failures through [`AdminResponse::status`]; the caller decides what a
/// non-zero status means.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn execute(&self, request: AdminRequest) -> AdminResult<AdminResponse>;
}
