//! Archival Module
//!
//! Extracts documents from a collection in stable sort order so they can be
//! written elsewhere and later removed from the cluster.
//!
//! ## Core Concepts
//! - **Window**: Optional start and end boundaries. The end is either explicit or
//!   derived once per run from a time-to-live.
//! - **Cursor**: The last extracted document. Its fields are substituted into the
//!   filter query to request the next page.
//!
//! ## Submodules
//! - **`document`**: Field values and documents.
//! - **`query`**: Placeholder rendering and window computation.
//! - **`reader`**: Paged reading over a `QuerySource`.
//! - **`http`**: `QuerySource` over HTTP.
//! - **`service`**: JSON-lines export.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`types`**: Job, request and response DTOs.

pub mod document;
pub mod handlers;
pub mod http;
pub mod query;
pub mod reader;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;
