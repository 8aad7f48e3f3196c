//! Cluster Administration Module
//!
//! Collection, shard and coordination-path management for a search cluster.
//!
//! ## Overview
//! Every operation is a named command in a shared table. The `ClusterAdmin`
//! facade gives them typed signatures and dispatches them through the retry
//! layer. Commands are idempotent where it matters: collection creation checks
//! for the collection first and shard provisioning only creates missing shards.
//!
//! ## Submodules
//! - **`api`**: The `AdminApi` contract of the search engine's admin interface.
//! - **`http`**: `AdminApi` over HTTP with explicit TLS material.
//! - **`commands`**: The builtin command table.
//! - **`client`**: The `ClusterAdmin` facade.
//! - **`shards`**: Shard naming and the shard planner.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`types`**: Requests, responses and dump DTOs.

pub mod api;
pub mod client;
pub mod commands;
pub mod handlers;
pub mod http;
pub mod shards;
pub mod types;
