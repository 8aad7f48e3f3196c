//! Search Cluster Administration Library
//!
//! This library crate defines the modules behind the admin service binary (`main.rs`).
//!
//! ## Architecture Modules
//! - **`admin`**: Collection and shard management plus coordination-path commands, exposed
//!   through the `ClusterAdmin` facade.
//! - **`archive`**: Paged extraction of documents in stable order, resumable from any
//!   previously extracted document.
//! - **`config`**: The immutable per-cluster configuration, loaded from JSON.
//! - **`coordination`**: The coordination store contract, the persisted security state
//!   machine, and subtree transfers.
//! - **`error`**: Error taxonomy shared by all subsystems.
//! - **`executor`**: Bounded retry and the name-keyed command table every admin
//!   operation is dispatched through.

pub mod admin;
pub mod archive;
pub mod config;
pub mod coordination;
pub mod error;
pub mod executor;
