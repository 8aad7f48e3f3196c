//! Coordination Module
//!
//! Access to the distributed configuration store shared by the search cluster.
//!
//! ## Core Concepts
//! - **Paths**: Absolute, slash-separated node names (`/infra-solr/configs/x`). Each
//!   node holds opaque bytes and an ACL.
//! - **State record**: A JSON document under the administrative root that remembers
//!   the cluster's security mode between runs.
//! - **Transfers**: Whole subtrees move between the store and local directories
//!   (config sets, backups).
//!
//! ## Submodules
//! - **`store`**: The `CoordinationStore` contract and an in-process implementation.
//! - **`state`**: `SecurityStateMachine` and its persisted record.
//! - **`transfer`**: Subtree copy helpers.
//! - **`types`**: ACLs, nodes, transfer modes.

pub mod state;
pub mod store;
pub mod transfer;
pub mod types;
