//! Command Execution Module
//!
//! Uniform execution of administrative commands against external services.
//!
//! ## Overview
//! Administrative operations mutate shared cluster state (collections, shards,
//! coordination-store paths) over links that fail transiently. Each operation is
//! registered once as a named closure and always dispatched through the same
//! bounded retry loop, so callers see one of two outcomes: full success or a
//! terminal error that carries the last underlying cause.
//!
//! ## Submodules
//! - **`retry`**: Fixed-interval bounded retry with cooperative cancellation.
//! - **`registry`**: Maps command names (e.g., "create-shard") to closures.
//! - **`types`**: The `AdminTask` invocation record.

pub mod registry;
pub mod retry;
pub mod types;

#[cfg(test)]
mod tests;
