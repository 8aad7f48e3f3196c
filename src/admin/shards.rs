//! Shard Planner
//!
//! Brings a collection up to its target shard layout (`shard_0 .. shard_{n-1}`).
//! The existing shard set is read from the cluster on every call, never cached,
//! and creation runs one shard at a time in ascending index order.

use super::client::ClusterAdmin;
use crate::error::AdminResult;

pub const SHARD_PREFIX: &str = "shard_";

/// Target shard names for `count` shards, in ascending order.
pub fn generate_shard_list(count: u32) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", SHARD_PREFIX, i)).collect()
}

/// Numeric suffix of a `shard_<n>` name.
pub fn shard_index(name: &str) -> Option<u32> {
    name.strip_prefix(SHARD_PREFIX)?.parse().ok()
}

/// Sorts `shard_<n>` names numerically; other names follow alphabetically.
pub fn sort_shard_names(names: &mut [String]) {
    names.sort_by(|a, b| match (shard_index(a), shard_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}

pub struct ShardPlanner<'a> {
    admin: &'a ClusterAdmin,
}

impl<'a> ShardPlanner<'a> {
    pub fn new(admin: &'a ClusterAdmin) -> Self {
        Self { admin }
    }

    /// With a name, creates exactly that shard (no existence pre-check).
    /// Without one, creates every missing target shard.
    ///
    /// Returns the resulting shard set.
    pub async fn ensure_shard(&self, name: Option<&str>) -> AdminResult<Vec<String>> {
        let collection = &self.admin.config().collection;
        let mut shards = self.admin.shard_names().await?;

        match name {
            Some(name) => {
                self.admin.create_single_shard(name).await?;
                tracing::info!(
                    "Adding new shard to collection request sent ('{}': {})",
                    collection,
                    name
                );
                if !shards.iter().any(|s| s == name) {
                    shards.push(name.to_string());
                }
            }
            None => {
                let targets = generate_shard_list(self.admin.config().max_shards_per_node());
                for shard in targets {
                    if shards.contains(&shard) {
                        tracing::debug!("Shard '{}' already present in '{}'", shard, collection);
                        continue;
                    }
                    self.admin.create_single_shard(&shard).await?;
                    tracing::info!(
                        "Adding new shard to collection request sent ('{}': {})",
                        collection,
                        shard
                    );
                    shards.push(shard);
                }
            }
        }

        sort_shard_names(&mut shards);
        Ok(shards)
    }
}
