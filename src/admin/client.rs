//! Cluster Admin Facade
//!
//! Typed entry points over the builtin command table. Each method is a named
//! command dispatched through [`CommandRegistry::execute`], so every operation
//! is retried under the cluster's [`RetryPolicy`](crate::executor::retry::RetryPolicy).

use super::api::AdminApi;
use super::commands::{self, register_builtin};
use super::shards::ShardPlanner;
use super::types::CollectionDump;
use crate::config::ClusterConfig;
use crate::coordination::state::Transition;
use crate::coordination::store::CoordinationStore;
use crate::coordination::types::TransferMode;
use crate::error::{AdminError, AdminResult};
use crate::executor::registry::CommandRegistry;
use crate::executor::retry::{CancelFlag, Retry};
use crate::executor::types::AdminTask;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs: configuration and the two external clients.
pub struct ClusterContext {
    pub config: ClusterConfig,
    pub admin: Arc<dyn AdminApi>,
    pub store: Arc<dyn CoordinationStore>,
}

pub struct ClusterAdmin {
    ctx: Arc<ClusterContext>,
    registry: Arc<CommandRegistry<ClusterContext>>,
    retry: Retry,
}

impl ClusterAdmin {
    pub fn new(
        config: ClusterConfig,
        admin: Arc<dyn AdminApi>,
        store: Arc<dyn CoordinationStore>,
    ) -> Self {
        let retry = Retry::new(config.retry_policy());
        let registry = CommandRegistry::new();
        register_builtin(&registry);

        tracing::info!(
            "Cluster admin ready for '{}' ({} commands, {} attempt(s) every {}s)",
            config.collection,
            registry.command_count(),
            retry.policy().max_attempts,
            retry.policy().interval_secs
        );

        Self {
            ctx: Arc::new(ClusterContext {
                config,
                admin,
                store,
            }),
            registry,
            retry,
        }
    }

    /// Stops retrying once `cancel` is set; an attempt in flight still completes.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.retry = self.retry.with_cancel(cancel);
        self
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.ctx.config
    }

    pub fn registry(&self) -> &Arc<CommandRegistry<ClusterContext>> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn CoordinationStore> {
        &self.ctx.store
    }

    /// Runs a command by name with a raw JSON payload.
    ///
    /// Coordination commands fail before their first attempt when no
    /// coordination backend is configured.
    pub async fn run(&self, task: &AdminTask) -> AdminResult<Value> {
        if !self.ctx.store.is_configured()
            && commands::COORDINATION_COMMANDS.contains(&task.command.as_str())
        {
            tracing::error!(
                "Command '{}' needs a coordination store, none is configured",
                task.command
            );
            return Err(AdminError::Config(format!(
                "command '{}' needs a coordination store backend",
                task.command
            )));
        }

        self.registry
            .execute(task, self.ctx.clone(), &self.retry)
            .await
    }

    async fn run_typed<T: DeserializeOwned>(&self, command: &str, payload: Value) -> AdminResult<T> {
        let value = self.run(&AdminTask::new(command, payload)).await?;
        serde_json::from_value(value).map_err(|source| AdminError::Payload {
            command: command.to_string(),
            source,
        })
    }

    // --- Collections ---

    pub async fn list_collections(&self) -> AdminResult<Vec<String>> {
        self.run_typed(commands::LIST_COLLECTIONS, json!({})).await
    }

    /// Creates the configured collection unless it exists. An existing
    /// collection with implicit routing gets its missing shards instead.
    ///
    /// Returns `true` when a create request was sent.
    pub async fn create_collection(&self) -> AdminResult<bool> {
        let name = &self.config().collection;
        let existing = self.list_collections().await?;

        if existing.iter().any(|c| c == name) {
            tracing::info!("Collection '{}' already exists", name);
            if self.config().implicit_routing {
                tracing::info!("Collection '{}' uses implicit routing, checking shards", name);
                self.create_shard(None).await?;
            }
            return Ok(false);
        }

        let created: String = self
            .run_typed(commands::CREATE_COLLECTION, json!({}))
            .await?;
        tracing::info!("Collection '{}' created", created);
        Ok(true)
    }

    /// Shard names of the configured collection, read from the cluster on
    /// every call.
    pub async fn shard_names(&self) -> AdminResult<Vec<String>> {
        self.run_typed(commands::GET_SHARDS, json!({})).await
    }

    /// One CREATESHARD request, without checking whether the shard exists.
    pub async fn create_single_shard(&self, shard: &str) -> AdminResult<()> {
        let _: String = self
            .run_typed(commands::CREATE_SHARD, json!({ "shard": shard }))
            .await?;
        Ok(())
    }

    pub async fn create_shard(&self, name: Option<&str>) -> AdminResult<Vec<String>> {
        ShardPlanner::new(self).ensure_shard(name).await
    }

    /// Cluster state of every collection, optionally saved as JSON to `output`.
    pub async fn dump_collections(&self, output: Option<&Path>) -> AdminResult<Vec<CollectionDump>> {
        let mut dumps = Vec::new();

        for collection in self.list_collections().await? {
            let mut dump: CollectionDump = self
                .run_typed(
                    commands::CLUSTER_STATUS,
                    json!({ "collection": collection }),
                )
                .await?;

            if self.config().include_doc_number {
                for (shard, shard_dump) in dump.shards.iter_mut() {
                    let count: u64 = self
                        .run_typed(
                            commands::COUNT_DOCUMENTS,
                            json!({ "collection": collection, "shard": shard }),
                        )
                        .await?;
                    shard_dump.doc_count = Some(count);
                }
            }
            dumps.push(dump);
        }

        if let Some(path) = output {
            let encoded = serde_json::to_vec_pretty(&dumps).map_err(|source| AdminError::Payload {
                command: "dump-collections".to_string(),
                source,
            })?;
            tokio::fs::write(path, encoded).await?;
            tracing::info!("Dump of {} collection(s) written to {}", dumps.len(), path.display());
        }

        Ok(dumps)
    }

    // --- Coordination store ---

    /// Sets (or with `None`, removes) a cluster-wide property.
    pub async fn set_cluster_property(&self, name: &str, value: Option<&str>) -> AdminResult<()> {
        let _: Option<String> = self
            .run_typed(
                commands::SET_CLUSTER_PROPERTY,
                json!({ "name": name, "value": value }),
            )
            .await?;
        tracing::info!("Cluster property '{}' set to {:?}", name, value);
        Ok(())
    }

    pub async fn znode_exists(&self) -> AdminResult<bool> {
        self.run_typed(commands::CHECK_ZNODE, json!({})).await
    }

    /// Creates the administrative root unless it exists.
    pub async fn create_znode(&self) -> AdminResult<bool> {
        let znode = &self.config().znode;
        if self.znode_exists().await? {
            tracing::info!("Znode '{}' already exists", znode);
            return Ok(false);
        }
        let _: String = self.run_typed(commands::CREATE_ZNODE, json!({})).await?;
        tracing::info!("Znode '{}' created", znode);
        Ok(true)
    }

    pub async fn secure_znode(&self) -> AdminResult<()> {
        let _: String = self.run_typed(commands::SECURE_ZNODE, json!({})).await?;
        Ok(())
    }

    pub async fn unsecure_znode(&self) -> AdminResult<()> {
        let _: String = self.run_typed(commands::UNSECURE_ZNODE, json!({})).await?;
        Ok(())
    }

    pub async fn enable_security_plugin(&self) -> AdminResult<String> {
        self.run_typed(commands::ENABLE_SECURITY_PLUGIN, json!({}))
            .await
    }

    pub async fn upload_config_set(&self) -> AdminResult<String> {
        self.run_typed(commands::UPLOAD_CONFIG, json!({})).await
    }

    pub async fn download_config_set(&self) -> AdminResult<String> {
        self.run_typed(commands::DOWNLOAD_CONFIG, json!({})).await
    }

    pub async fn config_set_exists(&self) -> AdminResult<bool> {
        self.run_typed(commands::CHECK_CONFIG, json!({})).await
    }

    /// Copies a subtree; returns the number of nodes copied.
    pub async fn transfer_znode(&self, mode: TransferMode, src: &str, dest: &str) -> AdminResult<usize> {
        self.run_typed(
            commands::TRANSFER_ZNODE,
            json!({ "mode": mode, "src": src, "dest": dest }),
        )
        .await
    }

    /// Recursive delete; `false` when the path did not exist.
    pub async fn delete_znode(&self, path: &str) -> AdminResult<bool> {
        self.run_typed(commands::DELETE_ZNODE, json!({ "path": path }))
            .await
    }

    pub async fn set_autoscaling(&self) -> AdminResult<String> {
        self.run_typed(commands::SET_AUTOSCALING, json!({})).await
    }

    /// Moves the stored security state to the configured `secure` flag.
    pub async fn update_security_state(&self) -> AdminResult<Transition> {
        self.run_typed(commands::UPDATE_STATE_FILE, json!({})).await
    }
}
