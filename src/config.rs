//! Cluster Configuration
//!
//! Immutable settings for one administered cluster, loaded once from a JSON file.
//! Transport security (TLS material) lives in [`TlsConfig`] and is handed to the
//! HTTP client constructor directly; nothing here touches process-wide state.

use crate::error::{AdminError, AdminResult};
use crate::executor::retry::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_FOLDER: &str = "/opt/dataimm-infra-manager/data";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URL of the search engine, e.g. `http://localhost:8886/solr`.
    pub solr_url: String,
    pub collection: String,
    /// Administrative namespace root in the coordination store.
    pub znode: String,
    pub config_set: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub shards: u32,
    pub replication: u32,
    /// Falls back to `shards * replication` when unset; that product must fit
    /// in a `u32`.
    pub max_shards_per_node: Option<u32>,
    pub retry_times: u32,
    pub interval_secs: u64,
    pub router_name: String,
    pub router_field: String,
    pub implicit_routing: bool,
    /// Desired security mode of the cluster.
    pub secure: bool,
    /// Comma separated principals granted access to secured paths.
    pub sasl_users: Option<String>,
    pub security_json_location: Option<PathBuf>,
    pub autoscaling_json_location: Option<PathBuf>,
    pub data_folder: PathBuf,
    pub include_doc_number: bool,
    pub tls: TlsConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            solr_url: "http://localhost:8886/solr".to_string(),
            collection: String::new(),
            znode: "/infra-solr".to_string(),
            config_set: None,
            config_dir: None,
            shards: 1,
            replication: 1,
            max_shards_per_node: None,
            retry_times: 10,
            interval_secs: 5,
            router_name: "implicit".to_string(),
            router_field: "_router_field_".to_string(),
            implicit_routing: false,
            secure: false,
            sasl_users: None,
            security_json_location: None,
            autoscaling_json_location: None,
            data_folder: PathBuf::from(DEFAULT_DATA_FOLDER),
            include_doc_number: false,
            tls: TlsConfig::default(),
        }
    }
}

impl ClusterConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: &Path) -> AdminResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ClusterConfig = serde_json::from_str(&raw).map_err(|e| {
            AdminError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AdminResult<()> {
        if self.retry_times == 0 {
            return Err(AdminError::Config(
                "retry_times must be at least 1".to_string(),
            ));
        }
        if !self.znode.starts_with('/') {
            return Err(AdminError::Config(format!(
                "znode '{}' must be an absolute path",
                self.znode
            )));
        }
        if self.max_shards_per_node.is_none() && self.default_max_shards_per_node().is_none() {
            return Err(AdminError::Config(format!(
                "shards ({}) * replication ({}) overflows max_shards_per_node",
                self.shards, self.replication
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_times, self.interval_secs)
    }

    /// Saturates at `u32::MAX`; [`validate`](Self::validate) rejects such a
    /// configuration.
    pub fn max_shards_per_node(&self) -> u32 {
        self.max_shards_per_node
            .or_else(|| self.default_max_shards_per_node())
            .unwrap_or(u32::MAX)
    }

    fn default_max_shards_per_node(&self) -> Option<u32> {
        self.shards.checked_mul(self.replication)
    }

    pub fn sasl_user_list(&self) -> Vec<String> {
        self.sasl_users
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|user| user.trim())
            .filter(|user| !user.is_empty())
            .map(|user| user.to_string())
            .collect()
    }

    /// Path of a node directly below the administrative root.
    pub fn znode_child(&self, name: &str) -> String {
        format!("{}/{}", self.znode.trim_end_matches('/'), name)
    }
}

/// Keystore and truststore material for the HTTP transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub keystore_location: Option<PathBuf>,
    pub keystore_password: Option<String>,
    /// `PKCS12` is the only supported keystore type.
    pub keystore_type: Option<String>,
    pub truststore_location: Option<PathBuf>,
    pub truststore_password: Option<String>,
    /// `PEM` (default) or `DER`.
    pub truststore_type: Option<String>,
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        self.keystore_location.is_some() || self.truststore_location.is_some()
    }
}
