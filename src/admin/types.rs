use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requests understood by the search engine's collection admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRequest {
    List,
    Create(CreateCollectionRequest),
    CreateShard { collection: String, shard: String },
    ClusterStatus { collection: Option<String> },
    /// Document count of a collection, optionally restricted to one shard.
    CountDocuments {
        collection: String,
        shard: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub config_name: Option<String>,
    pub num_shards: u32,
    pub replication_factor: u32,
    pub max_shards_per_node: u32,
    pub router_name: String,
    pub router_field: Option<String>,
    /// Explicit shard names, used with implicit routing.
    pub shards: Vec<String>,
}

/// Decoded admin API reply. `status` is the engine's own status code; zero
/// means success regardless of the transport status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResponse {
    pub status: i32,
    pub message: Option<String>,
    pub body: serde_json::Value,
}

impl AdminResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 0,
            message: None,
            body,
        }
    }

    pub fn error(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            body: serde_json::Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDump {
    pub name: String,
    pub shards: BTreeMap<String, ShardDump>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardDump {
    pub state: Option<String>,
    pub replicas: BTreeMap<String, ReplicaDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicaDump {
    pub core: Option<String>,
    pub node_name: Option<String>,
    pub state: Option<String>,
    pub leader: bool,
}

// --- HTTP API DTOs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateShardRequest {
    #[serde(default)]
    pub shard: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
