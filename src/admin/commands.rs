//! Builtin Admin Commands
//!
//! Every administrative primitive registered under its command name. Commands
//! against the collection API follow one shape: build the request from the
//! cluster context, execute it, turn a non-zero status into
//! [`AdminError::AdminOperationFailed`], then decode the response. Commands
//! against the coordination store report path failures as
//! [`AdminError::CoordinationPath`]. The registry retries both kinds alike.

use super::client::ClusterContext;
use super::shards::{generate_shard_list, sort_shard_names};
use super::types::{
    AdminRequest, AdminResponse, CollectionDump, CreateCollectionRequest, ReplicaDump, ShardDump,
};
use crate::config::ClusterConfig;
use crate::coordination::state::{SecurityState, SecurityStateMachine};
use crate::coordination::store::{CoordinationStore, join_path};
use crate::coordination::transfer::{
    blocking_io, copy_within, read_local_dir, read_tree, write_local_dir, write_tree,
};
use crate::coordination::types::{PathAcl, TransferMode};
use crate::error::{AdminError, AdminResult};
use crate::executor::registry::CommandRegistry;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub const LIST_COLLECTIONS: &str = "list-collections";
pub const CREATE_COLLECTION: &str = "create-collection";
pub const CREATE_SHARD: &str = "create-shard";
pub const GET_SHARDS: &str = "get-shards";
pub const CLUSTER_STATUS: &str = "cluster-status";
pub const COUNT_DOCUMENTS: &str = "count-documents";
pub const SET_CLUSTER_PROPERTY: &str = "set-cluster-property";
pub const CHECK_ZNODE: &str = "check-znode";
pub const CREATE_ZNODE: &str = "create-znode";
pub const SECURE_ZNODE: &str = "secure-znode";
pub const UNSECURE_ZNODE: &str = "unsecure-znode";
pub const ENABLE_SECURITY_PLUGIN: &str = "enable-security-plugin";
pub const UPLOAD_CONFIG: &str = "upload-config";
pub const DOWNLOAD_CONFIG: &str = "download-config";
pub const CHECK_CONFIG: &str = "check-config";
pub const TRANSFER_ZNODE: &str = "transfer-znode";
pub const DELETE_ZNODE: &str = "delete-znode";
pub const SET_AUTOSCALING: &str = "set-autoscaling";
pub const UPDATE_STATE_FILE: &str = "update-state-file";

/// Commands that only touch the coordination store.
pub const COORDINATION_COMMANDS: &[&str] = &[
    SET_CLUSTER_PROPERTY,
    CHECK_ZNODE,
    CREATE_ZNODE,
    SECURE_ZNODE,
    UNSECURE_ZNODE,
    ENABLE_SECURITY_PLUGIN,
    UPLOAD_CONFIG,
    DOWNLOAD_CONFIG,
    CHECK_CONFIG,
    TRANSFER_ZNODE,
    DELETE_ZNODE,
    SET_AUTOSCALING,
    UPDATE_STATE_FILE,
];

pub const CLUSTER_PROPS_FILE: &str = "clusterprops.json";
pub const SECURITY_JSON_FILE: &str = "security.json";
pub const AUTOSCALING_JSON_FILE: &str = "autoscaling.json";
pub const CONFIGS_NODE: &str = "configs";

pub fn register_builtin(registry: &CommandRegistry<ClusterContext>) {
    registry.register(LIST_COLLECTIONS, list_collections);
    registry.register(CREATE_COLLECTION, create_collection);
    registry.register(CREATE_SHARD, create_shard);
    registry.register(GET_SHARDS, get_shards);
    registry.register(CLUSTER_STATUS, cluster_status);
    registry.register(COUNT_DOCUMENTS, count_documents);
    registry.register(SET_CLUSTER_PROPERTY, set_cluster_property);
    registry.register(CHECK_ZNODE, check_znode);
    registry.register(CREATE_ZNODE, create_znode);
    registry.register(SECURE_ZNODE, secure_znode);
    registry.register(UNSECURE_ZNODE, unsecure_znode);
    registry.register(ENABLE_SECURITY_PLUGIN, enable_security_plugin);
    registry.register(UPLOAD_CONFIG, upload_config);
    registry.register(DOWNLOAD_CONFIG, download_config);
    registry.register(CHECK_CONFIG, check_config);
    registry.register(TRANSFER_ZNODE, transfer_znode);
    registry.register(DELETE_ZNODE, delete_znode);
    registry.register(SET_AUTOSCALING, set_autoscaling);
    registry.register(UPDATE_STATE_FILE, update_state_file);
}

// --- Payloads ---

#[derive(Debug, Deserialize)]
struct ShardArgs {
    shard: String,
}

#[derive(Debug, Deserialize)]
struct CollectionArgs {
    #[serde(default)]
    collection: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountArgs {
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    shard: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyArgs {
    name: String,
    /// `null` removes the property.
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferArgs {
    mode: TransferMode,
    src: String,
    dest: String,
}

fn args<T: DeserializeOwned>(command: &str, payload: Value) -> AdminResult<T> {
    serde_json::from_value(payload).map_err(|source| AdminError::Payload {
        command: command.to_string(),
        source,
    })
}

fn to_json<T: Serialize>(command: &str, value: T) -> AdminResult<Value> {
    serde_json::to_value(value).map_err(|source| AdminError::Payload {
        command: command.to_string(),
        source,
    })
}

// --- Collection API commands ---

/// Fails with `AdminOperationFailed` when the engine reports a non-zero status.
pub fn validate_response(response: &AdminResponse, message: &str) -> AdminResult<()> {
    if response.is_success() {
        return Ok(());
    }
    let detail = match &response.message {
        Some(detail) => format!("{} (status {}: {})", message, response.status, detail),
        None => format!("{} (status {})", message, response.status),
    };
    Err(AdminError::AdminOperationFailed(detail))
}

async fn process(ctx: &ClusterContext, request: AdminRequest, error_message: &str) -> AdminResult<AdminResponse> {
    let response = ctx.admin.execute(request).await?;
    validate_response(&response, error_message)?;
    Ok(response)
}

pub fn create_collection_request(config: &ClusterConfig) -> AdminRequest {
    let implicit = config.implicit_routing;
    AdminRequest::Create(CreateCollectionRequest {
        name: config.collection.clone(),
        config_name: config.config_set.clone(),
        num_shards: config.shards,
        replication_factor: config.replication,
        max_shards_per_node: config.max_shards_per_node(),
        router_name: if implicit {
            config.router_name.clone()
        } else {
            "compositeId".to_string()
        },
        router_field: implicit.then(|| config.router_field.clone()),
        shards: if implicit {
            generate_shard_list(config.max_shards_per_node())
        } else {
            Vec::new()
        },
    })
}

pub fn parse_collection_list(response: &AdminResponse) -> AdminResult<Vec<String>> {
    let list = response.body["collections"].as_array().ok_or_else(|| {
        AdminError::AdminOperationFailed("Collection list missing from response".to_string())
    })?;
    Ok(list
        .iter()
        .filter_map(|c| c.as_str().map(str::to_string))
        .collect())
}

/// Extracts one collection's shard and replica layout from a cluster status reply.
pub fn parse_collection_dump(name: &str, response: &AdminResponse) -> AdminResult<CollectionDump> {
    let shards = response.body["cluster"]["collections"][name]["shards"]
        .as_object()
        .ok_or_else(|| {
            AdminError::AdminOperationFailed(format!(
                "Collection '{}' not found in cluster state",
                name
            ))
        })?;

    let mut dump = CollectionDump {
        name: name.to_string(),
        ..CollectionDump::default()
    };
    for (shard_name, shard) in shards {
        let mut shard_dump = ShardDump {
            state: shard["state"].as_str().map(str::to_string),
            ..ShardDump::default()
        };
        if let Some(replicas) = shard["replicas"].as_object() {
            for (replica_name, replica) in replicas {
                shard_dump.replicas.insert(
                    replica_name.clone(),
                    ReplicaDump {
                        core: replica["core"].as_str().map(str::to_string),
                        node_name: replica["node_name"].as_str().map(str::to_string),
                        state: replica["state"].as_str().map(str::to_string),
                        leader: replica["leader"].as_str() == Some("true")
                            || replica["leader"].as_bool() == Some(true),
                    },
                );
            }
        }
        dump.shards.insert(shard_name.clone(), shard_dump);
    }
    Ok(dump)
}

async fn list_collections(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let response = process(&ctx, AdminRequest::List, "Cannot get collections.").await?;
    to_json(LIST_COLLECTIONS, parse_collection_list(&response)?)
}

async fn create_collection(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let name = ctx.config.collection.clone();
    let message = format!("Cannot create collection: '{}'", name);
    process(&ctx, create_collection_request(&ctx.config), &message).await?;
    to_json(CREATE_COLLECTION, name)
}

async fn create_shard(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let ShardArgs { shard } = args(CREATE_SHARD, payload)?;
    let collection = ctx.config.collection.clone();
    let message = format!("Error during shard creation. Collection: {}, Shard: {}", collection, shard);
    process(
        &ctx,
        AdminRequest::CreateShard {
            collection,
            shard: shard.clone(),
        },
        &message,
    )
    .await?;
    to_json(CREATE_SHARD, shard)
}

async fn get_shards(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let collection = ctx.config.collection.clone();
    let response = process(
        &ctx,
        AdminRequest::ClusterStatus {
            collection: Some(collection.clone()),
        },
        "Cannot read cluster state.",
    )
    .await?;
    let dump = parse_collection_dump(&collection, &response)?;
    let mut names: Vec<String> = dump.shards.into_keys().collect();
    sort_shard_names(&mut names);
    to_json(GET_SHARDS, names)
}

async fn cluster_status(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let CollectionArgs { collection } = args(CLUSTER_STATUS, payload)?;
    let collection = collection.unwrap_or_else(|| ctx.config.collection.clone());
    let response = process(
        &ctx,
        AdminRequest::ClusterStatus {
            collection: Some(collection.clone()),
        },
        "Cannot read cluster state.",
    )
    .await?;
    to_json(CLUSTER_STATUS, parse_collection_dump(&collection, &response)?)
}

async fn count_documents(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let CountArgs { collection, shard } = args(COUNT_DOCUMENTS, payload)?;
    let collection = collection.unwrap_or_else(|| ctx.config.collection.clone());
    let message = format!("Cannot count documents of '{}'", collection);
    let response = process(&ctx, AdminRequest::CountDocuments { collection, shard }, &message).await?;
    let count = response.body["response"]["numFound"].as_u64().ok_or_else(|| {
        AdminError::AdminOperationFailed("numFound missing from response".to_string())
    })?;
    to_json(COUNT_DOCUMENTS, count)
}

// --- Coordination store commands ---

/// Creates the node or overwrites its data.
async fn put_node(store: &dyn CoordinationStore, path: &str, data: Vec<u8>) -> AdminResult<()> {
    if store.exists(path).await? {
        store.write(path, data).await
    } else {
        store.create(path, data, true).await
    }
}

async fn read_json_file(command: &str, location: Option<&PathBuf>) -> AdminResult<Vec<u8>> {
    let location = location
        .ok_or_else(|| AdminError::Config(format!("{}: no JSON file location configured", command)))?
        .clone();
    let data = tokio::fs::read(&location).await?;
    serde_json::from_slice::<Value>(&data).map_err(|e| {
        AdminError::Config(format!("{} is not valid JSON: {}", location.display(), e))
    })?;
    Ok(data)
}

async fn set_cluster_property(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let PropertyArgs { name, value } = args(SET_CLUSTER_PROPERTY, payload)?;
    let path = ctx.config.znode_child(CLUSTER_PROPS_FILE);

    let mut props: serde_json::Map<String, Value> = match ctx.store.read(&path).await? {
        Some(data) if !data.is_empty() => serde_json::from_slice(&data)
            .map_err(|source| AdminError::StateDecode {
                path: path.clone(),
                source,
            })?,
        _ => serde_json::Map::new(),
    };
    match &value {
        Some(value) => props.insert(name.clone(), Value::String(value.clone())),
        None => props.remove(&name),
    };

    let encoded = serde_json::to_vec(&props).map_err(|source| AdminError::StateDecode {
        path: path.clone(),
        source,
    })?;
    put_node(ctx.store.as_ref(), &path, encoded).await?;
    to_json(SET_CLUSTER_PROPERTY, value)
}

async fn check_znode(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let PathArgs { path } = args(CHECK_ZNODE, payload)?;
    let path = path.unwrap_or_else(|| ctx.config.znode.clone());
    to_json(CHECK_ZNODE, ctx.store.exists(&path).await?)
}

async fn create_znode(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let PathArgs { path } = args(CREATE_ZNODE, payload)?;
    let path = path.unwrap_or_else(|| ctx.config.znode.clone());
    ctx.store.create(&path, Vec::new(), true).await.map_err(|e| {
        AdminError::path(
            &path,
            format!(
                "Cannot create znode, check that the coordination servers are running and a quorum is established: {}",
                e
            ),
        )
    })?;
    to_json(CREATE_ZNODE, path)
}

async fn secure_znode(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let PathArgs { path } = args(SECURE_ZNODE, payload)?;
    let path = path.unwrap_or_else(|| ctx.config.znode.clone());
    let users = ctx.config.sasl_user_list();
    if users.is_empty() {
        return Err(AdminError::Config(
            "sasl_users must be set to secure a znode".to_string(),
        ));
    }
    ctx.store
        .set_acl(&path, PathAcl::Restricted { users }, true)
        .await?;
    tracing::info!("Znode '{}' secured", path);
    to_json(SECURE_ZNODE, path)
}

async fn unsecure_znode(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let PathArgs { path } = args(UNSECURE_ZNODE, payload)?;
    let path = path.unwrap_or_else(|| ctx.config.znode.clone());
    ctx.store.set_acl(&path, PathAcl::Open, true).await?;
    tracing::info!("Znode '{}' unsecured", path);
    to_json(UNSECURE_ZNODE, path)
}

async fn enable_security_plugin(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let data = read_json_file(
        ENABLE_SECURITY_PLUGIN,
        ctx.config.security_json_location.as_ref(),
    )
    .await?;
    let path = ctx.config.znode_child(SECURITY_JSON_FILE);
    put_node(ctx.store.as_ref(), &path, data).await?;
    to_json(ENABLE_SECURITY_PLUGIN, path)
}

fn config_set_path(config: &ClusterConfig) -> AdminResult<(String, String)> {
    let name = config
        .config_set
        .clone()
        .ok_or_else(|| AdminError::Config("config_set is not set".to_string()))?;
    let path = join_path(&config.znode_child(CONFIGS_NODE), &name);
    Ok((name, path))
}

fn config_dir(config: &ClusterConfig) -> AdminResult<PathBuf> {
    config
        .config_dir
        .clone()
        .ok_or_else(|| AdminError::Config("config_dir is not set".to_string()))
}

async fn upload_config(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let (name, path) = config_set_path(&ctx.config)?;
    let dir = config_dir(&ctx.config)?;
    let entries = blocking_io(move || read_local_dir(&dir)).await?;
    write_tree(ctx.store.as_ref(), &path, &entries).await?;
    to_json(UPLOAD_CONFIG, name)
}

async fn download_config(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let (_, path) = config_set_path(&ctx.config)?;
    if !ctx.store.exists(&path).await? {
        return Err(AdminError::path(&path, "config set does not exist"));
    }
    let dir = config_dir(&ctx.config)?;
    let entries = read_tree(ctx.store.as_ref(), &path).await?;
    let target = dir.clone();
    blocking_io(move || write_local_dir(&target, &entries)).await?;
    to_json(DOWNLOAD_CONFIG, dir.display().to_string())
}

async fn check_config(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let (_, path) = config_set_path(&ctx.config)?;
    to_json(CHECK_CONFIG, ctx.store.exists(&path).await?)
}

async fn transfer_znode(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let TransferArgs { mode, src, dest } = args(TRANSFER_ZNODE, payload)?;
    let store = ctx.store.as_ref();

    let copied = match mode {
        TransferMode::CopyToLocal => {
            let entries = read_tree(store, &src).await?;
            let count = entries.len();
            blocking_io(move || write_local_dir(&PathBuf::from(dest), &entries)).await?;
            count
        }
        TransferMode::CopyFromLocal => {
            let source_dir = PathBuf::from(src);
            let entries = blocking_io(move || read_local_dir(&source_dir)).await?;
            write_tree(store, &dest, &entries).await?;
            entries.len()
        }
        TransferMode::CopyWithin => copy_within(store, &src, &dest).await?,
    };
    tracing::info!("Transferred {} node(s) ({:?})", copied, mode);
    to_json(TRANSFER_ZNODE, copied)
}

async fn delete_znode(ctx: Arc<ClusterContext>, payload: Value) -> AdminResult<Value> {
    let PathArgs { path } = args(DELETE_ZNODE, payload)?;
    let path = path.ok_or_else(|| AdminError::Config("delete-znode needs an explicit path".to_string()))?;
    if !ctx.store.exists(&path).await? {
        tracing::info!("Znode '{}' does not exist, nothing to delete", path);
        return to_json(DELETE_ZNODE, false);
    }
    ctx.store.delete(&path, true).await?;
    to_json(DELETE_ZNODE, true)
}

async fn set_autoscaling(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let data = read_json_file(
        SET_AUTOSCALING,
        ctx.config.autoscaling_json_location.as_ref(),
    )
    .await?;
    let path = ctx.config.znode_child(AUTOSCALING_JSON_FILE);
    put_node(ctx.store.as_ref(), &path, data).await?;
    to_json(SET_AUTOSCALING, path)
}

async fn update_state_file(ctx: Arc<ClusterContext>, _payload: Value) -> AdminResult<Value> {
    let desired = SecurityState::from_flag(ctx.config.secure);
    tracing::info!("Update state file in {} mode.", desired);
    let machine = SecurityStateMachine::new(ctx.store.clone(), &ctx.config.znode);
    to_json(UPDATE_STATE_FILE, machine.transition(desired).await?)
}
