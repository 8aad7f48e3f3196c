//! Coordination Store Access
//!
//! The narrow contract this crate needs from the coordination service
//! (read-node, write-node, create, delete, list children, ACL changes), an
//! in-process implementation backed by a `DashMap`, and a stand-in that refuses
//! every request when no backend is configured.

use super::types::{PathAcl, ZNode};
use crate::error::{AdminError, AdminResult};

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hierarchical path store in the style of a ZooKeeper ensemble.
///
/// Paths are absolute (`/a/b`). Implementations report failures as
/// [`AdminError::CoordinationPath`].
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    async fn exists(&self, path: &str) -> AdminResult<bool>;

    /// Returns `None` when the node does not exist.
    async fn read(&self, path: &str) -> AdminResult<Option<Vec<u8>>>;

    /// Creates a node. Fails if it already exists, or if its parent is missing
    /// and `make_parents` is false.
    async fn create(&self, path: &str, data: Vec<u8>, make_parents: bool) -> AdminResult<()>;

    /// Overwrites the data of an existing node.
    async fn write(&self, path: &str, data: Vec<u8>) -> AdminResult<()>;

    async fn delete(&self, path: &str, recursive: bool) -> AdminResult<()>;

    /// Names (not full paths) of the direct children, sorted.
    async fn children(&self, path: &str) -> AdminResult<Vec<String>>;

    async fn set_acl(&self, path: &str, acl: PathAcl, recursive: bool) -> AdminResult<()>;

    /// False for a store that cannot serve any request.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Splits off the parent of an absolute path. The root has no parent.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Joins a child name (or relative path) onto a base path.
pub fn join_path(base: &str, child: &str) -> String {
    let child = child.trim_start_matches('/');
    if base == "/" {
        format!("/{}", child)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), child)
    }
}

fn normalize(path: &str) -> AdminResult<String> {
    if !path.starts_with('/') {
        return Err(AdminError::path(path, "path must be absolute"));
    }
    if path.contains("//") {
        return Err(AdminError::path(path, "path contains an empty segment"));
    }
    if path.len() > 1 {
        Ok(path.trim_end_matches('/').to_string())
    } else {
        Ok(path.to_string())
    }
}

/// In-process coordination store.
///
/// The root `/` always exists and is never stored.
pub struct MemoryCoordinationStore {
    nodes: Arc<DashMap<String, ZNode>>,
    writes: AtomicUsize,
}

impl MemoryCoordinationStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of successful data mutations (creates and writes).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn acl_of(&self, path: &str) -> Option<PathAcl> {
        self.nodes.get(path).map(|node| node.acl.clone())
    }

    fn has_node(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    fn descendants(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        self.nodes
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl Default for MemoryCoordinationStore {
    fn default() -> Self {
        Self {
            nodes: Arc::new(DashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CoordinationStore for MemoryCoordinationStore {
    async fn exists(&self, path: &str) -> AdminResult<bool> {
        let path = normalize(path)?;
        Ok(self.has_node(&path))
    }

    async fn read(&self, path: &str) -> AdminResult<Option<Vec<u8>>> {
        let path = normalize(path)?;
        if path == "/" {
            return Ok(Some(Vec::new()));
        }
        Ok(self.nodes.get(&path).map(|node| node.data.clone()))
    }

    async fn create(&self, path: &str, data: Vec<u8>, make_parents: bool) -> AdminResult<()> {
        let path = normalize(path)?;
        if self.has_node(&path) {
            return Err(AdminError::path(&path, "node already exists"));
        }

        let mut missing = Vec::new();
        let mut cursor = parent_path(&path);
        while let Some(parent) = cursor {
            if self.has_node(parent) {
                break;
            }
            missing.push(parent.to_string());
            cursor = parent_path(parent);
        }

        if !missing.is_empty() && !make_parents {
            return Err(AdminError::path(&path, "parent node does not exist"));
        }
        for parent in missing.into_iter().rev() {
            self.nodes.entry(parent).or_default();
        }

        self.nodes.insert(
            path,
            ZNode {
                data,
                acl: PathAcl::Open,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> AdminResult<()> {
        let path = normalize(path)?;
        match self.nodes.get_mut(&path) {
            Some(mut node) => {
                node.data = data;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(AdminError::path(&path, "node does not exist")),
        }
    }

    async fn delete(&self, path: &str, recursive: bool) -> AdminResult<()> {
        let path = normalize(path)?;
        if path == "/" {
            return Err(AdminError::path(&path, "cannot delete the root node"));
        }
        if !self.nodes.contains_key(&path) {
            return Err(AdminError::path(&path, "node does not exist"));
        }

        let descendants = self.descendants(&path);
        if !descendants.is_empty() && !recursive {
            return Err(AdminError::path(&path, "node has children"));
        }
        for child in descendants {
            self.nodes.remove(&child);
        }
        self.nodes.remove(&path);
        Ok(())
    }

    async fn children(&self, path: &str) -> AdminResult<Vec<String>> {
        let path = normalize(path)?;
        if !self.has_node(&path) {
            return Err(AdminError::path(&path, "node does not exist"));
        }

        let base_len = if path == "/" { 1 } else { path.len() + 1 };
        let mut names: Vec<String> = self
            .descendants(&path)
            .into_iter()
            .map(|full| full[base_len..].to_string())
            .filter(|rest| !rest.contains('/'))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn set_acl(&self, path: &str, acl: PathAcl, recursive: bool) -> AdminResult<()> {
        let path = normalize(path)?;
        match self.nodes.get_mut(&path) {
            Some(mut node) => node.acl = acl.clone(),
            None => return Err(AdminError::path(&path, "node does not exist")),
        }
        if recursive {
            for child in self.descendants(&path) {
                if let Some(mut node) = self.nodes.get_mut(&child) {
                    node.acl = acl.clone();
                }
            }
        }
        Ok(())
    }
}

/// Stands in for a missing coordination backend. Every call fails with
/// [`AdminError::Config`]; nothing is accepted and silently dropped.
#[derive(Debug, Default)]
pub struct UnconfiguredCoordinationStore;

impl UnconfiguredCoordinationStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }

    fn refuse<T>(&self, path: &str) -> AdminResult<T> {
        Err(AdminError::Config(format!(
            "no coordination store backend configured, cannot access '{}'",
            path
        )))
    }
}

#[async_trait]
impl CoordinationStore for UnconfiguredCoordinationStore {
    async fn exists(&self, path: &str) -> AdminResult<bool> {
        self.refuse(path)
    }

    async fn read(&self, path: &str) -> AdminResult<Option<Vec<u8>>> {
        self.refuse(path)
    }

    async fn create(&self, path: &str, _data: Vec<u8>, _make_parents: bool) -> AdminResult<()> {
        self.refuse(path)
    }

    async fn write(&self, path: &str, _data: Vec<u8>) -> AdminResult<()> {
        self.refuse(path)
    }

    async fn delete(&self, path: &str, _recursive: bool) -> AdminResult<()> {
        self.refuse(path)
    }

    async fn children(&self, path: &str) -> AdminResult<Vec<String>> {
        self.refuse(path)
    }

    async fn set_acl(&self, path: &str, _acl: PathAcl, _recursive: bool) -> AdminResult<()> {
        self.refuse(path)
    }

    fn is_configured(&self) -> bool {
        false
    }
}
