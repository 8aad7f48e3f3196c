//! Subtree copies between the coordination store and the local filesystem.
//!
//! A tree is carried as [`TreeEntry`] values with every parent listed before
//! its children. Store nodes with children become directories locally; leaf
//! nodes become files. Local directories, empty ones included, are marked as
//! such so they survive a round trip.

use super::store::{CoordinationStore, join_path};
use crate::error::{AdminError, AdminResult};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One node of a copied subtree, addressed relative to the subtree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
}

impl TreeEntry {
    pub fn file(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: Vec::new(),
            is_dir: true,
        }
    }
}

pub type TreeEntries = Vec<TreeEntry>;

/// Reads every node below `root` (the root itself excluded).
pub async fn read_tree(store: &dyn CoordinationStore, root: &str) -> AdminResult<TreeEntries> {
    let mut entries = Vec::new();
    let mut pending = vec![String::new()];

    while let Some(relative) = pending.pop() {
        let full = if relative.is_empty() {
            root.to_string()
        } else {
            join_path(root, &relative)
        };
        for child in store.children(&full).await? {
            let child_relative = if relative.is_empty() {
                child
            } else {
                format!("{}/{}", relative, child)
            };
            let data = store
                .read(&join_path(root, &child_relative))
                .await?
                .unwrap_or_default();
            entries.push(TreeEntry::file(child_relative.clone(), data));
            pending.push(child_relative);
        }
    }

    let parents: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.path.rsplit_once('/').map(|(parent, _)| parent.to_string()))
        .collect();
    for entry in entries.iter_mut() {
        entry.is_dir = parents.contains(&entry.path);
    }

    Ok(entries)
}

/// Writes `entries` below `root`, creating or overwriting nodes as needed.
pub async fn write_tree(
    store: &dyn CoordinationStore,
    root: &str,
    entries: &[TreeEntry],
) -> AdminResult<()> {
    if !store.exists(root).await? {
        store.create(root, Vec::new(), true).await?;
    }
    for entry in entries {
        let path = join_path(root, &entry.path);
        if store.exists(&path).await? {
            store.write(&path, entry.data.clone()).await?;
        } else {
            store.create(&path, entry.data.clone(), true).await?;
        }
    }
    Ok(())
}

/// Copies the subtree at `src` (root data included) to `dest`.
pub async fn copy_within(store: &dyn CoordinationStore, src: &str, dest: &str) -> AdminResult<usize> {
    let root_data = store
        .read(src)
        .await?
        .ok_or_else(|| AdminError::path(src, "source node does not exist"))?;
    let entries = read_tree(store, src).await?;

    if store.exists(dest).await? {
        store.write(dest, root_data).await?;
    } else {
        store.create(dest, root_data, true).await?;
    }
    write_tree(store, dest, &entries).await?;
    Ok(entries.len() + 1)
}

/// Loads a local directory as tree entries, sorted by relative path.
pub fn read_local_dir(dir: &Path) -> io::Result<TreeEntries> {
    let mut entries = Vec::new();
    collect_local(dir, String::new(), &mut entries)?;
    Ok(entries)
}

fn collect_local(dir: &Path, prefix: String, out: &mut TreeEntries) -> io::Result<()> {
    let mut names: Vec<(String, PathBuf)> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| (e.file_name().to_string_lossy().into_owned(), e.path())))
        .collect::<io::Result<_>>()?;
    names.sort();

    for (name, path) in names {
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if path.is_dir() {
            out.push(TreeEntry::dir(relative.clone()));
            collect_local(&path, relative, out)?;
        } else {
            let data = fs::read(&path)?;
            out.push(TreeEntry::file(relative, data));
        }
    }
    Ok(())
}

/// Materializes tree entries below `dir`.
pub fn write_local_dir(dir: &Path, entries: &[TreeEntry]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for entry in entries {
        let target = dir.join(&entry.path);
        if entry.is_dir {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &entry.data)?;
        }
    }
    Ok(())
}

/// Runs blocking filesystem work off the async worker threads.
pub async fn blocking_io<T, F>(work: F) -> AdminResult<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(io::Error::other)?
        .map_err(AdminError::from)
}
