use serde::{Deserialize, Serialize};

/// Access control applied to a coordination-store path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathAcl {
    /// Anyone may read and write.
    #[default]
    Open,
    /// Only the listed principals may write; everyone else may read.
    Restricted { users: Vec<String> },
}

/// A single stored node: opaque bytes plus its ACL.
#[derive(Debug, Clone, Default)]
pub struct ZNode {
    pub data: Vec<u8>,
    pub acl: PathAcl,
}

/// Direction of a path transfer between the local filesystem and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Store subtree -> local directory.
    CopyToLocal,
    /// Local directory -> store subtree.
    CopyFromLocal,
    /// Store subtree -> another store subtree.
    CopyWithin,
}
