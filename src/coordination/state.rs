//! Security State Machine
//!
//! Tracks whether the cluster currently runs in secure or unsecure mode by
//! persisting a small JSON record in the coordination store:
//!
//! ```json
//! {"dataimm_solr_security_state": "SECURE"}
//! ```
//!
//! A transition always reads the record first and writes only when the stored
//! value differs from the desired one (or no record exists yet). The read and
//! the write are separate requests; two administrators running concurrently can
//! lose an update. A single administrative actor per cluster is assumed.

use super::store::{CoordinationStore, join_path};
use crate::error::{AdminError, AdminResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const STATE_FILE: &str = "dataimm-solr-state.json";
pub const STATE_FIELD: &str = "dataimm_solr_security_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityState {
    Secure,
    Unsecure,
}

impl SecurityState {
    pub fn from_flag(secure: bool) -> Self {
        if secure {
            SecurityState::Secure
        } else {
            SecurityState::Unsecure
        }
    }
}

impl fmt::Display for SecurityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityState::Secure => write!(f, "SECURE"),
            SecurityState::Unsecure => write!(f, "UNSECURE"),
        }
    }
}

/// Persisted payload of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(rename = "dataimm_solr_security_state")]
    pub state: SecurityState,
}

/// What a transition did to the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// No record existed; it was created with this state.
    Initialized { state: SecurityState },
    /// The record already held the desired state; nothing was written.
    Unchanged { state: SecurityState },
    /// The record was overwritten.
    Updated {
        from: SecurityState,
        to: SecurityState,
    },
}

impl Transition {
    pub fn current(&self) -> SecurityState {
        match self {
            Transition::Initialized { state } | Transition::Unchanged { state } => *state,
            Transition::Updated { to, .. } => *to,
        }
    }
}

pub struct SecurityStateMachine {
    store: Arc<dyn CoordinationStore>,
    path: String,
}

impl SecurityStateMachine {
    /// State machine whose record lives at `<parent_znode>/dataimm-solr-state.json`.
    pub fn new(store: Arc<dyn CoordinationStore>, parent_znode: &str) -> Self {
        Self {
            store,
            path: join_path(parent_znode, STATE_FILE),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the persisted state; `None` if no record exists yet.
    pub async fn read(&self) -> AdminResult<Option<SecurityState>> {
        let Some(data) = self.store.read(&self.path).await? else {
            return Ok(None);
        };
        let record: StateRecord =
            serde_json::from_slice(&data).map_err(|source| AdminError::StateDecode {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(record.state))
    }

    /// Moves the persisted record to `desired`, writing only when needed.
    pub async fn transition(&self, desired: SecurityState) -> AdminResult<Transition> {
        let encoded = encode(desired, &self.path)?;

        match self.read().await? {
            None => {
                tracing::info!(
                    "State file {} does not exist. Initializing it as '{}'",
                    self.path,
                    desired
                );
                self.store.create(&self.path, encoded, true).await?;
                Ok(Transition::Initialized { state: desired })
            }
            Some(current) if current == desired => {
                tracing::info!("State file is in '{}' mode. No update.", current);
                Ok(Transition::Unchanged { state: current })
            }
            Some(current) => {
                tracing::info!(
                    "State file is in '{}' mode. Updating it to '{}'",
                    current,
                    desired
                );
                self.store.write(&self.path, encoded).await?;
                Ok(Transition::Updated {
                    from: current,
                    to: desired,
                })
            }
        }
    }
}

fn encode(state: SecurityState, path: &str) -> AdminResult<Vec<u8>> {
    serde_json::to_vec(&StateRecord { state }).map_err(|source| AdminError::StateDecode {
        path: path.to_string(),
        source,
    })
}
