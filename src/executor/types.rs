use serde::{Deserialize, Serialize};

/// A named administrative command invocation.
///
/// `command` selects the entry in the `CommandRegistry`; `payload` carries the
/// command-specific arguments as JSON (an empty object for argument-less commands).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminTask {
    pub command: String,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
}

impl AdminTask {
    pub fn new(command: &str, payload: serde_json::Value) -> Self {
        Self {
            command: command.to_string(),
            payload,
        }
    }

    pub fn without_payload(command: &str) -> Self {
        Self::new(command, empty_payload())
    }
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
