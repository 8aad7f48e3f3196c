//! Command Registry
//!
//! A table that maps command names (e.g. "list-collections") to closures taking
//! the shared cluster context and a JSON payload. Every dispatch goes through
//! [`Retry`], so all commands get identical failure handling regardless of what
//! they talk to.

use super::retry::Retry;
use super::types::AdminTask;
use crate::error::{AdminError, AdminResult};

use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type-erased command: context + payload in, JSON result out.
pub type CommandFn<C> = Arc<
    dyn Fn(Arc<C>, serde_json::Value) -> Pin<Box<dyn Future<Output = AdminResult<serde_json::Value>> + Send>>
        + Send
        + Sync,
>;

pub struct CommandRegistry<C> {
    handlers: DashMap<String, CommandFn<C>>,
}

impl<C: Send + Sync + 'static> CommandRegistry<C> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers (or replaces) the command stored under `name`.
    pub fn register<F, Fut>(&self, name: &str, handler: F)
    where
        F: Fn(Arc<C>, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AdminResult<serde_json::Value>> + Send + 'static,
    {
        let handler_fn: CommandFn<C> = Arc::new(move |ctx: Arc<C>, payload: serde_json::Value| {
            Box::pin(handler(ctx, payload))
                as Pin<Box<dyn Future<Output = AdminResult<serde_json::Value>> + Send>>
        });

        self.handlers.insert(name.to_string(), handler_fn);

        tracing::debug!("Registered admin command: {}", name);
    }

    /// Looks up the command and runs it under `retry`.
    ///
    /// An unknown name fails immediately; it is not an attempt.
    pub async fn execute(
        &self,
        task: &AdminTask,
        ctx: Arc<C>,
        retry: &Retry,
    ) -> AdminResult<serde_json::Value> {
        // Clone out of the map so no shard lock is held across awaits.
        let handler = match self.handlers.get(&task.command) {
            Some(entry) => entry.value().clone(),
            None => {
                tracing::error!("Unknown admin command: {}", task.command);
                return Err(AdminError::UnknownCommand(task.command.clone()));
            }
        };

        tracing::debug!("Executing admin command '{}'", task.command);
        retry
            .run(&task.command, || handler(ctx.clone(), task.payload.clone()))
            .await
    }

    pub fn list_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn command_count(&self) -> usize {
        self.handlers.len()
    }
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}
