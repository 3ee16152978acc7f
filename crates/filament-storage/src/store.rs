//! State store trait and operations

use async_trait::async_trait;
use bytes::Bytes;
use filament_core::{ActorId, Result};

/// A buffered change to be applied to the store
#[derive(Debug, Clone)]
pub enum StateChange {
    /// Write a field value
    Set { field: String, value: Bytes },
    /// Remove a field
    Remove { field: String },
}

impl StateChange {
    /// The field this change targets
    pub fn field(&self) -> &str {
        match self {
            StateChange::Set { field, .. } => field,
            StateChange::Remove { field } => field,
        }
    }
}

/// Persistent key-value backend for actor state
///
/// Fields of different actor instances never share a key space; `apply` is
/// only required to be atomic within a single owner.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a field value, `None` if absent
    async fn try_get(&self, owner: &ActorId, field: &str) -> Result<Option<Bytes>>;

    /// Apply a batch of changes atomically: all land or none do
    async fn apply(&self, owner: &ActorId, changes: Vec<StateChange>) -> Result<()>;

    /// Check whether a field exists
    async fn contains(&self, owner: &ActorId, field: &str) -> Result<bool> {
        Ok(self.try_get(owner, field).await?.is_some())
    }

    /// List field names with the given prefix
    async fn list_fields(&self, owner: &ActorId, prefix: &str) -> Result<Vec<String>>;
}
