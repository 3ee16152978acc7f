//! In-memory state store
//!
//! For tests and single-process demos.

use crate::store::{StateChange, StateStore};
use async_trait::async_trait;
use bytes::Bytes;
use filament_core::{ActorId, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Per-owner data: field -> value
type OwnerData = HashMap<String, Bytes>;

/// Store data: qualified actor name -> owner data
type StoreData = HashMap<String, OwnerData>;

/// In-memory state store
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    data: Arc<RwLock<StoreData>>,
}

impl MemoryStateStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_key(owner: &ActorId) -> String {
        owner.qualified_name()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    #[instrument(skip(self), fields(owner = %owner, field), level = "trace")]
    async fn try_get(&self, owner: &ActorId, field: &str) -> Result<Option<Bytes>> {
        let data = self.data.read().await;
        Ok(data
            .get(&Self::owner_key(owner))
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    #[instrument(skip(self, changes), fields(owner = %owner, change_count = changes.len()), level = "trace")]
    async fn apply(&self, owner: &ActorId, changes: Vec<StateChange>) -> Result<()> {
        // Single write-lock critical section gives per-owner atomicity.
        let mut data = self.data.write().await;
        let fields = data.entry(Self::owner_key(owner)).or_default();

        for change in changes {
            match change {
                StateChange::Set { field, value } => {
                    fields.insert(field, value);
                }
                StateChange::Remove { field } => {
                    fields.remove(&field);
                }
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, prefix), level = "trace")]
    async fn list_fields(&self, owner: &ActorId, prefix: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        Ok(data
            .get(&Self::owner_key(owner))
            .map(|fields| {
                fields
                    .keys()
                    .filter(|f| f.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulb(id: &str) -> ActorId {
        ActorId::new("SmartBulb", id).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryStateStore::new();
        let owner = bulb("bulb1");

        store
            .apply(
                &owner,
                vec![StateChange::Set {
                    field: "status".into(),
                    value: Bytes::from("on"),
                }],
            )
            .await
            .unwrap();

        assert_eq!(
            store.try_get(&owner, "status").await.unwrap(),
            Some(Bytes::from("on"))
        );
        assert!(store.contains(&owner, "status").await.unwrap());

        store
            .apply(
                &owner,
                vec![StateChange::Remove {
                    field: "status".into(),
                }],
            )
            .await
            .unwrap();

        assert!(store.try_get(&owner, "status").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_owner_isolation() {
        let store = MemoryStateStore::new();
        let bulb1 = bulb("bulb1");
        let bulb2 = bulb("bulb2");

        store
            .apply(
                &bulb1,
                vec![StateChange::Set {
                    field: "status".into(),
                    value: Bytes::from("on"),
                }],
            )
            .await
            .unwrap();

        assert!(store.try_get(&bulb2, "status").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_batch_applies_all() {
        let store = MemoryStateStore::new();
        let owner = bulb("bulb1");

        store
            .apply(
                &owner,
                vec![
                    StateChange::Set {
                        field: "a".into(),
                        value: Bytes::from("1"),
                    },
                    StateChange::Set {
                        field: "b".into(),
                        value: Bytes::from("2"),
                    },
                    StateChange::Remove { field: "c".into() },
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            store.try_get(&owner, "a").await.unwrap(),
            Some(Bytes::from("1"))
        );
        assert_eq!(
            store.try_get(&owner, "b").await.unwrap(),
            Some(Bytes::from("2"))
        );
    }

    #[tokio::test]
    async fn test_memory_store_list_fields() {
        let store = MemoryStateStore::new();
        let owner = bulb("bulb1");

        store
            .apply(
                &owner,
                vec![
                    StateChange::Set {
                        field: "__reminder__/r1".into(),
                        value: Bytes::from("{}"),
                    },
                    StateChange::Set {
                        field: "__reminder__/r2".into(),
                        value: Bytes::from("{}"),
                    },
                    StateChange::Set {
                        field: "status".into(),
                        value: Bytes::from("on"),
                    },
                ],
            )
            .await
            .unwrap();

        let mut fields = store.list_fields(&owner, "__reminder__/").await.unwrap();
        fields.sort();
        assert_eq!(fields, vec!["__reminder__/r1", "__reminder__/r2"]);
    }
}
