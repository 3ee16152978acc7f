//! Per-instance state manager
//!
//! Write-through local cache over the state store. Writes are buffered per
//! field until [`StateManager::commit`] flushes them atomically; a read after
//! a local uncommitted write returns the written value. A failed commit
//! leaves the backend unchanged and retains the pending writes so the caller
//! can retry; [`StateManager::rollback`] discards them instead.

use bytes::Bytes;
use filament_core::constants::{
    STATE_FIELD_LENGTH_BYTES_MAX, STATE_FIELD_RESERVED_PREFIX, STATE_PENDING_WRITES_COUNT_MAX,
    STATE_VALUE_SIZE_BYTES_MAX,
};
use filament_core::{ActorId, Error, Result};
use filament_storage::{StateChange, StateStore};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Cached view of one field
#[derive(Debug, Clone)]
enum CacheEntry {
    /// Matches the backend
    Clean(Bytes),
    /// Written locally, not yet committed
    Dirty(Bytes),
    /// Removed locally, not yet committed
    Removed,
}

/// Per-instance cache over the state store
///
/// Exclusively owned by its actor instance; only ever used under the
/// instance's invocation lock.
pub struct StateManager {
    owner: ActorId,
    store: Arc<dyn StateStore>,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl StateManager {
    pub(crate) fn new(owner: ActorId, store: Arc<dyn StateStore>) -> Self {
        Self {
            owner,
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn validate_field(field: &str) -> Result<()> {
        if field.is_empty() {
            return Err(Error::InvalidFieldName {
                field: field.to_string(),
                reason: "must not be empty".into(),
            });
        }
        if field.len() > STATE_FIELD_LENGTH_BYTES_MAX {
            return Err(Error::InvalidFieldName {
                field: field.to_string(),
                reason: format!(
                    "length {} exceeds limit {}",
                    field.len(),
                    STATE_FIELD_LENGTH_BYTES_MAX
                ),
            });
        }
        if field.starts_with(STATE_FIELD_RESERVED_PREFIX) {
            return Err(Error::InvalidFieldName {
                field: field.to_string(),
                reason: format!("prefix {:?} is reserved", STATE_FIELD_RESERVED_PREFIX),
            });
        }
        Ok(())
    }

    /// Read a field: pending local writes win over the backend
    pub async fn try_get(&self, field: &str) -> Result<Option<Bytes>> {
        Self::validate_field(field)?;

        {
            let cache = self.cache.lock().expect("state cache poisoned");
            match cache.get(field) {
                Some(CacheEntry::Clean(v)) | Some(CacheEntry::Dirty(v)) => {
                    return Ok(Some(v.clone()))
                }
                Some(CacheEntry::Removed) => return Ok(None),
                None => {}
            }
        }

        let value = self.store.try_get(&self.owner, field).await?;
        if let Some(v) = &value {
            let mut cache = self.cache.lock().expect("state cache poisoned");
            cache
                .entry(field.to_string())
                .or_insert_with(|| CacheEntry::Clean(v.clone()));
        }
        Ok(value)
    }

    /// Check whether a field has a value (pending writes included)
    pub async fn contains(&self, field: &str) -> Result<bool> {
        Ok(self.try_get(field).await?.is_some())
    }

    /// Buffer a write; visible to local reads immediately, persisted on commit
    pub fn set(&self, field: &str, value: Bytes) -> Result<()> {
        Self::validate_field(field)?;
        if value.len() > STATE_VALUE_SIZE_BYTES_MAX {
            return Err(Error::InvalidFieldName {
                field: field.to_string(),
                reason: format!(
                    "value size {} exceeds limit {}",
                    value.len(),
                    STATE_VALUE_SIZE_BYTES_MAX
                ),
            });
        }

        let mut cache = self.cache.lock().expect("state cache poisoned");
        if self.pending_count_locked(&cache) >= STATE_PENDING_WRITES_COUNT_MAX {
            return Err(Error::internal(format!(
                "pending write count reached limit {}",
                STATE_PENDING_WRITES_COUNT_MAX
            )));
        }
        cache.insert(field.to_string(), CacheEntry::Dirty(value));
        Ok(())
    }

    /// Buffer a removal
    pub fn remove(&self, field: &str) -> Result<()> {
        Self::validate_field(field)?;
        let mut cache = self.cache.lock().expect("state cache poisoned");
        cache.insert(field.to_string(), CacheEntry::Removed);
        Ok(())
    }

    /// Flush all pending writes atomically
    ///
    /// Either every pending change lands in the backend or none do. On
    /// failure, pending writes stay buffered for a retry.
    pub async fn commit(&self) -> Result<()> {
        let changes: Vec<StateChange> = {
            let cache = self.cache.lock().expect("state cache poisoned");
            cache
                .iter()
                .filter_map(|(field, entry)| match entry {
                    CacheEntry::Dirty(v) => Some(StateChange::Set {
                        field: field.clone(),
                        value: v.clone(),
                    }),
                    CacheEntry::Removed => Some(StateChange::Remove {
                        field: field.clone(),
                    }),
                    CacheEntry::Clean(_) => None,
                })
                .collect()
        };

        if changes.is_empty() {
            return Ok(());
        }

        self.store.apply(&self.owner, changes).await?;

        let mut cache = self.cache.lock().expect("state cache poisoned");
        let mut committed = Vec::new();
        for (field, entry) in cache.iter_mut() {
            match entry {
                CacheEntry::Dirty(v) => *entry = CacheEntry::Clean(v.clone()),
                CacheEntry::Removed => committed.push(field.clone()),
                CacheEntry::Clean(_) => {}
            }
        }
        for field in committed {
            cache.remove(&field);
        }

        debug!(owner = %self.owner, "State committed");
        Ok(())
    }

    /// Discard all pending writes, keeping clean cached reads
    pub fn rollback(&self) {
        let mut cache = self.cache.lock().expect("state cache poisoned");
        cache.retain(|_, entry| matches!(entry, CacheEntry::Clean(_)));
    }

    /// Number of pending (uncommitted) changes
    pub fn pending_count(&self) -> usize {
        let cache = self.cache.lock().expect("state cache poisoned");
        self.pending_count_locked(&cache)
    }

    fn pending_count_locked(&self, cache: &HashMap<String, CacheEntry>) -> usize {
        cache
            .values()
            .filter(|e| !matches!(e, CacheEntry::Clean(_)))
            .count()
    }

    /// Read a field and deserialize it from JSON
    pub async fn try_get_json<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        match self.try_get(field).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| Error::SerializationFailed {
                    reason: format!("field {}: {}", field, e),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize a value to JSON and buffer it as a write
    pub fn set_json<T: Serialize>(&self, field: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::SerializationFailed {
            reason: format!("field {}: {}", field, e),
        })?;
        self.set(field, Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filament_storage::{FaultStore, MemoryStateStore};

    fn manager_with_store() -> (StateManager, Arc<MemoryStateStore>) {
        let store = Arc::new(MemoryStateStore::new());
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();
        (StateManager::new(owner, store.clone()), store)
    }

    #[tokio::test]
    async fn test_read_your_writes_before_commit() {
        let (sm, store) = manager_with_store();

        sm.set("status", Bytes::from("on")).unwrap();
        assert_eq!(sm.try_get("status").await.unwrap(), Some(Bytes::from("on")));

        // Nothing in the backend yet.
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();
        assert!(store.try_get(&owner, "status").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_flushes_atomically() {
        let (sm, store) = manager_with_store();
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();

        sm.set("status", Bytes::from("on")).unwrap();
        sm.set("brightness", Bytes::from("80")).unwrap();
        assert_eq!(sm.pending_count(), 2);

        sm.commit().await.unwrap();
        assert_eq!(sm.pending_count(), 0);
        assert_eq!(
            store.try_get(&owner, "status").await.unwrap(),
            Some(Bytes::from("on"))
        );
        assert_eq!(
            store.try_get(&owner, "brightness").await.unwrap(),
            Some(Bytes::from("80"))
        );
    }

    #[tokio::test]
    async fn test_remove_pending_then_commit() {
        let (sm, store) = manager_with_store();
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();

        sm.set("status", Bytes::from("on")).unwrap();
        sm.commit().await.unwrap();

        sm.remove("status").unwrap();
        // Pending removal is visible locally before commit.
        assert!(sm.try_get("status").await.unwrap().is_none());
        assert!(store.try_get(&owner, "status").await.unwrap().is_some());

        sm.commit().await.unwrap();
        assert!(store.try_get(&owner, "status").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_commit_retains_pending_writes() {
        let inner = Arc::new(MemoryStateStore::new());
        let fault = Arc::new(FaultStore::new(inner.clone()));
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();
        let sm = StateManager::new(owner.clone(), fault.clone());

        sm.set("status", Bytes::from("on")).unwrap();
        fault.set_fail_commits(true);

        let err = sm.commit().await.unwrap_err();
        assert!(matches!(err, Error::StateCommitFailed { .. }));
        assert_eq!(sm.pending_count(), 1);
        assert!(inner.try_get(&owner, "status").await.unwrap().is_none());

        // Retry succeeds with the retained writes.
        fault.set_fail_commits(false);
        sm.commit().await.unwrap();
        assert_eq!(
            inner.try_get(&owner, "status").await.unwrap(),
            Some(Bytes::from("on"))
        );
    }

    #[tokio::test]
    async fn test_rollback_discards_pending() {
        let (sm, _store) = manager_with_store();

        sm.set("status", Bytes::from("on")).unwrap();
        sm.commit().await.unwrap();

        sm.set("status", Bytes::from("off")).unwrap();
        sm.rollback();

        // Back to the committed value.
        assert_eq!(sm.try_get("status").await.unwrap(), Some(Bytes::from("on")));
        assert_eq!(sm.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reserved_field_rejected() {
        let (sm, _store) = manager_with_store();
        let err = sm.set("__reminder__/r1", Bytes::from("x")).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldName { .. }));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let (sm, _store) = manager_with_store();

        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct BulbState {
            status: bool,
        }

        sm.set_json("mydata", &BulbState { status: true }).unwrap();
        let read: Option<BulbState> = sm.try_get_json("mydata").await.unwrap();
        assert_eq!(read, Some(BulbState { status: true }));
    }
}
